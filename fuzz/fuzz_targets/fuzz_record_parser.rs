//! Fuzz target for batch CSV parsing.
//!
//! Arbitrary bytes must classify into rows or fail with a `RecordError`,
//! and every parse error must convert into a reportable error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use midsin_common::ErrorReport;
use midsin_core::records::{read_rows, Row};

fuzz_target!(|data: &[u8]| {
    let rows = match read_rows(data) {
        Ok(rows) => rows,
        Err(err) => {
            let _ = ErrorReport::from(&midsin_common::Error::from(err)).to_json();
            return;
        }
    };
    for row in rows {
        if let Row::Assay { input: Err(err), line, .. } = row {
            assert_eq!(err.line(), line);
            let _ = ErrorReport::from(&midsin_common::Error::from(err));
        }
    }
});
