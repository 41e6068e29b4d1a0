//! Fuzz target for settings.json parsing and validation.
//!
//! Parsing and validation should never panic, only return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use midsin_config::{validate_settings, EstimatorSettings};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(settings) = EstimatorSettings::from_json(text) {
        let _ = validate_settings(&settings);
    }
});
