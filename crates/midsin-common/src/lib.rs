//! Shared types for midsin crates.
//!
//! - Error taxonomy with stable codes and remediation hints
//! - Output format specifications
//! - Schema versioning

pub mod error;
pub mod output;
pub mod schema;

pub use error::{format_error_human, Error, ErrorCategory, ErrorReport, Result, SuggestedAction};
pub use output::OutputFormat;
pub use schema::SCHEMA_VERSION;
