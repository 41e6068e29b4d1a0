//! Error types for midsin.
//!
//! Every failure surfaced by the CLI goes through [`Error`], which carries:
//! - a stable numeric code for machine parsing
//! - a category for grouping (and exit-code selection)
//! - a recoverability hint and a suggested action for automation
//! - a remediation line for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Invalid Assay
//!   Reason: invalid assay input: column 3: 9 infected wells out of 8
//!   Fix: Check that every column has at least one well and no more infected than total wells.
//! ```
//!
//! # Machine-Facing Output
//!
//! ```json
//! {
//!   "code": 11,
//!   "category": "input",
//!   "message": "invalid assay input: column 3: 9 infected wells out of 8",
//!   "recoverable": true,
//!   "suggested_action": "fix_input"
//! }
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Result type alias for midsin operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Command-line arguments or assay input.
    Input,
    /// Settings files.
    Config,
    /// Solver failures during estimation.
    Numerical,
    /// File I/O and serialization.
    Io,
    /// Bugs.
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Numerical => write!(f, "numerical"),
            ErrorCategory::Io => write!(f, "io"),
            ErrorCategory::Internal => write!(f, "internal"),
        }
    }
}

/// Suggested actions for callers scripting around midsin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Correct the assay data or arguments and rerun.
    FixInput,
    /// Validate the settings file.
    RunCheck,
    /// Fall back to default settings.
    ResetConfig,
    /// Retry the operation.
    Retry,
    /// Skip this assay and continue with the rest.
    Skip,
    /// File a bug report.
    ReportBug,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::FixInput => write!(f, "fix_input"),
            SuggestedAction::RunCheck => write!(f, "run_check"),
            SuggestedAction::ResetConfig => write!(f, "reset_config"),
            SuggestedAction::Retry => write!(f, "retry"),
            SuggestedAction::Skip => write!(f, "skip"),
            SuggestedAction::ReportBug => write!(f, "report_bug"),
        }
    }
}

/// Unified error type for midsin.
#[derive(Error, Debug)]
pub enum Error {
    // Input errors (10-19)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid assay input: {0}")]
    InvalidAssay(String),

    #[error("line {line}: {message}")]
    MalformedRecord { line: usize, message: String },

    // Configuration errors (20-29)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    // Numerical errors (30-39)
    #[error("no convergence in {stage}: {detail}")]
    NonConvergence { stage: String, detail: String },

    // I/O errors (40-49)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(String),

    // Internal errors (50-59)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Input errors
    /// - 20-29: Configuration errors
    /// - 30-39: Numerical errors
    /// - 40-49: I/O errors
    /// - 50-59: Internal errors
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidArgument(_) => 10,
            Error::InvalidAssay(_) => 11,
            Error::MalformedRecord { .. } => 12,
            Error::Config(_) => 20,
            Error::InvalidSettings(_) => 21,
            Error::NonConvergence { .. } => 30,
            Error::Io(_) => 40,
            Error::Json(_) => 41,
            Error::Csv(_) => 42,
            Error::Internal(_) => 50,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidArgument(_) | Error::InvalidAssay(_) | Error::MalformedRecord { .. } => {
                ErrorCategory::Input
            }
            Error::Config(_) | Error::InvalidSettings(_) => ErrorCategory::Config,
            Error::NonConvergence { .. } => ErrorCategory::Numerical,
            Error::Io(_) | Error::Json(_) | Error::Csv(_) => ErrorCategory::Io,
            Error::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Returns whether this error is potentially recoverable.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::InvalidArgument(_) => true,
            Error::InvalidAssay(_) => true,
            Error::MalformedRecord { .. } => true,

            Error::Config(_) => true,
            Error::InvalidSettings(_) => true,

            // Same input, same settings, same failure.
            Error::NonConvergence { .. } => false,

            Error::Io(_) => true,
            Error::Json(_) => true,
            Error::Csv(_) => true,

            Error::Internal(_) => false,
        }
    }

    /// Returns the suggested action for automation.
    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Error::InvalidArgument(_) | Error::InvalidAssay(_) => SuggestedAction::FixInput,
            Error::MalformedRecord { .. } => SuggestedAction::FixInput,
            Error::Config(_) => SuggestedAction::RunCheck,
            Error::InvalidSettings(_) => SuggestedAction::ResetConfig,
            Error::NonConvergence { .. } => SuggestedAction::Skip,
            Error::Io(_) => SuggestedAction::Retry,
            Error::Json(_) | Error::Csv(_) => SuggestedAction::FixInput,
            Error::Internal(_) => SuggestedAction::ReportBug,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "Run 'midsin --help' for usage.",
            Error::InvalidAssay(_) => {
                "Check that every column has at least one well and no more infected than total wells, the inoculum volume is positive, and both dilution values lie in (0, 1]."
            }
            Error::MalformedRecord { .. } => {
                "Each assay row needs: label, volume, min dilution, dilution factor, total counts, '#', infected counts, '#'. Run 'midsin template' for a starting file."
            }
            Error::Config(_) => {
                "Run 'midsin config validate <path>' to check the settings file, or remove it to use defaults."
            }
            Error::InvalidSettings(_) => {
                "Fix the reported field, or run 'midsin config show' to see the defaults."
            }
            Error::NonConvergence { .. } => {
                "The assay data is unusual enough that the solver gave up. Check the counts for typos; the classical estimates may still be usable."
            }
            Error::Io(_) => "Check that the path exists and is readable/writable.",
            Error::Json(_) => "Invalid JSON. Check syntax with 'jq . <file>'.",
            Error::Csv(_) => "Check the file is comma-separated text.",
            Error::Internal(_) => "This is a bug. Please report it with the input that triggered it.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "Invalid Argument",
            Error::InvalidAssay(_) => "Invalid Assay",
            Error::MalformedRecord { .. } => "Malformed Input Row",
            Error::Config(_) => "Configuration Error",
            Error::InvalidSettings(_) => "Invalid Settings",
            Error::NonConvergence { .. } => "Numerical Non-Convergence",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Error",
            Error::Csv(_) => "CSV Error",
            Error::Internal(_) => "Internal Error",
        }
    }
}

/// Structured error report for JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorReport {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Suggested action for automation.
    pub suggested_action: SuggestedAction,

    /// Additional structured context (line number, stage, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl From<&Error> for ErrorReport {
    fn from(err: &Error) -> Self {
        let mut context = BTreeMap::new();

        match err {
            Error::MalformedRecord { line, .. } => {
                context.insert("line".to_string(), serde_json::json!(line));
            }
            Error::NonConvergence { stage, .. } => {
                context.insert("stage".to_string(), serde_json::json!(stage));
            }
            _ => {}
        }

        ErrorReport {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            context,
        }
    }
}

impl ErrorReport {
    /// Add additional context to the report.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
///
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(Error::InvalidAssay("x".into()).code(), 11);
        assert_eq!(
            Error::MalformedRecord {
                line: 4,
                message: "x".into()
            }
            .code(),
            12
        );
        assert_eq!(
            Error::NonConvergence {
                stage: "mode".into(),
                detail: "x".into()
            }
            .code(),
            30
        );
    }

    #[test]
    fn test_error_category() {
        assert_eq!(Error::Config("x".into()).category(), ErrorCategory::Config);
        assert_eq!(Error::Csv("x".into()).category(), ErrorCategory::Io);
        assert_eq!(
            Error::InvalidArgument("x".into()).category(),
            ErrorCategory::Input
        );
    }

    #[test]
    fn test_error_recoverable() {
        assert!(Error::InvalidAssay("x".into()).is_recoverable());
        assert!(!Error::Internal("x".into()).is_recoverable());
        assert!(!Error::NonConvergence {
            stage: "bounds".into(),
            detail: "x".into()
        }
        .is_recoverable());
    }

    #[test]
    fn test_report_from_error() {
        let err = Error::MalformedRecord {
            line: 7,
            message: "missing '#' separator".into(),
        };
        let report = ErrorReport::from(&err);

        assert_eq!(report.code, 12);
        assert_eq!(report.category, ErrorCategory::Input);
        assert_eq!(report.suggested_action, SuggestedAction::FixInput);
        assert_eq!(report.context.get("line"), Some(&serde_json::json!(7)));
        assert_eq!(report.message, "line 7: missing '#' separator");
    }

    #[test]
    fn test_report_json() {
        let err = Error::NonConvergence {
            stage: "mode".into(),
            detail: "brent_minimize did not converge within 500 iterations".into(),
        };
        let json = ErrorReport::from(&err).with_context("label", "plate 3").to_json();

        assert!(json.contains(r#""code":30"#));
        assert!(json.contains(r#""category":"numerical""#));
        assert!(json.contains(r#""recoverable":false"#));
        assert!(json.contains(r#""suggested_action":"skip""#));
        assert!(json.contains(r#""label":"plate 3""#));
    }

    #[test]
    fn test_format_error_human() {
        let err = Error::InvalidSettings("coverages must increase".into());
        let formatted = format_error_human(&err, false);

        assert!(formatted.contains("Invalid Settings"));
        assert!(formatted.contains("coverages must increase"));
        assert!(formatted.contains("midsin config show"));
    }

    #[test]
    fn test_display_impls() {
        assert_eq!(ErrorCategory::Numerical.to_string(), "numerical");
        assert_eq!(SuggestedAction::FixInput.to_string(), "fix_input");
    }
}
