//! Exit codes for the midsin CLI.
//!
//! Exit code ranges:
//! - 0-9: Operational outcomes
//! - 10-19: Input and configuration errors (fixable by the user)
//! - 20-29: Internal, I/O and numerical failures

use midsin_common::{Error, ErrorCategory};

/// Exit codes for midsin operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Every assay evaluated.
    Clean = 0,

    /// Some batch rows failed; the rest were evaluated.
    PartialFail = 3,

    /// Invalid arguments
    ArgsError = 10,

    /// Assay input rejected (bad counts, malformed CSV row)
    InputError = 11,

    /// Settings file missing, unreadable or invalid
    ConfigError = 12,

    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,

    /// A solver did not converge
    NumericalError = 22,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Codes 10-19.
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&self.as_i32())
    }

    pub fn is_error(self) -> bool {
        self.as_i32() >= 10
    }

    /// Code name for JSON output.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::PartialFail => "ERR_PARTIAL",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::InputError => "ERR_INPUT",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
            ExitCode::NumericalError => "ERR_NUMERICAL",
        }
    }

    /// Exit code for a fatal error.
    pub fn for_error(err: &Error) -> Self {
        match err {
            Error::InvalidArgument(_) => ExitCode::ArgsError,
            other => ExitCode::from(other.category()),
        }
    }
}

impl From<ErrorCategory> for ExitCode {
    fn from(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::Input => ExitCode::InputError,
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::Numerical => ExitCode::NumericalError,
            ErrorCategory::Io => ExitCode::IoError,
            ErrorCategory::Internal => ExitCode::InternalError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_are_stable() {
        assert_eq!(ExitCode::Clean.as_i32(), 0);
        assert_eq!(ExitCode::PartialFail.as_i32(), 3);
        assert_eq!(ExitCode::ArgsError.as_i32(), 10);
        assert_eq!(ExitCode::InputError.as_i32(), 11);
        assert_eq!(ExitCode::ConfigError.as_i32(), 12);
        assert_eq!(ExitCode::InternalError.as_i32(), 20);
        assert_eq!(ExitCode::IoError.as_i32(), 21);
        assert_eq!(ExitCode::NumericalError.as_i32(), 22);
    }

    #[test]
    fn test_error_mapping() {
        let cases = [
            (Error::InvalidArgument("x".into()), ExitCode::ArgsError),
            (Error::InvalidAssay("x".into()), ExitCode::InputError),
            (
                Error::MalformedRecord {
                    line: 1,
                    message: "x".into(),
                },
                ExitCode::InputError,
            ),
            (Error::InvalidSettings("x".into()), ExitCode::ConfigError),
            (
                Error::NonConvergence {
                    stage: "mode".into(),
                    detail: "x".into(),
                },
                ExitCode::NumericalError,
            ),
            (Error::Csv("x".into()), ExitCode::IoError),
            (Error::Internal("x".into()), ExitCode::InternalError),
        ];
        for (err, code) in cases {
            assert_eq!(ExitCode::for_error(&err), code, "{}", err);
        }
    }

    #[test]
    fn test_classification() {
        assert!(ExitCode::Clean.is_success());
        assert!(!ExitCode::PartialFail.is_success());
        assert!(!ExitCode::PartialFail.is_error());
        assert!(ExitCode::ConfigError.is_user_error());
        assert!(!ExitCode::IoError.is_user_error());
        assert_eq!(ExitCode::NumericalError.to_string(), "ERR_NUMERICAL (22)");
    }
}
