//! Exit codes for the pfinder CLI.
//!
//! Ranges:
//! - 0-1: query outcomes (parse the outcome from the code, not the output)
//! - 10-19: user or environment errors
//! - 20-29: internal and I/O errors

use pf_common::{Error, ErrorCategory};

use crate::query::QueryReport;

/// Exit codes for pfinder runs. Stable for scripting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// At least one process reported
    Found = 0,

    /// Every argument evaluated, nothing matched
    NoMatch = 1,

    /// Invalid command-line usage
    ArgsError = 10,

    /// Config file unreadable or invalid
    ConfigError = 11,

    /// Descriptor or process introspection unsupported here
    PlatformError = 12,

    /// Result serialization failed
    InternalError = 20,

    /// Process enumeration or another systemic read failed
    IoError = 21,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Codes 0-1.
    pub fn is_outcome(self) -> bool {
        (self as i32) < 10
    }

    /// Codes 10-19.
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Name for JSON output.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Found => "OK_FOUND",
            ExitCode::NoMatch => "OK_NO_MATCH",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::PlatformError => "ERR_PLATFORM",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }

    /// Exit code for an error that ends the run before any query.
    pub fn for_error(err: &Error) -> Self {
        if matches!(err, Error::Json(_)) {
            return ExitCode::InternalError;
        }
        match err.category() {
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::Platform => ExitCode::PlatformError,
            ErrorCategory::Query => ExitCode::ArgsError,
            ErrorCategory::Collection | ErrorCategory::Locate | ErrorCategory::Io => {
                ExitCode::IoError
            }
        }
    }

    /// Exit code for a finished batch.
    ///
    /// Matches win over failures. Without matches a platform failure beats
    /// other systemic failures, and argument-scoped failures alone still
    /// count as no match.
    pub fn for_report(report: &QueryReport) -> Self {
        if report.has_matches() {
            return ExitCode::Found;
        }
        let systemic = report.failures.iter().filter(|f| f.systemic);
        let mut code = ExitCode::NoMatch;
        for failure in systemic {
            if failure.error.category == ErrorCategory::Platform {
                return ExitCode::PlatformError;
            }
            code = ExitCode::IoError;
        }
        code
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
