//! Error types for pfinder.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Remediation hints for humans
//!
//! # Agent-Facing Output
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 31,
//!   "category": "locate",
//!   "message": "cannot list process directory /proc: permission denied",
//!   "context": { "root": "/proc" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pfinder operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file errors.
    Config,
    /// Process enumeration and port lookup errors.
    Collection,
    /// Descriptor-table scan errors.
    Locate,
    /// Argument classification errors.
    Query,
    /// File I/O and serialization errors.
    Io,
    /// Platform compatibility errors.
    Platform,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Collection => write!(f, "collection"),
            ErrorCategory::Locate => write!(f, "locate"),
            ErrorCategory::Query => write!(f, "query"),
            ErrorCategory::Io => write!(f, "io"),
            ErrorCategory::Platform => write!(f, "platform"),
        }
    }
}

/// Unified error type for pfinder.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // Collection errors (20-29)
    #[error("process collection failed: {0}")]
    Collection(String),

    #[error("port lookup failed: {0}")]
    PortLookup(String),

    // Locate errors (30-39)
    #[error("cannot open query path {}: {message}", path.display())]
    QueryPath { path: PathBuf, message: String },

    #[error("cannot list process directory {}: {message}", root.display())]
    ProcRoot { root: PathBuf, message: String },

    // Query errors (40-49)
    #[error("invalid argument '{argument}': {message}")]
    InvalidArgument { argument: String, message: String },

    #[error("cannot resolve path '{argument}': {message}")]
    PathResolution { argument: String, message: String },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Platform errors (70-79)
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Collection errors
    /// - 30-39: Locate errors
    /// - 40-49: Query errors
    /// - 60-69: I/O errors
    /// - 70-79: Platform errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidConfig(_) => 11,
            Error::Collection(_) => 20,
            Error::PortLookup(_) => 22,
            Error::QueryPath { .. } => 30,
            Error::ProcRoot { .. } => 31,
            Error::InvalidArgument { .. } => 40,
            Error::PathResolution { .. } => 41,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
            Error::UnsupportedPlatform(_) => 70,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidConfig(_) => ErrorCategory::Config,
            Error::Collection(_) | Error::PortLookup(_) => ErrorCategory::Collection,
            Error::QueryPath { .. } | Error::ProcRoot { .. } => ErrorCategory::Locate,
            Error::InvalidArgument { .. } | Error::PathResolution { .. } => ErrorCategory::Query,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
            Error::UnsupportedPlatform(_) => ErrorCategory::Platform,
        }
    }

    /// Whether the failure only affects a single argument of a batch.
    ///
    /// Systemic failures (unreadable process root, unsupported platform)
    /// affect every path argument of the run.
    pub fn is_argument_scoped(&self) -> bool {
        matches!(
            self,
            Error::InvalidArgument { .. }
                | Error::PathResolution { .. }
                | Error::QueryPath { .. }
        )
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) | Error::InvalidConfig(_) => {
                "Check the config file syntax, or remove it to fall back to built-in defaults."
            }
            Error::Collection(_) => {
                "Retry. If persistent, check that /proc is mounted and readable."
            }
            Error::PortLookup(_) => {
                "Check that /proc/net/tcp is readable (Linux) or that lsof is installed (macOS)."
            }
            Error::QueryPath { .. } => {
                "Check that the file still exists and that you are allowed to open it."
            }
            Error::ProcRoot { .. } => {
                "Check the configured proc_root and that /proc is mounted and readable."
            }
            Error::InvalidArgument { .. } => "Run 'pfinder --help' for the accepted argument forms.",
            Error::PathResolution { .. } => {
                "Check that the current working directory still exists, or pass an absolute path."
            }
            Error::Io(_) => "Check permissions and retry the operation.",
            Error::Json(_) => "Invalid JSON. Check syntax with 'jq . <file>'.",
            Error::UnsupportedPlatform(_) => {
                "Descriptor scanning is only available on Linux and macOS."
            }
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidConfig(_) => "Invalid Configuration",
            Error::Collection(_) => "Process Collection Error",
            Error::PortLookup(_) => "Port Lookup Error",
            Error::QueryPath { .. } => "Query Path Unavailable",
            Error::ProcRoot { .. } => "Process Directory Unreadable",
            Error::InvalidArgument { .. } => "Invalid Argument",
            Error::PathResolution { .. } => "Path Resolution Failed",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Error",
            Error::UnsupportedPlatform(_) => "Unsupported Platform",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Additional structured context (e.g., argument, file path).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::QueryPath { path, .. } => {
                context.insert("path".to_string(), serde_json::json!(path));
            }
            Error::ProcRoot { root, .. } => {
                context.insert("root".to_string(), serde_json::json!(root));
            }
            Error::InvalidArgument { argument, .. } | Error::PathResolution { argument, .. } => {
                context.insert("argument".to_string(), serde_json::json!(argument));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }
}

/// Format an error for human-readable stderr output.
pub fn format_error_human(err: &Error) -> String {
    format!(
        "✗ {}\n  Reason: {}\n  Fix: {}",
        err.headline(),
        err,
        err.remediation()
    )
}
