//! pfinder common types, IDs, and errors.
//!
//! This crate provides foundational types shared across pfinder crates:
//! - Process identity wrapper
//! - Common error type with stable codes
//! - Output format specifications

pub mod error;
pub mod id;
pub mod output;

pub use error::{format_error_human, Error, ErrorCategory, Result, StructuredError};
pub use id::ProcessId;
pub use output::OutputFormat;
