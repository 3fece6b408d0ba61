//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::settings::Settings;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Upper bound on descriptor-scan worker threads.
pub const MAX_WORKERS_LIMIT: usize = 4096;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

/// Validate settings semantically.
pub fn validate_settings(settings: &Settings) -> ValidationResult<()> {
    let expected_major = major_version(crate::CONFIG_SCHEMA_VERSION);
    if major_version(&settings.schema_version) != expected_major {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: settings.schema_version.clone(),
        });
    }

    let workers = settings.scan.max_workers;
    if workers == 0 || workers > MAX_WORKERS_LIMIT {
        return Err(ValidationError::InvalidValue {
            field: "scan.max_workers".to_string(),
            message: format!("must be in 1..={}, got {}", MAX_WORKERS_LIMIT, workers),
        });
    }

    if !settings.scan.proc_root.is_absolute() {
        return Err(ValidationError::InvalidValue {
            field: "scan.proc_root".to_string(),
            message: format!(
                "must be an absolute path, got {}",
                settings.scan.proc_root.display()
            ),
        });
    }

    Ok(())
}

fn major_version(version: &str) -> Option<&str> {
    version.split('.').next().filter(|s| !s.is_empty())
}
