//! Config file loading.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::resolve::{resolve_config, ConfigPath, ConfigSource};
use crate::settings::Settings;
use crate::validate::{validate_settings, ValidationError};

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid JSON in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Semantic validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl From<ConfigError> for pf_common::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ValidationError(e) => pf_common::Error::InvalidConfig(e.to_string()),
            other => pf_common::Error::Config(other.to_string()),
        }
    }
}

/// Settings together with their provenance.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    /// The validated settings.
    pub settings: Settings,

    /// Path the settings were read from (None for built-in defaults).
    pub path: Option<PathBuf>,

    /// Where the path came from.
    pub source: ConfigSource,
}

/// Resolve, read, parse, and validate the configuration.
///
/// A missing file is only an error when it was requested explicitly on the
/// command line; otherwise built-in defaults are used.
pub fn load_settings(cli_path: Option<&Path>) -> Result<LoadedSettings, ConfigError> {
    let resolved = resolve_config(cli_path);
    load_resolved(resolved)
}

fn load_resolved(resolved: ConfigPath) -> Result<LoadedSettings, ConfigError> {
    let Some(path) = resolved.path else {
        return Ok(LoadedSettings {
            settings: Settings::default(),
            path: None,
            source: ConfigSource::BuiltinDefault,
        });
    };

    let settings = read_settings_file(&path)?;
    validate_settings(&settings)?;

    Ok(LoadedSettings {
        settings,
        path: Some(path),
        source: resolved.source,
    })
}

/// Read and parse a settings file without validating it.
pub fn read_settings_file(path: &Path) -> Result<Settings, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::IoError {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    serde_json::from_str(&content).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}
