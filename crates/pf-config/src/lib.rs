//! pfinder configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for config.json
//! - Config resolution (CLI → env → XDG → system → defaults)
//! - Semantic validation of scan settings

pub mod load;
pub mod resolve;
pub mod settings;
pub mod validate;

pub use load::{load_settings, ConfigError, LoadedSettings};
pub use resolve::{resolve_config, ConfigPath, ConfigSource};
pub use settings::{OutputSettings, PathMatch, ScanSettings, Settings, Strategy};
pub use validate::{validate_settings, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
