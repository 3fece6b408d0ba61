//! Typed configuration structures.
//!
//! Every field has a default, so an empty `{}` document is a valid config.

use pf_common::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of descriptor-scan worker threads.
pub const DEFAULT_MAX_WORKERS: usize = 64;

/// Default root of the per-process descriptor tables.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Schema version of this document.
    pub schema_version: String,

    /// Descriptor scan behavior.
    pub scan: ScanSettings,

    /// Output defaults.
    pub output: OutputSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            scan: ScanSettings::default(),
            output: OutputSettings::default(),
        }
    }
}

/// Which descriptor-table scanner to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Pick by operating system (parallel on Linux, sequential on macOS).
    #[default]
    Auto,
    /// Walk the supplied process list one process at a time.
    Sequential,
    /// One scan task per entry of the process root, on a worker pool.
    Parallel,
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Strategy::Auto),
            "sequential" | "seq" => Ok(Strategy::Sequential),
            "parallel" | "par" => Ok(Strategy::Parallel),
            _ => Err(format!("unknown scan strategy: {}", s)),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Auto => write!(f, "auto"),
            Strategy::Sequential => write!(f, "sequential"),
            Strategy::Parallel => write!(f, "parallel"),
        }
    }
}

/// How a resolved descriptor target is compared with the query path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathMatch {
    /// Byte-for-byte equality, no normalization.
    #[default]
    Literal,
    /// Both sides canonicalized (symlinks resolved) before comparing.
    Canonical,
}

impl std::str::FromStr for PathMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "literal" | "exact" => Ok(PathMatch::Literal),
            "canonical" => Ok(PathMatch::Canonical),
            _ => Err(format!("unknown path match mode: {}", s)),
        }
    }
}

impl std::fmt::Display for PathMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathMatch::Literal => write!(f, "literal"),
            PathMatch::Canonical => write!(f, "canonical"),
        }
    }
}

/// Descriptor scan settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Scanner selection.
    pub strategy: Strategy,

    /// Worker threads for the parallel scanner.
    pub max_workers: usize,

    /// Descriptor target comparison mode.
    pub path_match: PathMatch,

    /// Stop handing out scan tasks once any worker found an owner.
    pub cancel_on_match: bool,

    /// Never report the scanning process itself as an owner.
    pub exclude_self: bool,

    /// Root of the per-process descriptor directories.
    pub proc_root: PathBuf,
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            strategy: Strategy::Auto,
            max_workers: DEFAULT_MAX_WORKERS,
            path_match: PathMatch::Literal,
            cancel_on_match: false,
            exclude_self: true,
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
        }
    }
}

/// Output defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Default output format when `--format` is not given.
    pub format: OutputFormat,
}
