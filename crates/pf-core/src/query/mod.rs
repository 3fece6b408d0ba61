//! Command-line argument classification and batch dispatch.
//!
//! Each argument is classified in a fixed order:
//!
//! 1. `:PORT` → processes with a TCP socket on that local port
//! 2. an existing path → the process holding it open
//! 3. a decimal number → that PID
//! 4. anything else → executable names matching a case-insensitive regex
//!    (an invalid regex is matched literally)

mod engine;

pub use engine::{
    ArgumentFailure, MatchedProcess, OwnerLookup, QueryEngine, QueryReport, ResultSet,
};

use regex::{Regex, RegexBuilder};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Errors scoped to a single argument.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("empty argument")]
    Empty,

    #[error("invalid port '{argument}': expected :1-65535")]
    InvalidPort { argument: String },

    #[error("pattern '{argument}' cannot be compiled: {source}")]
    InvalidPattern {
        argument: String,
        #[source]
        source: regex::Error,
    },

    #[error("cannot make '{argument}' absolute: {source}")]
    PathResolution {
        argument: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<QueryError> for pf_common::Error {
    fn from(err: QueryError) -> Self {
        match &err {
            QueryError::Empty => pf_common::Error::InvalidArgument {
                argument: String::new(),
                message: err.to_string(),
            },
            QueryError::InvalidPort { argument } | QueryError::InvalidPattern { argument, .. } => {
                pf_common::Error::InvalidArgument {
                    argument: argument.clone(),
                    message: err.to_string(),
                }
            }
            QueryError::PathResolution { argument, source } => {
                pf_common::Error::PathResolution {
                    argument: argument.clone(),
                    message: source.to_string(),
                }
            }
        }
    }
}

/// What an argument asks for.
#[derive(Debug, Clone)]
pub enum QueryTarget {
    Port(u16),
    Path(PathBuf),
    Pid(u32),
    Pattern(Regex),
}

impl QueryTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryTarget::Port(_) => "port",
            QueryTarget::Path(_) => "path",
            QueryTarget::Pid(_) => "pid",
            QueryTarget::Pattern(_) => "pattern",
        }
    }
}

/// Classify one command-line argument.
pub fn classify(arg: &str) -> Result<QueryTarget, QueryError> {
    if arg.is_empty() {
        return Err(QueryError::Empty);
    }

    if let Some(digits) = arg.strip_prefix(':') {
        // Only the canonical spelling: no sign, no zero padding.
        return match digits.parse::<u16>() {
            Ok(port) if port > 0 && port.to_string() == digits => Ok(QueryTarget::Port(port)),
            _ => Err(QueryError::InvalidPort {
                argument: arg.to_string(),
            }),
        };
    }

    if let Ok(metadata) = fs::metadata(arg) {
        let path = normalize_path(Path::new(arg), metadata.is_dir()).map_err(|source| {
            QueryError::PathResolution {
                argument: arg.to_string(),
                source,
            }
        })?;
        return Ok(QueryTarget::Path(path));
    }

    if let Ok(pid) = arg.parse::<u32>() {
        return Ok(QueryTarget::Pid(pid));
    }

    compile_pattern(arg)
        .map(QueryTarget::Pattern)
        .map_err(|source| QueryError::InvalidPattern {
            argument: arg.to_string(),
            source,
        })
}

/// Make an existing non-directory path absolute and lexically clean, without
/// resolving symlinks.
///
/// Directories are returned unchanged: no descriptor target is ever a
/// relative directory name, so they never match.
pub fn normalize_path(path: &Path, is_dir: bool) -> std::io::Result<PathBuf> {
    if is_dir {
        return Ok(path.to_path_buf());
    }
    Ok(clean_path(&std::path::absolute(path)?))
}

/// Drop `.` components and fold each `..` into its parent. `..` at the root
/// stays at the root.
fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other),
        }
    }
    cleaned
}

/// Case-insensitive regex, or the escaped literal when `pattern` is not a
/// valid regex.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let build = |p: &str| RegexBuilder::new(p).case_insensitive(true).build();
    build(pattern).or_else(|_| build(&regex::escape(pattern)))
}
