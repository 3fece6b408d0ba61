//! pfinder core library.
//!
//! Resolves processes from command-line arguments:
//! - `:PORT` through the TCP tables
//! - open file paths through a scan of every process's descriptor table
//! - PIDs and executable-name patterns against a process snapshot
//!
//! The binary entry point is in `main.rs`.

pub mod collect;
pub mod exit_codes;
pub mod locate;
pub mod logging;
pub mod output;
pub mod query;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
