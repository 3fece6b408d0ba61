//! Process snapshot and port collectors.
//!
//! - [`procfs`]: Linux process enumeration from `/proc/<pid>/{stat,status}`
//! - [`ps`]: macOS enumeration through BSD `ps`
//! - [`network`]: TCP port → PID lookup
//! - [`users`]: uid → user name table

pub mod command;
pub mod network;
pub mod procfs;
pub mod ps;
mod types;
pub mod users;

pub use network::{default_port_lookup, LsofPorts, NetworkError, PortLookup, ProcNetTcp};
pub use types::{ProcessRecord, ProcessSnapshot, UNKNOWN_USER};
pub use users::UserTable;

use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

use command::DEFAULT_TOOL_TIMEOUT;

/// Errors that can occur while taking the process snapshot.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("cannot list process directory {}: {source}", root.display())]
    ProcRoot {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to execute ps: {0}")]
    CommandFailed(String),

    #[error("process enumeration not supported on {0}")]
    UnsupportedPlatform(String),
}

impl From<CollectError> for pf_common::Error {
    fn from(err: CollectError) -> Self {
        match err {
            CollectError::UnsupportedPlatform(os) => pf_common::Error::UnsupportedPlatform(os),
            other => pf_common::Error::Collection(other.to_string()),
        }
    }
}

/// Take a snapshot of every running process on this platform.
pub fn list_processes(
    proc_root: &Path,
    users: &UserTable,
) -> Result<ProcessSnapshot, CollectError> {
    let started = Instant::now();

    let processes = if cfg!(target_os = "linux") {
        procfs::list_processes_procfs(proc_root, users)?
    } else if cfg!(target_os = "macos") {
        ps::list_processes_ps(users, DEFAULT_TOOL_TIMEOUT)?
    } else {
        return Err(CollectError::UnsupportedPlatform(
            std::env::consts::OS.to_string(),
        ));
    };

    let snapshot = ProcessSnapshot::new(processes);
    debug!(
        process_count = snapshot.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "process snapshot collected"
    );
    Ok(snapshot)
}
