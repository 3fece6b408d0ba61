//! Process snapshot types.

use pf_common::ProcessId;
use serde::{Deserialize, Serialize};

/// Placeholder for a uid that has no passwd entry.
pub const UNKNOWN_USER: &str = "unknown";

/// One row of the process snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: ProcessId,
    pub ppid: ProcessId,

    /// Real uid, when the platform reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,

    /// Owning user name, or `unknown`.
    pub user: String,

    /// Executable name (kernel comm on Linux, basename of `ps` comm on macOS).
    pub executable: String,
}

/// Point-in-time process list, sorted by PID.
#[derive(Debug, Clone, Default)]
pub struct ProcessSnapshot {
    processes: Vec<ProcessRecord>,
}

impl ProcessSnapshot {
    pub fn new(mut processes: Vec<ProcessRecord>) -> Self {
        processes.sort_by_key(|p| p.pid);
        processes.dedup_by_key(|p| p.pid);
        Self { processes }
    }

    /// Find a record by PID.
    pub fn find_by_pid(&self, pid: u32) -> Option<&ProcessRecord> {
        self.processes
            .binary_search_by_key(&ProcessId(pid), |p| p.pid)
            .ok()
            .map(|idx| &self.processes[idx])
    }

    pub fn processes(&self) -> &[ProcessRecord] {
        &self.processes
    }

    pub fn pids(&self) -> Vec<u32> {
        self.processes.iter().map(|p| p.pid.0).collect()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}
