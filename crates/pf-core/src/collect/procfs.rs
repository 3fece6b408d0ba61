//! Process enumeration from a procfs tree.
//!
//! Works on any `/proc`-shaped directory, so tests point it at a mock tree.

use pf_common::ProcessId;
use std::fs;
use std::path::Path;
use tracing::trace;

use super::types::ProcessRecord;
use super::users::UserTable;
use super::CollectError;

/// Fields of `/proc/<pid>/stat` that the snapshot needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatFields {
    pub comm: String,
    pub ppid: u32,
}

/// Parse `/proc/<pid>/stat`.
///
/// Format: `pid (comm) state ppid ...`. The comm may contain spaces and
/// parentheses, so it spans from the first `(` to the last `)`.
pub fn parse_stat_content(content: &str) -> Option<StatFields> {
    let comm_start = content.find('(')?;
    let comm_end = content.rfind(')')?;
    if comm_end <= comm_start {
        return None;
    }
    let comm = content[comm_start + 1..comm_end].to_string();

    let after_comm = content.get(comm_end + 1..)?;
    let mut fields = after_comm.split_whitespace();
    let _state = fields.next()?;
    let ppid = fields.next()?.parse().ok()?;

    Some(StatFields { comm, ppid })
}

/// Real uid from the `Uid:` line of `/proc/<pid>/status`.
pub fn parse_status_uid(content: &str) -> Option<u32> {
    content
        .lines()
        .find(|line| line.starts_with("Uid:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|uid| uid.parse().ok())
}

/// Numeric entries of `root`, ascending. Non-numeric names are ignored.
pub fn list_pids(root: &Path) -> std::io::Result<Vec<u32>> {
    let mut pids = Vec::new();
    for entry in fs::read_dir(root)? {
        let Ok(entry) = entry else { continue };
        if let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) {
            pids.push(pid);
        }
    }
    pids.sort_unstable();
    Ok(pids)
}

/// Enumerate every process under `root`.
///
/// Processes that exit between the directory listing and the `stat` read are
/// skipped. Failure to list `root` itself is an error.
pub fn list_processes_procfs(
    root: &Path,
    users: &UserTable,
) -> Result<Vec<ProcessRecord>, CollectError> {
    let pids = list_pids(root).map_err(|source| CollectError::ProcRoot {
        root: root.to_path_buf(),
        source,
    })?;

    let mut processes = Vec::with_capacity(pids.len());
    for pid in pids {
        let proc_dir = root.join(pid.to_string());
        let stat = match fs::read_to_string(proc_dir.join("stat")) {
            Ok(content) => content,
            Err(e) => {
                trace!(pid, error = %e, "stat unreadable, skipping");
                continue;
            }
        };
        let Some(fields) = parse_stat_content(&stat) else {
            trace!(pid, "stat malformed, skipping");
            continue;
        };
        let uid = fs::read_to_string(proc_dir.join("status"))
            .ok()
            .and_then(|s| parse_status_uid(&s));

        processes.push(ProcessRecord {
            pid: ProcessId(pid),
            ppid: ProcessId(fields.ppid),
            uid,
            user: users.name_for(uid),
            executable: fields.comm,
        });
    }

    Ok(processes)
}
