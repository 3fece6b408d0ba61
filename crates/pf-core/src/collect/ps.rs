//! Process enumeration via BSD `ps` (macOS).

use pf_common::ProcessId;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

use super::command::run_command;
use super::types::ProcessRecord;
use super::users::UserTable;
use super::CollectError;

/// `ps` arguments: every process, no header, comm last so it may hold spaces.
pub const PS_ARGS: [&str; 2] = ["-axo", "pid=,ppid=,uid=,user=,comm="];

/// Run `ps` and parse the snapshot.
pub fn list_processes_ps(
    users: &UserTable,
    timeout: Duration,
) -> Result<Vec<ProcessRecord>, CollectError> {
    let output = run_command("ps", &PS_ARGS, timeout)
        .map_err(|e| CollectError::CommandFailed(e.to_string()))?;
    if !output.success() {
        return Err(CollectError::CommandFailed(format!(
            "ps exited with status {:?}",
            output.exit_code
        )));
    }
    let processes = parse_ps_output(&output.stdout, users);
    debug!(count = processes.len(), "ps snapshot parsed");
    Ok(processes)
}

/// Parse `pid ppid uid user comm` lines. Malformed lines are skipped.
///
/// `ps` already reports the user name; the passwd table is only consulted when
/// `ps` printed a bare uid.
pub fn parse_ps_output(output: &str, users: &UserTable) -> Vec<ProcessRecord> {
    output
        .lines()
        .filter_map(|line| {
            let record = parse_ps_line(line, users);
            if record.is_none() && !line.trim().is_empty() {
                trace!(line, "unparseable ps line");
            }
            record
        })
        .collect()
}

fn parse_ps_line(line: &str, users: &UserTable) -> Option<ProcessRecord> {
    let mut rest = line.trim_start();
    let mut fields = [""; 4];
    for slot in fields.iter_mut() {
        let end = rest.find(char::is_whitespace)?;
        *slot = &rest[..end];
        rest = rest[end..].trim_start();
    }
    let comm = rest.trim_end();
    if comm.is_empty() {
        return None;
    }

    let pid = fields[0].parse().ok()?;
    let ppid = fields[1].parse().ok()?;
    let uid = fields[2].parse().ok();
    let user = match fields[3] {
        name if !name.is_empty() && name.parse::<u32>().is_err() => name.to_string(),
        _ => users.name_for(uid),
    };

    Some(ProcessRecord {
        pid: ProcessId(pid),
        ppid: ProcessId(ppid),
        uid,
        user,
        executable: executable_name(comm),
    })
}

/// BSD `ps` prints the full executable path in `comm`; keep the basename.
fn executable_name(comm: &str) -> String {
    Path::new(comm)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| comm.to_string())
}
