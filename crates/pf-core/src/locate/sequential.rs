//! Sequential scan over a supplied process list.

use pf_common::ProcessId;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

use super::matcher::PathMatcher;
use super::source::DescriptorSource;
use super::{inspect_process, LocateError, LocateOptions, ScanKind, ScanReport};

/// Walk `pids` in order and stop at the first process holding `path` open.
///
/// The query path is opened first and the handle is held for the whole walk,
/// so an unreadable or missing path fails fast instead of reporting "no
/// owner". The scanning process is skipped when `options.excluded_pid` names
/// it, so its own handle is never reported.
pub fn scan_process_list(
    source: &dyn DescriptorSource,
    path: &Path,
    pids: &[u32],
    options: &LocateOptions,
) -> Result<ScanReport, LocateError> {
    let started = Instant::now();
    let _handle = File::open(path).map_err(|source| LocateError::QueryPath {
        path: path.to_path_buf(),
        source,
    })?;

    let matcher = PathMatcher::new(path, options.path_match);
    let mut report = ScanReport::new(path, ScanKind::Sequential);

    for &pid in pids {
        if options.excluded_pid == Some(pid) {
            continue;
        }
        let inspection = inspect_process(source, pid, &matcher);
        report.absorb(&inspection);
        if inspection.matched {
            report.set_owners(vec![ProcessId(pid)]);
            break;
        }
    }

    report.finish(started);
    debug!(
        path = %path.display(),
        owner = ?report.owner,
        scanned = report.processes_scanned,
        skipped = report.processes_skipped,
        duration_ms = report.duration_ms,
        "sequential scan complete"
    );
    Ok(report)
}
