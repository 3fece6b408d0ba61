//! Parallel scan over every entry of the process root.
//!
//! A bounded pool of scoped worker threads pulls PIDs from a shared cursor.
//! Workers never touch the result directly: each sends its inspection to the
//! collector over a channel, and the collector picks the owner once every
//! worker has finished.

use pf_common::ProcessId;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Instant;
use tracing::debug;

use super::matcher::PathMatcher;
use super::source::DescriptorSource;
use super::{inspect_process, Inspection, LocateError, LocateOptions, ScanKind, ScanReport};

struct TaskOutcome {
    pid: u32,
    inspection: Inspection,
}

/// Inspect every process listed under the source root concurrently.
///
/// Failure to list the root is an error, never an empty result. When several
/// processes hold the path, `owner` is the lowest PID and `owners` lists all
/// of them. With `cancel_on_match` workers stop claiming new PIDs after the
/// first match; tasks already running still finish.
pub fn scan_proc_root(
    source: &dyn DescriptorSource,
    path: &Path,
    options: &LocateOptions,
) -> Result<ScanReport, LocateError> {
    let started = Instant::now();
    let pids = source.pids().map_err(|e| LocateError::ProcRoot {
        root: source.location(),
        source: e,
    })?;

    let matcher = PathMatcher::new(path, options.path_match);
    let workers = options.max_workers.clamp(1, pids.len().max(1));
    let cursor = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel::<TaskOutcome>();

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let (cursor, stop, matcher, pids) = (&cursor, &stop, &matcher, &pids);
            scope.spawn(move || loop {
                if stop.load(Ordering::Acquire) {
                    break;
                }
                let idx = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(&pid) = pids.get(idx) else {
                    break;
                };
                if options.excluded_pid == Some(pid) {
                    continue;
                }
                let inspection = inspect_process(source, pid, matcher);
                if inspection.matched && options.cancel_on_match {
                    stop.store(true, Ordering::Release);
                }
                if tx.send(TaskOutcome { pid, inspection }).is_err() {
                    break;
                }
            });
        }
    });
    drop(tx);

    let mut report = ScanReport::new(path, ScanKind::Parallel);
    let mut owners = Vec::new();
    for outcome in rx {
        report.absorb(&outcome.inspection);
        if outcome.inspection.matched {
            owners.push(ProcessId(outcome.pid));
        }
    }
    report.set_owners(owners);
    report.cancelled = stop.load(Ordering::Acquire) && cursor.load(Ordering::Relaxed) < pids.len();
    report.finish(started);

    debug!(
        path = %path.display(),
        owner = ?report.owner,
        owners = report.owners.len(),
        workers,
        scanned = report.processes_scanned,
        skipped = report.processes_skipped,
        cancelled = report.cancelled,
        duration_ms = report.duration_ms,
        "parallel scan complete"
    );
    Ok(report)
}
