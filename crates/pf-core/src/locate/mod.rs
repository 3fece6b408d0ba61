//! Descriptor-table resolution: which process holds a path open.
//!
//! Two scanners share the same per-process inspection:
//!
//! - [`sequential`]: walks a supplied process list and stops at the first
//!   owner. Used on macOS where descriptor tables come from `lsof`.
//! - [`parallel`]: inspects every entry of the process root on a worker pool
//!   and reports the lowest owning PID. Used on Linux.
//!
//! "No owner" is `Ok` with `owner == None`. Failing to open the query path or
//! to list the process root is an error, never a silent not-found.
//!
//! # Example
//!
//! ```ignore
//! use pf_core::locate::{Locator, LocateOptions};
//!
//! let locator = Locator::new(LocateOptions::default());
//! let report = locator.locate(Path::new("/var/log/syslog"), &snapshot.pids())?;
//! if let Some(pid) = report.owner {
//!     println!("held open by {pid}");
//! }
//! ```

mod matcher;
pub mod parallel;
pub mod sequential;
mod source;

pub use matcher::PathMatcher;
pub use source::{parse_lsof_fields, DescriptorEntry, DescriptorSource, LsofDescriptors, ProcFs};

use pf_common::ProcessId;
use pf_config::{PathMatch, ScanSettings, Strategy};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::trace;

/// Errors that prevent a scan from producing a trustworthy answer.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("cannot open query path {}: {source}", path.display())]
    QueryPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot list process directory {root}: {source}")]
    ProcRoot {
        root: String,
        #[source]
        source: std::io::Error,
    },

    #[error("descriptor scanning not supported on {0}")]
    UnsupportedPlatform(String),
}

impl From<LocateError> for pf_common::Error {
    fn from(err: LocateError) -> Self {
        match err {
            LocateError::QueryPath { path, source } => pf_common::Error::QueryPath {
                path,
                message: source.to_string(),
            },
            LocateError::ProcRoot { root, source } => pf_common::Error::ProcRoot {
                root: PathBuf::from(root),
                message: source.to_string(),
            },
            LocateError::UnsupportedPlatform(os) => pf_common::Error::UnsupportedPlatform(os),
        }
    }
}

/// Which scanner produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanKind {
    Sequential,
    Parallel,
}

impl std::fmt::Display for ScanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanKind::Sequential => write!(f, "sequential"),
            ScanKind::Parallel => write!(f, "parallel"),
        }
    }
}

/// Outcome of one scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Query path as compared against descriptor targets.
    pub path: PathBuf,
    pub strategy: ScanKind,

    /// The reported owner (lowest PID when several were observed).
    pub owner: Option<ProcessId>,

    /// Every owner observed, ascending. The sequential scanner stops at the
    /// first, so it reports at most one.
    pub owners: Vec<ProcessId>,

    pub processes_scanned: usize,
    pub processes_skipped: usize,
    pub descriptors_checked: usize,

    /// Workers stopped early after a match.
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl ScanReport {
    fn new(path: &Path, strategy: ScanKind) -> Self {
        Self {
            path: path.to_path_buf(),
            strategy,
            owner: None,
            owners: Vec::new(),
            processes_scanned: 0,
            processes_skipped: 0,
            descriptors_checked: 0,
            cancelled: false,
            duration_ms: 0,
        }
    }

    pub fn found(&self) -> bool {
        self.owner.is_some()
    }

    fn absorb(&mut self, inspection: &Inspection) {
        if inspection.readable {
            self.processes_scanned += 1;
        } else {
            self.processes_skipped += 1;
        }
        self.descriptors_checked += inspection.descriptors;
    }

    fn set_owners(&mut self, mut owners: Vec<ProcessId>) {
        owners.sort_unstable();
        owners.dedup();
        self.owner = owners.first().copied();
        self.owners = owners;
    }

    fn finish(&mut self, started: Instant) {
        self.duration_ms = started.elapsed().as_millis() as u64;
    }
}

/// Scan behaviour, usually derived from [`ScanSettings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocateOptions {
    pub strategy: Strategy,
    pub max_workers: usize,
    pub path_match: PathMatch,
    pub cancel_on_match: bool,
    /// PID never reported as an owner (the scanning process itself).
    pub excluded_pid: Option<u32>,
    pub proc_root: PathBuf,
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self::from(&ScanSettings::default())
    }
}

impl From<&ScanSettings> for LocateOptions {
    fn from(settings: &ScanSettings) -> Self {
        Self {
            strategy: settings.strategy,
            max_workers: settings.max_workers.max(1),
            path_match: settings.path_match,
            cancel_on_match: settings.cancel_on_match,
            excluded_pid: settings.exclude_self.then(|| ProcessId::current().0),
            proc_root: settings.proc_root.clone(),
        }
    }
}

/// Result of inspecting one process's descriptor table.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Inspection {
    pub matched: bool,
    pub readable: bool,
    pub descriptors: usize,
}

/// Look through one process's descriptors for the query path.
///
/// An unreadable table (process exited, permission denied) is a skip; a
/// descriptor that vanished between listing and resolving is ignored.
pub(crate) fn inspect_process(
    source: &dyn DescriptorSource,
    pid: u32,
    matcher: &PathMatcher,
) -> Inspection {
    let entries = match source.list(pid) {
        Ok(entries) => entries,
        Err(e) => {
            trace!(pid, error = %e, "descriptor table unreadable, skipping");
            return Inspection::default();
        }
    };

    let mut inspection = Inspection {
        readable: true,
        ..Inspection::default()
    };
    for entry in &entries {
        let target = match source.resolve(pid, entry) {
            Ok(target) => target,
            Err(e) => {
                trace!(pid, fd = %entry.fd, error = %e, "descriptor vanished");
                continue;
            }
        };
        inspection.descriptors += 1;
        if matcher.matches(&target) {
            inspection.matched = true;
            break;
        }
    }
    inspection
}

/// Picks a scanner and descriptor source for the platform and runs it.
#[derive(Clone)]
pub struct Locator {
    options: LocateOptions,
    source: Option<Arc<dyn DescriptorSource>>,
}

impl std::fmt::Debug for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locator")
            .field("options", &self.options)
            .field("source", &self.source.as_ref().map(|s| s.location()))
            .finish()
    }
}

impl Locator {
    /// Locator using the platform's descriptor source.
    pub fn new(options: LocateOptions) -> Self {
        Self {
            options,
            source: None,
        }
    }

    /// Locator over an explicit descriptor source, bypassing platform selection.
    pub fn with_source(options: LocateOptions, source: Arc<dyn DescriptorSource>) -> Self {
        Self {
            options,
            source: Some(source),
        }
    }

    pub fn options(&self) -> &LocateOptions {
        &self.options
    }

    /// Resolve the strategy and descriptor source.
    ///
    /// `Auto` means parallel over procfs on Linux and sequential over `lsof`
    /// on macOS. Any other platform fails here, before anything is scanned.
    pub fn plan(&self) -> Result<(ScanKind, Arc<dyn DescriptorSource>), LocateError> {
        let linux = cfg!(target_os = "linux");
        let macos = cfg!(target_os = "macos");

        if let Some(source) = &self.source {
            let kind = match self.options.strategy {
                Strategy::Sequential => ScanKind::Sequential,
                Strategy::Parallel => ScanKind::Parallel,
                Strategy::Auto if macos => ScanKind::Sequential,
                Strategy::Auto => ScanKind::Parallel,
            };
            return Ok((kind, Arc::clone(source)));
        }

        if !linux && !macos {
            return Err(LocateError::UnsupportedPlatform(
                std::env::consts::OS.to_string(),
            ));
        }

        let kind = match self.options.strategy {
            Strategy::Sequential => ScanKind::Sequential,
            Strategy::Parallel => ScanKind::Parallel,
            Strategy::Auto if linux => ScanKind::Parallel,
            Strategy::Auto => ScanKind::Sequential,
        };
        let source: Arc<dyn DescriptorSource> = if macos && kind == ScanKind::Sequential {
            Arc::new(LsofDescriptors::default())
        } else {
            Arc::new(ProcFs::new(&self.options.proc_root))
        };
        Ok((kind, source))
    }

    /// Find the process holding `path` open.
    ///
    /// `pids` is the process list walked by the sequential scanner; the
    /// parallel scanner enumerates the process root itself.
    pub fn locate(&self, path: &Path, pids: &[u32]) -> Result<ScanReport, LocateError> {
        let (kind, source) = self.plan()?;
        match kind {
            ScanKind::Sequential => {
                sequential::scan_process_list(source.as_ref(), path, pids, &self.options)
            }
            ScanKind::Parallel => parallel::scan_proc_root(source.as_ref(), path, &self.options),
        }
    }
}
