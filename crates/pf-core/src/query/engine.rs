//! Batch evaluation of arguments against one process snapshot.

use pf_common::{Error, StructuredError};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, debug_span, trace, warn};

use super::{classify, QueryTarget};
use crate::collect::{PortLookup, ProcessRecord, ProcessSnapshot};
use crate::locate::{LocateError, Locator, ScanReport};

/// Finds the owner of an open path.
pub trait OwnerLookup: Send + Sync {
    fn owner_of(&self, path: &Path, snapshot: &ProcessSnapshot) -> Result<ScanReport, LocateError>;
}

impl OwnerLookup for Locator {
    fn owner_of(&self, path: &Path, snapshot: &ProcessSnapshot) -> Result<ScanReport, LocateError> {
        self.locate(path, &snapshot.pids())
    }
}

/// A reported process and the arguments that selected it.
#[derive(Debug, Clone, Serialize)]
pub struct MatchedProcess {
    #[serde(flatten)]
    pub process: ProcessRecord,
    pub matched_by: Vec<String>,
}

/// Matches keyed by PID, in order of first discovery.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    entries: Vec<MatchedProcess>,
    index: HashMap<u32, usize>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `process` as matched by `argument`. Returns true for a new PID.
    pub fn insert(&mut self, process: &ProcessRecord, argument: &str) -> bool {
        if let Some(&idx) = self.index.get(&process.pid.0) {
            let entry = &mut self.entries[idx];
            if !entry.matched_by.iter().any(|a| a == argument) {
                entry.matched_by.push(argument.to_string());
            }
            return false;
        }
        self.index.insert(process.pid.0, self.entries.len());
        self.entries.push(MatchedProcess {
            process: process.clone(),
            matched_by: vec![argument.to_string()],
        });
        true
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.index.contains_key(&pid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchedProcess> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<MatchedProcess> {
        self.entries
    }
}

/// An argument that could not be evaluated.
#[derive(Debug, Clone, Serialize)]
pub struct ArgumentFailure {
    pub argument: String,

    /// The failure affects the whole run, not just this argument.
    pub systemic: bool,

    #[serde(flatten)]
    pub error: StructuredError,
}

impl ArgumentFailure {
    fn new(argument: &str, err: &Error) -> Self {
        Self {
            argument: argument.to_string(),
            systemic: !err.is_argument_scoped(),
            error: StructuredError::from(err).with_context("argument", argument),
        }
    }
}

/// Everything a batch produced.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub matches: Vec<MatchedProcess>,
    pub failures: Vec<ArgumentFailure>,

    /// Descriptor scans run for path arguments.
    pub scans: Vec<ScanReport>,
    pub generated_at: String,
}

impl QueryReport {
    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }
}

/// Evaluates arguments against a snapshot and its collaborators.
pub struct QueryEngine<'a> {
    snapshot: &'a ProcessSnapshot,
    owners: &'a dyn OwnerLookup,
    ports: &'a dyn PortLookup,
}

impl<'a> QueryEngine<'a> {
    pub fn new(
        snapshot: &'a ProcessSnapshot,
        owners: &'a dyn OwnerLookup,
        ports: &'a dyn PortLookup,
    ) -> Self {
        Self {
            snapshot,
            owners,
            ports,
        }
    }

    /// Evaluate every argument in order. A failing argument is recorded and
    /// the batch continues.
    pub fn run<S: AsRef<str>>(&self, args: &[S]) -> QueryReport {
        let mut results = ResultSet::new();
        let mut failures = Vec::new();
        let mut scans = Vec::new();

        for arg in args {
            let arg = arg.as_ref();
            let _span = debug_span!("argument", argument = arg).entered();
            match self.resolve(arg, &mut scans) {
                Ok(pids) => {
                    for pid in pids {
                        match self.snapshot.find_by_pid(pid) {
                            Some(process) => {
                                results.insert(process, arg);
                            }
                            None => trace!(pid, argument = arg, "pid not in snapshot, dropped"),
                        }
                    }
                }
                Err(err) => {
                    warn!(argument = arg, error = %err, "argument failed");
                    failures.push(ArgumentFailure::new(arg, &err));
                }
            }
        }

        debug!(
            arguments = args.len(),
            matches = results.len(),
            failures = failures.len(),
            "batch complete"
        );

        QueryReport {
            matches: results.into_vec(),
            failures,
            scans,
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Candidate PIDs for one argument, before the snapshot filter.
    fn resolve(&self, arg: &str, scans: &mut Vec<ScanReport>) -> Result<Vec<u32>, Error> {
        let target = classify(arg)?;
        trace!(argument = arg, kind = target.kind(), "argument classified");

        let pids = match target {
            QueryTarget::Port(port) => self.ports.pids_on_port(port)?,
            QueryTarget::Path(path) => {
                let report = self.owners.owner_of(&path, self.snapshot)?;
                let owner = report.owner.map(|pid| pid.0);
                scans.push(report);
                owner.into_iter().collect()
            }
            QueryTarget::Pid(pid) => vec![pid],
            QueryTarget::Pattern(re) => self
                .snapshot
                .processes()
                .iter()
                .filter(|p| re.is_match(&p.executable))
                .map(|p| p.pid.0)
                .collect(),
        };
        Ok(pids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::NetworkError;
    use crate::locate::ScanKind;
    use pf_common::ProcessId;
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn record(pid: u32, ppid: u32, exe: &str) -> ProcessRecord {
        ProcessRecord {
            pid: ProcessId(pid),
            ppid: ProcessId(ppid),
            uid: Some(1000),
            user: "alice".to_string(),
            executable: exe.to_string(),
        }
    }

    fn snapshot() -> ProcessSnapshot {
        ProcessSnapshot::new(vec![
            record(1, 0, "init"),
            record(100, 1, "sshd"),
            record(200, 100, "bash"),
            record(300, 1, "nginx"),
            record(301, 300, "nginx"),
        ])
    }

    struct FakeOwners {
        owner: Option<u32>,
        fail: bool,
        calls: Mutex<Vec<PathBuf>>,
    }

    impl FakeOwners {
        fn new(owner: Option<u32>) -> Self {
            Self {
                owner,
                fail: false,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl OwnerLookup for FakeOwners {
        fn owner_of(
            &self,
            path: &Path,
            _snapshot: &ProcessSnapshot,
        ) -> Result<ScanReport, LocateError> {
            self.calls.lock().unwrap().push(path.to_path_buf());
            if self.fail {
                return Err(LocateError::ProcRoot {
                    root: "/proc".into(),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                });
            }
            let owner = self.owner.map(ProcessId);
            Ok(ScanReport {
                path: path.to_path_buf(),
                strategy: ScanKind::Parallel,
                owner,
                owners: owner.into_iter().collect(),
                processes_scanned: 5,
                processes_skipped: 0,
                descriptors_checked: 20,
                cancelled: false,
                duration_ms: 1,
            })
        }
    }

    struct FakePorts(Vec<u32>);

    impl PortLookup for FakePorts {
        fn pids_on_port(&self, port: u16) -> Result<Vec<u32>, NetworkError> {
            Ok(if port == 8080 { self.0.clone() } else { Vec::new() })
        }
    }

    #[test]
    fn test_pattern_and_pid_dedup_in_discovery_order() {
        let snap = snapshot();
        let owners = FakeOwners::new(None);
        let ports = FakePorts(vec![]);
        let engine = QueryEngine::new(&snap, &owners, &ports);

        let report = engine.run(&["nginx", "300", "SSH"]);
        let pids: Vec<u32> = report.matches.iter().map(|m| m.process.pid.0).collect();
        assert_eq!(pids, vec![300, 301, 100]);
        assert_eq!(report.matches[0].matched_by, vec!["nginx", "300"]);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_port_results_filtered_by_snapshot() {
        let snap = snapshot();
        let owners = FakeOwners::new(None);
        let ports = FakePorts(vec![300, 99999]);
        let engine = QueryEngine::new(&snap, &owners, &ports);

        let report = engine.run(&[":8080", ":9090"]);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].process.executable, "nginx");
    }

    #[test]
    fn test_path_argument_uses_owner_lookup() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let snap = snapshot();
        let owners = FakeOwners::new(Some(200));
        let ports = FakePorts(vec![]);
        let engine = QueryEngine::new(&snap, &owners, &ports);

        let report = engine.run(&[file.path().to_str().unwrap()]);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].process.pid, ProcessId(200));
        assert_eq!(report.scans.len(), 1);
        assert_eq!(owners.calls.lock().unwrap().as_slice(), &[file.path().to_path_buf()]);
    }

    #[test]
    fn test_failures_do_not_abort_batch() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let snap = snapshot();
        let mut owners = FakeOwners::new(None);
        owners.fail = true;
        let ports = FakePorts(vec![]);
        let engine = QueryEngine::new(&snap, &owners, &ports);

        let report = engine.run(&[":nope", file.path().to_str().unwrap(), "bash"]);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].argument, ":nope");
        assert!(!report.failures[0].systemic);
        assert_eq!(report.failures[0].error.code, 40);
        assert!(report.failures[1].systemic);
        assert_eq!(report.failures[1].error.code, 31);
    }

    #[test]
    fn test_unknown_pid_yields_nothing() {
        let snap = snapshot();
        let owners = FakeOwners::new(None);
        let ports = FakePorts(vec![]);
        let report = QueryEngine::new(&snap, &owners, &ports).run(&["4242"]);
        assert!(!report.has_matches());
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_result_set_insert() {
        let mut set = ResultSet::new();
        let rec = record(7, 1, "vim");
        assert!(set.insert(&rec, "vim"));
        assert!(!set.insert(&rec, "7"));
        assert!(!set.insert(&rec, "vim"));
        assert!(set.contains(7));
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().matched_by, vec!["vim", "7"]);
    }

    #[test]
    fn test_report_json_shape() {
        let snap = snapshot();
        let owners = FakeOwners::new(None);
        let ports = FakePorts(vec![]);
        let report = QueryEngine::new(&snap, &owners, &ports).run(&["bash", ":x"]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["matches"][0]["pid"], 200);
        assert_eq!(json["matches"][0]["matched_by"][0], "bash");
        assert_eq!(json["failures"][0]["argument"], ":x");
        assert_eq!(json["failures"][0]["category"], "query");
        assert!(json["generated_at"].is_string());
    }
}
