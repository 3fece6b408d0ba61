//! Argument dispatch against a mock /proc tree, end to end through the
//! snapshot, the locator and the TCP tables.

use pf_config::{PathMatch, Strategy as ScanStrategy};
use pf_core::collect::procfs::list_processes_procfs;
use pf_core::collect::{ProcNetTcp, ProcessSnapshot, UserTable};
use pf_core::locate::{LocateOptions, Locator, ProcFs};
use pf_core::query::{QueryEngine, QueryReport};
use pf_core::test_utils::MockProcTree;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

const PASSWD: &str = "root:x:0:0:root:/root:/bin/sh\nwww-data:x:33:33::/var/www:/usr/sbin/nologin\nalice:x:1000:1000::/home/alice:/bin/bash\n";

struct Fixture {
    tree: MockProcTree,
    _files: tempfile::TempDir,
    log: PathBuf,
    snapshot: ProcessSnapshot,
}

/// init(1) → sshd(100) → bash(200); nginx master(300) and worker(301)
/// listening on :8080; a sqlite process(400) holding the log file.
fn fixture() -> Fixture {
    let tree = MockProcTree::new().unwrap();
    let files = tempfile::tempdir().unwrap();
    let log = files.path().join("app.log");
    fs::write(&log, b"line\n").unwrap();

    tree.process(1, "init", 0, 0).unwrap();
    tree.process(100, "sshd", 1, 0).unwrap();
    tree.process(200, "bash", 100, 1000).unwrap();
    tree.process(300, "nginx", 1, 0).unwrap();
    tree.process(301, "nginx", 300, 33).unwrap();
    tree.process(400, "sqlite3", 200, 1000).unwrap();

    tree.fd(200, 0, "/dev/pts/0").unwrap();
    tree.socket(300, 6, 7001).unwrap();
    tree.socket(301, 6, 7001).unwrap();
    tree.socket(100, 3, 7002).unwrap();
    tree.tcp_socket(8080, "0A", 7001).unwrap();
    tree.tcp_socket(22, "0A", 7002).unwrap();
    tree.tcp6_socket(22, "0A", 7002).unwrap();
    tree.fd(400, 3, &log).unwrap();

    let users = UserTable::from_passwd_content(PASSWD);
    let snapshot = ProcessSnapshot::new(list_processes_procfs(tree.root(), &users).unwrap());
    Fixture {
        tree,
        _files: files,
        log,
        snapshot,
    }
}

fn run(fx: &Fixture, args: &[&str]) -> QueryReport {
    let options = LocateOptions {
        strategy: ScanStrategy::Parallel,
        max_workers: 4,
        path_match: PathMatch::Literal,
        cancel_on_match: false,
        excluded_pid: None,
        proc_root: fx.tree.root().to_path_buf(),
    };
    let locator = Locator::with_source(options, Arc::new(ProcFs::new(fx.tree.root())));
    let ports = ProcNetTcp::new(fx.tree.root());
    QueryEngine::new(&fx.snapshot, &locator, &ports).run(args)
}

fn pids(report: &QueryReport) -> Vec<u32> {
    report.matches.iter().map(|m| m.process.pid.0).collect()
}

#[test]
fn port_resolves_every_holder() {
    let fx = fixture();
    let report = run(&fx, &[":8080"]);
    assert_eq!(pids(&report), vec![300, 301]);
    assert_eq!(report.matches[1].process.user, "www-data");
    assert_eq!(report.matches[1].process.ppid.0, 300);
}

#[test]
fn port_in_both_tables_reported_once() {
    let fx = fixture();
    let report = run(&fx, &[":22"]);
    assert_eq!(pids(&report), vec![100]);
}

#[test]
fn open_file_resolves_holder() {
    let fx = fixture();
    let report = run(&fx, &[fx.log.to_str().unwrap()]);
    assert_eq!(pids(&report), vec![400]);
    assert_eq!(report.matches[0].process.executable, "sqlite3");
    assert_eq!(report.scans.len(), 1);
}

#[test]
fn pid_and_pattern_arguments() {
    let fx = fixture();
    let report = run(&fx, &["200", "NGI"]);
    assert_eq!(pids(&report), vec![200, 300, 301]);
}

#[test]
fn unknown_targets_give_empty_report() {
    let fx = fixture();
    let report = run(&fx, &[":9999", "99999", "no-such-exe"]);
    assert!(report.matches.is_empty());
    assert!(report.failures.is_empty());
}

#[test]
fn bad_arguments_reported_and_skipped() {
    let fx = fixture();
    let report = run(&fx, &[":http", "", "bash"]);
    assert_eq!(pids(&report), vec![200]);
    let failed: Vec<&str> = report.failures.iter().map(|f| f.argument.as_str()).collect();
    assert_eq!(failed, vec![":http", ""]);
    assert!(report.failures.iter().all(|f| !f.systemic));
}

#[test]
fn every_argument_recorded_in_matched_by() {
    let fx = fixture();
    let log = fx.log.to_str().unwrap().to_string();
    let report = run(&fx, &["sqlite", &log, "400"]);
    assert_eq!(pids(&report), vec![400]);
    assert_eq!(report.matches[0].matched_by, vec!["sqlite", log.as_str(), "400"]);
}

fn argument_strategy() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(
        prop::sample::select(vec![
            ":8080", ":22", ":9999", "1", "200", "301", "4242", "nginx", "SH", "init", "zzz",
        ]),
        0..12,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Every PID appears once, and the set of PIDs does not depend on
    /// argument order or repetition.
    #[test]
    fn results_deduplicated_and_order_independent(args in argument_strategy()) {
        let fx = fixture();
        let report = run(&fx, &args);
        let found = pids(&report);
        let unique: BTreeSet<u32> = found.iter().copied().collect();
        prop_assert_eq!(unique.len(), found.len());

        let mut reversed = args.clone();
        reversed.reverse();
        let mut doubled = args.clone();
        doubled.extend(args.iter().copied());

        for variant in [reversed, doubled] {
            let other: BTreeSet<u32> = pids(&run(&fx, &variant)).into_iter().collect();
            prop_assert_eq!(&other, &unique);
        }
    }
}
