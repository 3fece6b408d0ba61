//! Live-system tests: real children holding real files, real /proc.

#![cfg(target_os = "linux")]

use assert_cmd::Command;
use pf_common::ProcessId;
use pf_config::{ScanSettings, Strategy};
use pf_core::collect::{list_processes, PortLookup, ProcNetTcp, UserTable};
use pf_core::locate::{LocateOptions, Locator};
use predicates::prelude::*;
use std::path::Path;

mod support;
use support::live_harness::LiveHarness;

fn skip_if_proc_unavailable() -> bool {
    if !Path::new("/proc/self/fd").exists() {
        eprintln!("skipping: /proc not available on this system");
        return true;
    }
    false
}

fn live_options(strategy: Strategy) -> LocateOptions {
    let mut options = LocateOptions::from(&ScanSettings::default());
    options.strategy = strategy;
    options
}

#[test]
fn live_child_found_by_both_strategies() {
    if skip_if_proc_unavailable() {
        return;
    }
    let mut harness = LiveHarness::new().expect("harness init");
    let file = harness.create_file("held.txt").unwrap();
    let pid = harness.spawn_holder(&file).expect("holder child");

    let snapshot = list_processes(Path::new("/proc"), &UserTable::load()).unwrap();
    for strategy in [Strategy::Parallel, Strategy::Sequential] {
        let report = Locator::new(live_options(strategy))
            .locate(&file, &snapshot.pids())
            .unwrap();
        assert_eq!(report.owner, Some(ProcessId(pid)), "strategy {strategy}");
    }
}

#[test]
fn live_unheld_file_has_no_owner() {
    if skip_if_proc_unavailable() {
        return;
    }
    let harness = LiveHarness::new().expect("harness init");
    let file = harness.create_file("unheld.txt").unwrap();

    let snapshot = list_processes(Path::new("/proc"), &UserTable::load()).unwrap();
    let report = Locator::new(live_options(Strategy::Sequential))
        .locate(&file, &snapshot.pids())
        .unwrap();
    assert_eq!(report.owner, None);
}

#[test]
fn live_listener_found_by_port() {
    if skip_if_proc_unavailable() || !Path::new("/proc/net/tcp").exists() {
        return;
    }
    let mut harness = LiveHarness::new().expect("harness init");
    let port = harness.listen_tcp().unwrap();

    let pids = ProcNetTcp::new("/proc").pids_on_port(port).unwrap();
    assert!(pids.contains(&std::process::id()), "pids on :{port}: {pids:?}");
}

#[test]
fn live_cli_reports_holder() {
    if skip_if_proc_unavailable() {
        return;
    }
    let mut harness = LiveHarness::new().expect("harness init");
    let file = harness.create_file("cli.txt").unwrap();
    let pid = harness.spawn_holder(&file).expect("holder child");

    let config = harness.temp_dir().join("config.json");
    std::fs::write(&config, "{}").unwrap();
    Command::cargo_bin("pfinder")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg(&file)
        .assert()
        .code(0)
        .stdout(predicate::str::contains(format!("[PID:{pid}]")))
        .stdout(predicate::str::contains("sleep"));
}
