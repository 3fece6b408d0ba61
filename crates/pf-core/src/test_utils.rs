//! Test utilities for pf-core.
//!
//! - `assert_ok!` / `assert_err!` macros
//! - [`MockProcTree`]: a `/proc`-shaped directory in a tempdir
//! - [`MockProcessBuilder`]: snapshot records without touching the OS

use pf_common::ProcessId;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use crate::collect::ProcessRecord;

/// Assert that a Result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($expr:expr, $msg:expr) => {
        match $expr {
            Ok(val) => val,
            Err(e) => panic!("{}: {:?}", $msg, e),
        }
    };
}

/// Assert that a Result is Err.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(val) => panic!("Expected Err, got Ok: {:?}", val),
            Err(_) => {}
        }
    };
    ($expr:expr, $msg:expr) => {
        match $expr {
            Ok(val) => panic!("{}: got Ok({:?})", $msg, val),
            Err(_) => {}
        }
    };
}

const TCP_HEADER: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode\n";

/// A fake procfs root.
///
/// Each process gets `stat`, `status` and an `fd/` directory of symlinks,
/// which is all the collectors and the descriptor scanner read.
#[derive(Debug)]
pub struct MockProcTree {
    dir: tempfile::TempDir,
}

impl MockProcTree {
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::tempdir()?;
        // Non-numeric entries every real /proc has.
        fs::create_dir(dir.path().join("sys"))?;
        fs::write(dir.path().join("uptime"), "1.00 1.00\n")?;
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn pid_dir(&self, pid: u32) -> PathBuf {
        self.root().join(pid.to_string())
    }

    /// Add a process with an empty descriptor table.
    pub fn process(&self, pid: u32, comm: &str, ppid: u32, uid: u32) -> io::Result<()> {
        let dir = self.pid_dir(pid);
        fs::create_dir_all(dir.join("fd"))?;
        fs::write(
            dir.join("stat"),
            format!("{pid} ({comm}) S {ppid} {pid} {pid} 0 -1 4194304 100 0 0 0 1 1 0 0 20 0 1 0 100\n"),
        )?;
        fs::write(
            dir.join("status"),
            format!("Name:\t{comm}\nState:\tS (sleeping)\nPid:\t{pid}\nPPid:\t{ppid}\nUid:\t{uid}\t{uid}\t{uid}\t{uid}\n"),
        )?;
        Ok(())
    }

    /// Point descriptor `fd` of `pid` at `target`.
    pub fn fd(&self, pid: u32, fd: u32, target: impl AsRef<Path>) -> io::Result<()> {
        let fd_dir = self.pid_dir(pid).join("fd");
        fs::create_dir_all(&fd_dir)?;
        symlink(target, fd_dir.join(fd.to_string()))
    }

    /// Give `pid` a descriptor on socket `inode`.
    pub fn socket(&self, pid: u32, fd: u32, inode: u64) -> io::Result<()> {
        self.fd(pid, fd, format!("socket:[{inode}]"))
    }

    /// Remove the descriptor directory, so listing it fails like a process
    /// that exited mid-scan.
    pub fn drop_fd_dir(&self, pid: u32) -> io::Result<()> {
        fs::remove_dir_all(self.pid_dir(pid).join("fd"))
    }

    /// Add a socket bound on 127.0.0.1:`port` in `state` (hex, `0A` is LISTEN)
    /// to `net/tcp`.
    pub fn tcp_socket(&self, port: u16, state: &str, inode: u64) -> io::Result<()> {
        self.append_tcp("tcp", &format!("0100007F:{port:04X}"), state, inode)
    }

    /// Add a socket bound on [::]:`port` to `net/tcp6`.
    pub fn tcp6_socket(&self, port: u16, state: &str, inode: u64) -> io::Result<()> {
        self.append_tcp(
            "tcp6",
            &format!("00000000000000000000000000000000:{port:04X}"),
            state,
            inode,
        )
    }

    fn append_tcp(&self, table: &str, local: &str, state: &str, inode: u64) -> io::Result<()> {
        let net = self.root().join("net");
        fs::create_dir_all(&net)?;
        let path = net.join(table);
        let fresh = !path.exists();
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if fresh {
            file.write_all(TCP_HEADER.as_bytes())?;
        }
        writeln!(
            file,
            "   0: {local} 00000000:0000 {state} 00000000:00000000 00:00000000 00000000  1000        0 {inode} 1 0000000000000000 100 0 0 10 0"
        )
    }
}

/// Builder for snapshot records.
#[derive(Debug, Clone)]
pub struct MockProcessBuilder {
    record: ProcessRecord,
}

impl Default for MockProcessBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProcessBuilder {
    pub fn new() -> Self {
        Self {
            record: ProcessRecord {
                pid: ProcessId(1000),
                ppid: ProcessId(1),
                uid: Some(1000),
                user: "alice".to_string(),
                executable: "test".to_string(),
            },
        }
    }

    pub fn pid(mut self, pid: u32) -> Self {
        self.record.pid = ProcessId(pid);
        self
    }

    pub fn ppid(mut self, ppid: u32) -> Self {
        self.record.ppid = ProcessId(ppid);
        self
    }

    pub fn user(mut self, uid: u32, name: impl Into<String>) -> Self {
        self.record.uid = Some(uid);
        self.record.user = name.into();
        self
    }

    pub fn executable(mut self, exe: impl Into<String>) -> Self {
        self.record.executable = exe.into();
        self
    }

    pub fn build(self) -> ProcessRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::procfs::list_processes_procfs;
    use crate::collect::{PortLookup, ProcNetTcp, UserTable};

    #[test]
    fn test_mock_tree_readable_by_collectors() {
        let tree = MockProcTree::new().unwrap();
        tree.process(1, "init", 0, 0).unwrap();
        tree.process(42, "my daemon", 1, 1000).unwrap();

        let users = UserTable::from_passwd_content("root:x:0:0::/root:/bin/sh\n");
        let processes = list_processes_procfs(tree.root(), &users).unwrap();
        assert_eq!(processes.len(), 2);
        assert_eq!(processes[1].executable, "my daemon");
        assert_eq!(processes[1].ppid, ProcessId(1));
        assert_eq!(processes[0].user, "root");
        assert_eq!(processes[1].user, "unknown");
    }

    #[test]
    fn test_mock_tree_sockets() {
        let tree = MockProcTree::new().unwrap();
        tree.process(7, "nginx", 1, 33).unwrap();
        tree.socket(7, 3, 5555).unwrap();
        tree.tcp_socket(8080, "0A", 5555).unwrap();
        tree.tcp6_socket(8443, "0A", 6666).unwrap();

        let lookup = ProcNetTcp::new(tree.root());
        assert_eq!(lookup.pids_on_port(8080).unwrap(), vec![7]);
        assert!(lookup.pids_on_port(8443).unwrap().is_empty());
    }

    #[test]
    fn test_builder() {
        let rec = MockProcessBuilder::new()
            .pid(5)
            .ppid(2)
            .user(0, "root")
            .executable("sshd")
            .build();
        assert_eq!(rec.pid, ProcessId(5));
        assert_eq!(rec.user, "root");
        assert_eq!(rec.executable, "sshd");
    }
}
