//! Live harness: real child processes holding real descriptors.

#![allow(dead_code)]

use std::fs;
use std::io;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

static HARNESS_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Scratch directory plus children that keep files open.
///
/// Children are killed and the directory removed on drop.
#[derive(Debug)]
pub struct LiveHarness {
    temp_dir: PathBuf,
    children: Vec<Child>,
    listeners: Vec<TcpListener>,
}

impl LiveHarness {
    pub fn new() -> io::Result<Self> {
        let suffix = HARNESS_COUNTER.fetch_add(1, Ordering::SeqCst);
        let temp_dir = std::env::temp_dir().join(format!(
            "pf_live_harness_{}_{}",
            std::process::id(),
            suffix
        ));
        fs::create_dir_all(&temp_dir)?;
        Ok(Self {
            temp_dir,
            children: Vec::new(),
            listeners: Vec::new(),
        })
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Create a file in the scratch directory without keeping it open.
    pub fn create_file(&self, name: &str) -> io::Result<PathBuf> {
        let path = self.temp_dir.join(name);
        fs::write(&path, b"pfinder live harness\n")?;
        Ok(path)
    }

    /// Spawn `sleep` holding `path` open on descriptor 3. Returns its PID
    /// once the descriptor is visible under /proc.
    pub fn spawn_holder(&mut self, path: &Path) -> io::Result<u32> {
        let child = Command::new("sh")
            .arg("-c")
            .arg("exec 3<\"$0\"; exec sleep 30")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        let pid = child.id();
        self.children.push(child);

        let fd = PathBuf::from(format!("/proc/{pid}/fd/3"));
        wait_until(Duration::from_secs(5), || {
            fs::read_link(&fd).map(|t| t == path).unwrap_or(false)
                && fs::read_to_string(format!("/proc/{pid}/comm"))
                    .map(|c| c.trim() == "sleep")
                    .unwrap_or(false)
        })?;
        Ok(pid)
    }

    /// Listen on an ephemeral localhost port from this process.
    pub fn listen_tcp(&mut self) -> io::Result<u16> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        self.listeners.push(listener);
        Ok(port)
    }

    pub fn kill_children(&mut self) {
        for mut child in self.children.drain(..) {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for LiveHarness {
    fn drop(&mut self) {
        self.kill_children();
        let _ = fs::remove_dir_all(&self.temp_dir);
    }
}

fn wait_until(timeout: Duration, mut ready: impl FnMut() -> bool) -> io::Result<()> {
    let started = Instant::now();
    while !ready() {
        if started.elapsed() > timeout {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "child never reached the expected state",
            ));
        }
        thread::sleep(Duration::from_millis(10));
    }
    Ok(())
}
