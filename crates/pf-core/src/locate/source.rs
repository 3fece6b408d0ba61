//! Platform introspection: where descriptor tables come from.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::collect::command::{run_command, DEFAULT_TOOL_TIMEOUT};
use crate::collect::procfs::list_pids;

/// One open descriptor of a process.
///
/// procfs hands out a symlink location that still needs resolving; `lsof`
/// reports the target together with the descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorEntry {
    /// Descriptor name (`"3"`, `"17"`).
    pub fd: String,
    location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Link(PathBuf),
    Resolved(PathBuf),
}

impl DescriptorEntry {
    /// Entry whose target is found by reading the symlink at `link`.
    pub fn link(fd: impl Into<String>, link: impl Into<PathBuf>) -> Self {
        Self {
            fd: fd.into(),
            location: Location::Link(link.into()),
        }
    }

    /// Entry whose target is already known.
    pub fn resolved(fd: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            fd: fd.into(),
            location: Location::Resolved(target.into()),
        }
    }

    /// Symlink location, when the target still needs resolving.
    pub fn link_path(&self) -> Option<&Path> {
        match &self.location {
            Location::Link(p) => Some(p),
            Location::Resolved(_) => None,
        }
    }

    /// Prefetched target, when the source supplied one.
    pub fn target(&self) -> Option<&Path> {
        match &self.location {
            Location::Link(_) => None,
            Location::Resolved(p) => Some(p),
        }
    }
}

/// Access to per-process descriptor tables.
///
/// Every call reads live OS state; nothing is cached between calls.
pub trait DescriptorSource: Send + Sync {
    /// Location shown in errors (`/proc`, `lsof`).
    fn location(&self) -> String;

    /// Every process visible at the root, ascending.
    fn pids(&self) -> io::Result<Vec<u32>>;

    /// Descriptor entries of one process.
    fn list(&self, pid: u32) -> io::Result<Vec<DescriptorEntry>>;

    /// Resolve an entry to the path it refers to.
    fn resolve(&self, _pid: u32, entry: &DescriptorEntry) -> io::Result<PathBuf> {
        match &entry.location {
            Location::Link(link) => fs::read_link(link),
            Location::Resolved(target) => Ok(target.clone()),
        }
    }
}

/// Descriptor tables from a procfs tree: `<root>/<pid>/fd/<n>` symlinks.
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DescriptorSource for ProcFs {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    fn pids(&self) -> io::Result<Vec<u32>> {
        list_pids(&self.root)
    }

    fn list(&self, pid: u32) -> io::Result<Vec<DescriptorEntry>> {
        let fd_dir = self.root.join(pid.to_string()).join("fd");
        let entries = fs::read_dir(fd_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| {
                let fd = entry.file_name().to_string_lossy().into_owned();
                DescriptorEntry::link(fd, entry.path())
            })
            .collect();
        Ok(entries)
    }
}

/// Descriptor tables from `lsof -F fn` (macOS).
#[derive(Debug, Clone)]
pub struct LsofDescriptors {
    timeout: Duration,
}

impl Default for LsofDescriptors {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }
}

impl DescriptorSource for LsofDescriptors {
    fn location(&self) -> String {
        "lsof".to_string()
    }

    fn pids(&self) -> io::Result<Vec<u32>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "lsof cannot enumerate a process root",
        ))
    }

    fn list(&self, pid: u32) -> io::Result<Vec<DescriptorEntry>> {
        let pid_arg = pid.to_string();
        let output = run_command(
            "lsof",
            &["-n", "-P", "-F", "fn", "-p", &pid_arg],
            self.timeout,
        )?;
        if !output.success() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("lsof exited with status {:?} for pid {pid}", output.exit_code),
            ));
        }
        Ok(parse_lsof_fields(&output.stdout))
    }
}

/// Parse `lsof -F fn` output into numeric descriptor entries.
///
/// Records are one field per line, tagged by the first character: `p` starts
/// a process, `f` a descriptor, `n` carries the name of the current
/// descriptor. Non-numeric descriptors (`cwd`, `txt`, `mem`) are not part of
/// the descriptor table and are dropped.
pub fn parse_lsof_fields(output: &str) -> Vec<DescriptorEntry> {
    let mut entries = Vec::new();
    let mut current_fd: Option<String> = None;

    for line in output.lines() {
        let mut chars = line.chars();
        let Some(tag) = chars.next() else { continue };
        let value = chars.as_str();
        match tag {
            'p' => current_fd = None,
            'f' => {
                current_fd = value
                    .chars()
                    .all(|c| c.is_ascii_digit())
                    .then(|| value.to_string())
                    .filter(|fd| !fd.is_empty());
            }
            'n' => {
                if let Some(fd) = current_fd.take() {
                    entries.push(DescriptorEntry::resolved(fd, value));
                }
            }
            _ => {}
        }
    }

    entries
}
