//! TCP port → PID lookup.
//!
//! Linux reads `/proc/net/tcp{,6}` and maps socket inodes back to processes
//! through their descriptor tables. macOS asks `lsof`.

use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

use super::command::{run_command, DEFAULT_TOOL_TIMEOUT};
use crate::locate::{DescriptorSource, ProcFs};

/// Errors from port lookups.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("cannot read TCP tables under {}: {source}", root.display())]
    TablesUnreadable {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("lsof failed: {0}")]
    Command(String),

    #[error("port lookup not supported on {0}")]
    UnsupportedPlatform(String),
}

impl From<NetworkError> for pf_common::Error {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::UnsupportedPlatform(os) => pf_common::Error::UnsupportedPlatform(os),
            other => pf_common::Error::PortLookup(other.to_string()),
        }
    }
}

/// Resolves a local TCP port to the PIDs holding a socket on it.
pub trait PortLookup: Send + Sync {
    /// PIDs with a TCP socket whose local port is `port`, sorted and deduplicated.
    fn pids_on_port(&self, port: u16) -> Result<Vec<u32>, NetworkError>;
}

/// TCP connection state, as encoded in `/proc/net/tcp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TcpState {
    Established,
    SynSent,
    SynRecv,
    FinWait1,
    FinWait2,
    TimeWait,
    Close,
    CloseWait,
    LastAck,
    Listen,
    Closing,
    Unknown,
}

impl TcpState {
    pub fn from_hex(hex: u8) -> Self {
        match hex {
            0x01 => TcpState::Established,
            0x02 => TcpState::SynSent,
            0x03 => TcpState::SynRecv,
            0x04 => TcpState::FinWait1,
            0x05 => TcpState::FinWait2,
            0x06 => TcpState::TimeWait,
            0x07 => TcpState::Close,
            0x08 => TcpState::CloseWait,
            0x09 => TcpState::LastAck,
            0x0A => TcpState::Listen,
            0x0B => TcpState::Closing,
            _ => TcpState::Unknown,
        }
    }
}

/// One row of `/proc/net/tcp` or `/proc/net/tcp6`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TcpSocket {
    pub local_addr: IpAddr,
    pub local_port: u16,
    pub state: TcpState,
    pub inode: u64,
}

/// Parse the content of `/proc/net/tcp` (or `tcp6` with `is_ipv6`).
///
/// Format: `sl local_address rem_address st tx:rx tr:tm retrnsmt uid timeout inode ...`
pub fn parse_proc_net_tcp_content(content: &str, is_ipv6: bool) -> Vec<TcpSocket> {
    let mut sockets = Vec::new();

    for line in content.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 10 {
            continue;
        }
        let Some((local_addr, local_port)) = parse_addr_port(parts[1], is_ipv6) else {
            continue;
        };
        let state = u8::from_str_radix(parts[3], 16)
            .map(TcpState::from_hex)
            .unwrap_or(TcpState::Unknown);
        let Ok(inode) = parts[9].parse::<u64>() else {
            continue;
        };

        sockets.push(TcpSocket {
            local_addr,
            local_port,
            state,
            inode,
        });
    }

    sockets
}

/// Parse `ADDR:PORT` in the hex encoding used by `/proc/net`.
fn parse_addr_port(addr_port: &str, is_ipv6: bool) -> Option<(IpAddr, u16)> {
    let (addr_hex, port_hex) = addr_port.split_once(':')?;
    let port = u16::from_str_radix(port_hex, 16).ok()?;
    let addr = if is_ipv6 {
        IpAddr::V6(parse_ipv6_addr(addr_hex)?)
    } else {
        IpAddr::V4(parse_ipv4_addr(addr_hex)?)
    };
    Some((addr, port))
}

/// IPv4 is a single little-endian 32-bit word.
fn parse_ipv4_addr(hex: &str) -> Option<Ipv4Addr> {
    if hex.len() != 8 {
        return None;
    }
    let word = u32::from_str_radix(hex, 16).ok()?;
    Some(Ipv4Addr::from(word.swap_bytes()))
}

/// IPv6 is four little-endian 32-bit words.
fn parse_ipv6_addr(hex: &str) -> Option<Ipv6Addr> {
    if hex.len() != 32 {
        return None;
    }
    let mut octets = [0u8; 16];
    for i in 0..4 {
        let word = u32::from_str_radix(hex.get(i * 8..(i + 1) * 8)?, 16).ok()?;
        octets[i * 4..(i + 1) * 4].copy_from_slice(&word.to_le_bytes());
    }
    Some(Ipv6Addr::from(octets))
}

/// Inode of a `socket:[INODE]` descriptor target.
pub fn parse_socket_inode(target: &Path) -> Option<u64> {
    target
        .to_str()?
        .strip_prefix("socket:[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}

/// Linux lookup over a procfs root.
#[derive(Debug, Clone)]
pub struct ProcNetTcp {
    root: PathBuf,
}

impl ProcNetTcp {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Inodes of every TCP socket (any state) bound locally on `port`.
    pub fn socket_inodes(&self, port: u16) -> Result<HashSet<u64>, NetworkError> {
        let mut inodes = HashSet::new();
        let mut last_error = None;
        let mut any_read = false;

        for (file, is_ipv6) in [("tcp", false), ("tcp6", true)] {
            let path = self.root.join("net").join(file);
            match fs::read_to_string(&path) {
                Ok(content) => {
                    any_read = true;
                    for socket in parse_proc_net_tcp_content(&content, is_ipv6) {
                        if socket.local_port != port || socket.inode == 0 {
                            continue;
                        }
                        trace!(
                            addr = %socket.local_addr,
                            port,
                            state = ?socket.state,
                            inode = socket.inode,
                            "socket on port"
                        );
                        inodes.insert(socket.inode);
                    }
                }
                Err(e) => {
                    trace!(path = %path.display(), error = %e, "tcp table unreadable");
                    last_error = Some(e);
                }
            }
        }

        match (any_read, last_error) {
            (false, Some(source)) => Err(NetworkError::TablesUnreadable {
                root: self.root.clone(),
                source,
            }),
            _ => Ok(inodes),
        }
    }
}

impl PortLookup for ProcNetTcp {
    fn pids_on_port(&self, port: u16) -> Result<Vec<u32>, NetworkError> {
        let inodes = self.socket_inodes(port)?;
        if inodes.is_empty() {
            return Ok(Vec::new());
        }
        let source = ProcFs::new(&self.root);
        let pids = source.pids().map_err(|source| NetworkError::TablesUnreadable {
            root: self.root.clone(),
            source,
        })?;
        let owners = socket_owners(&source, &pids, &inodes);
        debug!(port, inodes = inodes.len(), owners = owners.len(), "port resolved");
        Ok(owners)
    }
}

/// PIDs whose descriptor table references one of `inodes`.
pub fn socket_owners(
    source: &dyn DescriptorSource,
    pids: &[u32],
    inodes: &HashSet<u64>,
) -> Vec<u32> {
    let mut owners = Vec::new();
    for &pid in pids {
        let Ok(entries) = source.list(pid) else {
            continue;
        };
        let holds_socket = entries.iter().any(|entry| {
            source
                .resolve(pid, entry)
                .ok()
                .and_then(|target| parse_socket_inode(&target))
                .is_some_and(|inode| inodes.contains(&inode))
        });
        if holds_socket {
            owners.push(pid);
        }
    }
    owners.sort_unstable();
    owners.dedup();
    owners
}

/// macOS lookup via `lsof -nP -iTCP:<port> -t`.
#[derive(Debug, Clone)]
pub struct LsofPorts {
    timeout: Duration,
}

impl Default for LsofPorts {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }
}

impl PortLookup for LsofPorts {
    fn pids_on_port(&self, port: u16) -> Result<Vec<u32>, NetworkError> {
        let selector = format!("-iTCP:{port}");
        let output = run_command("lsof", &["-nP", &selector, "-t"], self.timeout)
            .map_err(|e| NetworkError::Command(e.to_string()))?;

        // lsof exits 1 when nothing matched.
        if !output.success() && !(output.exit_code == Some(1) && output.stdout.trim().is_empty()) {
            return Err(NetworkError::Command(format!(
                "exited with status {:?}",
                output.exit_code
            )));
        }

        Ok(parse_lsof_pid_list(&output.stdout))
    }
}

/// Parse `lsof -t` output: one PID per line.
pub fn parse_lsof_pid_list(output: &str) -> Vec<u32> {
    let mut pids: Vec<u32> = output
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect();
    pids.sort_unstable();
    pids.dedup();
    pids
}

/// Platform port lookup.
pub fn default_port_lookup(proc_root: &Path) -> Result<Box<dyn PortLookup>, NetworkError> {
    if cfg!(target_os = "linux") {
        Ok(Box::new(ProcNetTcp::new(proc_root)))
    } else if cfg!(target_os = "macos") {
        Ok(Box::new(LsofPorts::default()))
    } else {
        Err(NetworkError::UnsupportedPlatform(
            std::env::consts::OS.to_string(),
        ))
    }
}
