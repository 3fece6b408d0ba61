//! Fuzz target for /proc/net/tcp and tcp6 parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pf_core::collect::network::{parse_lsof_pid_list, parse_proc_net_tcp_content, parse_socket_inode};
use std::path::Path;

fuzz_target!(|data: &str| {
    let _ = parse_proc_net_tcp_content(data, false);
    let _ = parse_proc_net_tcp_content(data, true);
    let _ = parse_lsof_pid_list(data);
    for line in data.lines() {
        let _ = parse_socket_inode(Path::new(line));
    }
});
