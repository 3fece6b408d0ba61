//! Fuzz target for /proc/[pid]/stat and status parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pf_core::collect::procfs::{parse_stat_content, parse_status_uid};

fuzz_target!(|data: &str| {
    // Malformed input yields None, never a panic. Multi-byte characters
    // around the parentheses exercise the comm slicing.
    let _ = parse_stat_content(data);
    let _ = parse_status_uid(data);
});
