//! Fuzz target for `lsof -F fn` and `ps -axo` output parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pf_core::collect::ps::parse_ps_output;
use pf_core::collect::UserTable;
use pf_core::locate::parse_lsof_fields;

fuzz_target!(|data: &str| {
    let _ = parse_lsof_fields(data);
    let _ = parse_ps_output(data, &UserTable::default());
    let _ = UserTable::from_passwd_content(data);
});
