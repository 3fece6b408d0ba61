//! Fuzz target for config.json parsing and validation.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pf_config::{validate_settings, Settings};

fuzz_target!(|data: &[u8]| {
    // Parse errors are fine; anything that parses must validate without
    // panicking.
    if let Ok(settings) = serde_json::from_slice::<Settings>(data) {
        let _ = validate_settings(&settings);
    }
});
