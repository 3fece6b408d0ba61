#![allow(dead_code)]

pub mod live_harness;
