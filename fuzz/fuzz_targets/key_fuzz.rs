//! Fuzz test for the flat key parser
//!
//! Run with: cargo +nightly fuzz run key_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use vitrine_core::{parse_key, render_key};

fuzz_target!(|data: &[u8]| {
    if let Ok(key) = std::str::from_utf8(data) {
        // Parsing never panics and rendering is a fixed point after one pass.
        let path = parse_key(key);
        let rendered = render_key(&path);
        assert_eq!(parse_key(&rendered), path, "render/parse must be stable");
    }
});
