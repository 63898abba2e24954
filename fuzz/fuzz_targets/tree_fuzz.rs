//! Fuzz test for tree building
//!
//! Feeds newline-separated keys into one builder. Applying must never panic
//! and must respect the array index limit.
//!
//! Run with: cargo +nightly fuzz run tree_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use serde_json::Value;
use vitrine_core::{ApplyOutcome, TreeBuilder};

const MAX_INDEX: usize = 64;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let mut builder = TreeBuilder::new().with_max_array_index(MAX_INDEX);
    for key in input.lines() {
        let outcome = builder.apply_key(key, Value::String(key.to_string()));
        if let ApplyOutcome::IndexTooLarge { index } = outcome {
            assert!(index > MAX_INDEX);
        }
    }

    let tree = builder.into_value();
    assert!(tree.is_object());
});
