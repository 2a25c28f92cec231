//! Fuzz target for parsing a worker's results payload.
//!
//! Goal: parsing never panics, and anything that parses serializes back to a
//! document that parses to the same value.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_results_json
//! ```

#![no_main]

use imagecert_types::Results;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(results) = serde_json::from_slice::<Results>(data) else {
        return;
    };
    let _ = results.all_passed();
    let bytes = serde_json::to_vec(&results).expect("serialize parsed results");
    let again: Results = serde_json::from_slice(&bytes).expect("reparse serialized results");
    assert_eq!(again, results);
});
