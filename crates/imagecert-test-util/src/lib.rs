//! Shared test utilities for the imagecert workspace.
//!
//! This crate exists because several crates (and `xtask`) need the same stub
//! executables and JSON helpers outside of a single `#[cfg(test)]` module.

use serde_json::{Value, json};
use std::path::{Path, PathBuf};

/// File the stubs built by [`recording_stub`] append their arguments to.
pub const CALLS_FILE: &str = "calls.log";

/// Write an executable `#!/bin/sh` script named `name` into `dir`.
#[cfg(unix)]
pub fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write stub script");
    let mut perms = std::fs::metadata(&path)
        .expect("stat stub script")
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod stub script");
    path
}

/// A stub that records `"$@"` to [`CALLS_FILE`] in `dir` and then runs `body`.
#[cfg(unix)]
pub fn recording_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
    let calls = dir.join(CALLS_FILE);
    let script = format!("echo \"$@\" >> '{}'\n{body}", calls.display());
    write_stub(dir, name, &script)
}

/// Lines recorded by a [`recording_stub`], oldest first.
pub fn read_calls(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join(CALLS_FILE))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Build a results document the way the worker writes it.
pub fn results_json(
    tested_image: &str,
    passed_overall: bool,
    passed: &[&str],
    failed: &[&str],
    errors: &[&str],
) -> String {
    let entry = |name: &&str| {
        json!({
            "name": name,
            "metadata": { "description": format!("stub {name}"), "level": "good" },
            "help": { "message": "stub", "suggestion": "stub" },
            "elapsed_ms": 1,
        })
    };
    json!({
        "tested_image": tested_image,
        "passed_overall": passed_overall,
        "passed": passed.iter().map(entry).collect::<Vec<_>>(),
        "failed": failed.iter().map(entry).collect::<Vec<_>>(),
        "errors": errors.iter().map(entry).collect::<Vec<_>>(),
    })
    .to_string()
}

/// Normalize non-deterministic fields for golden-file comparison.
///
/// `elapsed_ms` is replaced with `0` at any depth.
pub fn normalize_nondeterministic(mut value: Value) -> Value {
    normalize_recursive(&mut value);
    value
}

fn normalize_recursive(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.contains_key("elapsed_ms") {
                map.insert("elapsed_ms".to_string(), Value::Number(0.into()));
            }
            for val in map.values_mut() {
                normalize_recursive(val);
            }
        }
        Value::Array(arr) => {
            for val in arr.iter_mut() {
                normalize_recursive(val);
            }
        }
        _ => {}
    }
}

/// Names recorded in one bucket of a results document.
pub fn bucket_names(results: &Value, bucket: &str) -> Vec<String> {
    results[bucket]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|e| e["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
