use anyhow::Context;
use camino::Utf8Path;
use imagecert_types::{Outcome, Results};

pub fn serialize_results(results: &Results) -> anyhow::Result<Vec<u8>> {
    serde_json::to_vec_pretty(results).context("serialize results")
}

pub fn parse_results_json(text: &str) -> anyhow::Result<Results> {
    serde_json::from_str(text).context("parse results json")
}

/// Write pretty JSON to `path`, creating parent directories.
pub fn write_results(path: &Utf8Path, results: &Results) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| format!("create {parent}"))?;
    }
    let mut bytes = serialize_results(results)?;
    bytes.push(b'\n');
    std::fs::write(path, bytes).with_context(|| format!("write {path}"))
}

/// Human-readable verdict: one line per check, then the overall result.
pub fn format_summary(results: &Results) -> String {
    let mut out = String::new();
    for (outcome, result) in results.entries() {
        let label = match outcome {
            Outcome::Passed => "PASS ",
            Outcome::Failed => "FAIL ",
            Outcome::Errored => "ERROR",
        };
        out.push_str(&format!("{label} {}", result.name));
        if let Some(error) = &result.error {
            out.push_str(&format!(": {error}"));
        }
        out.push('\n');
    }
    let verdict = if results.passed_overall { "PASSED" } else { "NOT PASSED" };
    out.push_str(&format!("{}: {verdict}\n", results.tested_image));
    out
}
