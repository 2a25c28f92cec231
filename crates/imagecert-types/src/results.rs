use crate::meta::{HelpText, Metadata};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stable schema identifier for the results document.
pub const SCHEMA_RESULTS_V1: &str = "imagecert.results.v1";

/// Which bucket a check landed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
    Errored,
}

/// Outcome record for a single check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CheckResult {
    pub name: String,
    pub metadata: Metadata,
    pub help: HelpText,
    /// Wall-clock time spent on the check, in milliseconds.
    pub elapsed_ms: u64,
    /// Present only for entries in `errors`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }
}

/// Aggregated outcome of a policy run.
///
/// `passed_overall` is never derived from the lists automatically; callers set it
/// explicitly once a run is complete (see [`Results::all_passed`]).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Results {
    pub tested_image: String,
    pub passed_overall: bool,
    #[serde(default)]
    pub passed: Vec<CheckResult>,
    #[serde(default)]
    pub failed: Vec<CheckResult>,
    #[serde(default)]
    pub errors: Vec<CheckResult>,
}

impl Results {
    pub fn new(tested_image: impl Into<String>) -> Self {
        Self {
            tested_image: tested_image.into(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, outcome: Outcome, result: CheckResult) {
        match outcome {
            Outcome::Passed => self.passed.push(result),
            Outcome::Failed => self.failed.push(result),
            Outcome::Errored => self.errors.push(result),
        }
    }

    /// Total number of recorded checks across all buckets.
    pub fn len(&self) -> usize {
        self.passed.len() + self.failed.len() + self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every recorded entry with its bucket, in bucket order (passed, failed, errors).
    pub fn entries(&self) -> impl Iterator<Item = (Outcome, &CheckResult)> {
        self.passed
            .iter()
            .map(|r| (Outcome::Passed, r))
            .chain(self.failed.iter().map(|r| (Outcome::Failed, r)))
            .chain(self.errors.iter().map(|r| (Outcome::Errored, r)))
    }

    /// Find all entries recorded for `name`.
    pub fn find(&self, name: &str) -> Vec<(Outcome, &CheckResult)> {
        self.entries().filter(|(_, r)| r.name == name).collect()
    }

    /// True when at least one check passed and nothing failed or errored.
    pub fn all_passed(&self) -> bool {
        !self.passed.is_empty() && self.failed.is_empty() && self.errors.is_empty()
    }
}
