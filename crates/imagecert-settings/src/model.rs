use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `imagecert.toml` schema v1.
///
/// Every field is optional; anything left out falls back to the built-in defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImagecertConfigV1 {
    /// Optional schema string for tooling (`imagecert.config.v1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Container-engine binary (`podman` by default).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_engine: Option<String>,

    /// Command that enters the unprivileged namespace, e.g. `["podman", "unshare"]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_helper: Option<Vec<String>>,

    /// `trace`, `debug`, `info`, `warn`, or `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Directory for results and the sandbox log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts_dir: Option<String>,

    /// Sandbox log file name, relative to `artifacts_dir` unless absolute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox_log: Option<String>,

    /// Run every check in the sandbox, not only the ones that need a mount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox_all_checks: Option<bool>,

    /// Map of check name -> config.
    #[serde(default)]
    pub checks: BTreeMap<String, CheckConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CheckConfig {
    /// Set to `false` to leave the check out of every policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}
