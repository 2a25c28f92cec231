pub const CONTAINER_ENGINE: &str = "podman";
pub const NAMESPACE_HELPER: [&str; 2] = ["podman", "unshare"];
pub const LOG_LEVEL: &str = "info";
pub const ARTIFACTS_DIR: &str = "artifacts";
pub const SANDBOX_LOG: &str = "imagecert-sandbox.log";
pub const CONFIG_FILE: &str = "imagecert.toml";
pub const SCHEMA_CONFIG_V1: &str = "imagecert.config.v1";

pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
