//! Config parsing and resolution.
//!
//! This crate is intentionally IO-free: it parses and resolves configuration provided as strings.

#![forbid(unsafe_code)]

pub mod defaults;
mod model;
mod resolve;

pub use model::{CheckConfig, ImagecertConfigV1};
pub use resolve::{Overrides, ResolvedConfig, parse_log_level};

/// Parse `imagecert.toml` (or equivalent) into a typed model.
pub fn parse_config_toml(input: &str) -> anyhow::Result<ImagecertConfigV1> {
    let cfg: ImagecertConfigV1 = toml::from_str(input)?;
    Ok(cfg)
}

/// Resolve the effective config: built-in defaults, then the file, then overrides.
pub fn resolve_config(
    cfg: ImagecertConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    resolve::resolve_config(cfg, overrides)
}
