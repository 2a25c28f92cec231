use crate::defaults;
use crate::model::ImagecertConfigV1;
use anyhow::Context;
use camino::Utf8PathBuf;
use std::collections::BTreeSet;

/// Values given on the command line. Each one wins over the config file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub container_engine: Option<String>,
    pub namespace_helper: Option<Vec<String>>,
    pub log_level: Option<String>,
    pub artifacts_dir: Option<Utf8PathBuf>,
    pub sandbox_all_checks: Option<bool>,
    /// Checks to leave out in addition to those disabled in config.
    pub skip_checks: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub container_engine: String,
    pub namespace_helper: Vec<String>,
    pub log_level: String,
    pub artifacts_dir: Utf8PathBuf,
    /// Full path of the sandbox log.
    pub sandbox_log: Utf8PathBuf,
    pub sandbox_all_checks: bool,
    pub disabled_checks: BTreeSet<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        let artifacts_dir = Utf8PathBuf::from(defaults::ARTIFACTS_DIR);
        Self {
            container_engine: defaults::CONTAINER_ENGINE.to_string(),
            namespace_helper: defaults::NAMESPACE_HELPER
                .iter()
                .map(|s| s.to_string())
                .collect(),
            log_level: defaults::LOG_LEVEL.to_string(),
            sandbox_log: artifacts_dir.join(defaults::SANDBOX_LOG),
            artifacts_dir,
            sandbox_all_checks: false,
            disabled_checks: BTreeSet::new(),
        }
    }
}

impl ResolvedConfig {
    pub fn is_enabled(&self, check: &str) -> bool {
        !self.disabled_checks.contains(check)
    }
}

pub fn resolve_config(
    cfg: ImagecertConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    if let Some(schema) = cfg.schema.as_deref()
        && schema != defaults::SCHEMA_CONFIG_V1
    {
        anyhow::bail!(
            "unsupported config schema: {schema} (expected {})",
            defaults::SCHEMA_CONFIG_V1
        );
    }

    let container_engine = overrides
        .container_engine
        .or(cfg.container_engine)
        .unwrap_or_else(|| defaults::CONTAINER_ENGINE.to_string());
    if container_engine.trim().is_empty() {
        anyhow::bail!("container_engine must not be empty");
    }

    let namespace_helper = overrides
        .namespace_helper
        .or(cfg.namespace_helper)
        .unwrap_or_else(|| {
            defaults::NAMESPACE_HELPER
                .iter()
                .map(|s| s.to_string())
                .collect()
        });
    validate_helper(&namespace_helper)?;

    let log_level = overrides
        .log_level
        .or(cfg.log_level)
        .unwrap_or_else(|| defaults::LOG_LEVEL.to_string());
    let log_level = parse_log_level(&log_level).context("invalid log_level")?;

    let artifacts_dir = overrides
        .artifacts_dir
        .or(cfg.artifacts_dir.map(Utf8PathBuf::from))
        .unwrap_or_else(|| Utf8PathBuf::from(defaults::ARTIFACTS_DIR));

    let sandbox_log = Utf8PathBuf::from(
        cfg.sandbox_log
            .unwrap_or_else(|| defaults::SANDBOX_LOG.to_string()),
    );
    if sandbox_log.as_str().trim().is_empty() {
        anyhow::bail!("sandbox_log must not be empty");
    }
    let sandbox_log = if sandbox_log.is_absolute() {
        sandbox_log
    } else {
        artifacts_dir.join(sandbox_log)
    };

    let sandbox_all_checks = overrides
        .sandbox_all_checks
        .or(cfg.sandbox_all_checks)
        .unwrap_or(false);

    let mut disabled_checks: BTreeSet<String> = cfg
        .checks
        .iter()
        .filter(|(_, cc)| cc.enabled == Some(false))
        .map(|(name, _)| name.clone())
        .collect();
    disabled_checks.extend(overrides.skip_checks);

    Ok(ResolvedConfig {
        container_engine,
        namespace_helper,
        log_level,
        artifacts_dir,
        sandbox_log,
        sandbox_all_checks,
        disabled_checks,
    })
}

fn validate_helper(helper: &[String]) -> anyhow::Result<()> {
    match helper.first() {
        None => anyhow::bail!("namespace_helper must name at least one program"),
        Some(program) if program.trim().is_empty() => {
            anyhow::bail!("namespace_helper program must not be empty")
        }
        Some(_) => Ok(()),
    }
}

/// Normalize a log level name (case-insensitive; `warning` is accepted for `warn`).
pub fn parse_log_level(v: &str) -> anyhow::Result<String> {
    let lower = v.trim().to_ascii_lowercase();
    let lower = if lower == "warning" {
        "warn".to_string()
    } else {
        lower
    };
    if defaults::LOG_LEVELS.contains(&lower.as_str()) {
        Ok(lower)
    } else {
        anyhow::bail!(
            "unknown log level: {v} (expected {})",
            defaults::LOG_LEVELS.join("|")
        )
    }
}
