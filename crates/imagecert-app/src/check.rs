//! The `check` use case: run one policy against one image and produce results.

use anyhow::Context;
use camino::Utf8Path;
use imagecert_engine::{
    CheckEngine, CheckRegistry, EngineOptions, Mode, Services, Target, builtin_registry,
};
use imagecert_image::ContainerEngine;
use imagecert_sandbox::SandboxBridge;
use imagecert_settings::{ImagecertConfigV1, Overrides, ResolvedConfig};
use imagecert_types::{Results, ids};
use std::path::PathBuf;

/// Variables passed through to the sandbox worker so the engine inside the
/// namespace finds the same storage and credentials as the parent.
pub const PASSTHROUGH_ENV: [&str; 6] = [
    "HOME",
    "USER",
    "XDG_RUNTIME_DIR",
    "CONTAINERS_CONF",
    "CONTAINERS_STORAGE_CONF",
    "REGISTRY_AUTH_FILE",
];

/// Input for the check use case.
#[derive(Clone, Debug)]
pub struct CheckInput<'a> {
    /// Policy name (`container` or `operator`).
    pub policy: &'a str,
    /// Image reference, or a root filesystem path when `mounted`.
    pub image: &'a str,
    pub mounted: bool,
    /// Config file contents (empty string if not found).
    pub config_text: &'a str,
    /// CLI overrides.
    pub overrides: Overrides,
    /// Executable the sandbox re-enters as `<self> check run`.
    pub self_exe: PathBuf,
}

/// Output from the check use case.
#[derive(Clone, Debug)]
pub struct CheckOutput {
    pub results: Results,
    /// The resolved configuration used.
    pub resolved_config: ResolvedConfig,
}

/// Parse config text, allowing an empty file.
pub fn load_config(config_text: &str, overrides: Overrides) -> anyhow::Result<ResolvedConfig> {
    let cfg = if config_text.trim().is_empty() {
        ImagecertConfigV1::default()
    } else {
        imagecert_settings::parse_config_toml(config_text).context("parse config")?
    };
    imagecert_settings::resolve_config(cfg, overrides).context("resolve config")
}

/// Check names `policy` runs under `resolved`, in policy order.
pub fn policy_checks(
    registry: &CheckRegistry,
    policy: &str,
    resolved: &ResolvedConfig,
) -> anyhow::Result<Vec<String>> {
    if !registry.policies().contains(policy) {
        let known: Vec<&str> = registry.policies().into_iter().collect();
        anyhow::bail!("unknown policy: {policy} (expected {})", known.join("|"));
    }
    for name in &resolved.disabled_checks {
        if registry.lookup(name).is_none() {
            anyhow::bail!("cannot disable unknown check: {name}");
        }
    }

    Ok(registry
        .policy_names(policy)
        .into_iter()
        .filter(|name| resolved.is_enabled(name))
        .collect())
}

/// Run the check use case: resolve config, build the engine, execute, and decide
/// the overall verdict.
pub fn run_check(input: CheckInput<'_>) -> anyhow::Result<CheckOutput> {
    let resolved = load_config(input.config_text, input.overrides.clone())?;
    let registry = builtin_registry().context("build check registry")?;
    let names = policy_checks(&registry, input.policy, &resolved)?;

    let target = if input.mounted {
        Target::Local(Utf8Path::new(input.image).to_owned())
    } else {
        Target::Image(input.image.to_string())
    };
    let options = EngineOptions {
        mode: Mode::Driver,
        sandbox_all_checks: resolved.sandbox_all_checks,
    };
    let mut engine = CheckEngine::for_policy(&registry, &names, target, options)
        .with_context(|| format!("prepare {} policy", input.policy))?;

    if let Some(parent) = resolved.sandbox_log.parent()
        && !parent.as_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create sandbox log directory {parent}"))?;
    }

    let containers = ContainerEngine::new(resolved.container_engine.clone());
    let bridge = SandboxBridge::new(
        resolved.namespace_helper.clone(),
        input.self_exe.clone(),
        resolved.sandbox_log.clone(),
        resolved.log_level.clone(),
    )
    .context("configure sandbox")?
    .with_extra_env(worker_env(&resolved));

    engine
        .execute_checks(Services {
            containers: Some(&containers),
            sandbox: Some(&bridge),
        })
        .context("execute checks")?;

    let mut results = engine.results();
    results.passed_overall = results.all_passed();
    tracing::info!(
        policy = input.policy,
        image = input.image,
        passed = results.passed.len(),
        failed = results.failed.len(),
        errors = results.errors.len(),
        passed_overall = results.passed_overall,
        "policy run complete"
    );

    Ok(CheckOutput {
        results,
        resolved_config: resolved,
    })
}

fn worker_env(resolved: &ResolvedConfig) -> Vec<(String, String)> {
    let mut env: Vec<(String, String)> = PASSTHROUGH_ENV
        .iter()
        .filter_map(|key| std::env::var(key).ok().map(|v| (key.to_string(), v)))
        .collect();
    env.push((
        ids::ENV_CONTAINER_ENGINE.to_string(),
        resolved.container_engine.clone(),
    ));
    env
}

/// Map results to exit code: 0 = passed overall, 2 = not passed.
pub fn results_exit_code(results: &Results) -> i32 {
    if results.passed_overall { 0 } else { 2 }
}
