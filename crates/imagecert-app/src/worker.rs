//! The sandbox worker use case: run the single check named in the environment.

use crate::check::load_config;
use anyhow::Context;
use camino::Utf8Path;
use imagecert_engine::{CheckEngine, EngineOptions, Mode, Services, Target, builtin_registry};
use imagecert_image::ContainerEngine;
use imagecert_sandbox::WorkerRequest;
use imagecert_settings::Overrides;
use imagecert_types::Results;

#[derive(Clone, Debug)]
pub struct WorkerInput<'a> {
    pub request: WorkerRequest,
    pub config_text: &'a str,
    pub overrides: Overrides,
}

/// Run one check inside the namespace. Mount checks on images mount directly here.
///
/// The returned results go to stdout for the parent; any `Err` is a hard failure the
/// caller reports with the fatal marker.
pub fn run_worker(input: WorkerInput<'_>) -> anyhow::Result<Results> {
    let resolved = load_config(input.config_text, input.overrides)?;
    let registry = builtin_registry().context("build check registry")?;
    let request = input.request;

    let target = if request.mounted {
        Target::Local(Utf8Path::new(&request.image).to_owned())
    } else {
        Target::Image(request.image.clone())
    };
    let options = EngineOptions {
        mode: Mode::Worker,
        sandbox_all_checks: false,
    };
    let mut engine = CheckEngine::for_policy(&registry, &[&request.check_name], target, options)
        .context("prepare sandboxed check")?;

    tracing::debug!(check = %request.check_name, image = %request.image, mounted = request.mounted, "worker started");

    let containers = ContainerEngine::new(resolved.container_engine);
    engine
        .execute_checks(Services {
            containers: Some(&containers),
            sandbox: None,
        })
        .context("execute sandboxed check")?;

    let mut results = engine.results();
    results.passed_overall = results.all_passed();
    Ok(results)
}
