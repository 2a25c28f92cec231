use crate::check::{Check, Requirement};
use crate::registry::CheckRegistry;
use crate::target::Target;
use imagecert_image::{AcquiredFilesystem, ContainerEngine};
use imagecert_sandbox::{SandboxRequest, SandboxRunner};
use imagecert_types::{CheckResult, Outcome, Results};
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("no checks enabled")]
    NoChecksEnabled,

    #[error("check not found: {name}")]
    CheckNotFound { name: String },

    #[error("checks have already been executed for this engine")]
    AlreadyExecuted,

    #[error("target directory does not exist: {path}")]
    TargetMissing { path: String },
}

/// Which side of the sandbox protocol this engine runs on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// The outer process: may delegate checks to the sandbox.
    #[default]
    Driver,
    /// Inside the namespace: mounts directly and never re-enters the sandbox.
    Worker,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub mode: Mode,
    /// In driver mode, run every check through the sandbox.
    pub sandbox_all_checks: bool,
}

/// External collaborators a run may need. Missing services turn dependent checks
/// into errors rather than failing the run.
#[derive(Clone, Copy, Default)]
pub struct Services<'a> {
    pub containers: Option<&'a ContainerEngine>,
    pub sandbox: Option<&'a dyn SandboxRunner>,
}

/// How a single check reaches its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Route {
    Direct,
    Acquire,
    MountScoped,
    Sandbox,
}

enum Verdict {
    Pass,
    Fail,
    Error(String),
}

enum FsLease {
    Pending,
    Ready(AcquiredFilesystem),
    Failed(String),
}

/// Runs one policy's checks against one target, exactly once.
pub struct CheckEngine<'r> {
    checks: Vec<&'r dyn Check>,
    target: Target,
    options: EngineOptions,
    results: Results,
    executed: bool,
}

impl<'r> CheckEngine<'r> {
    /// Resolve `names` against `registry`. Either every name resolves or nothing is built.
    ///
    /// Repeated names run once, at their first position.
    pub fn for_policy<S: AsRef<str>>(
        registry: &'r CheckRegistry,
        names: &[S],
        target: Target,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        if names.is_empty() {
            return Err(EngineError::NoChecksEnabled);
        }

        let mut checks: Vec<&'r dyn Check> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let check = registry
                .lookup(name)
                .ok_or_else(|| EngineError::CheckNotFound {
                    name: name.to_string(),
                })?;
            if checks.iter().all(|c| c.name() != check.name()) {
                checks.push(check);
            }
        }

        let results = Results::new(target.display_name());
        Ok(Self {
            checks,
            target,
            options,
            results,
            executed: false,
        })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Snapshot of the results so far.
    pub fn results(&self) -> Results {
        self.results.clone()
    }

    /// Run every check in order and record each outcome.
    ///
    /// Only pre-validation fails the call; per-check problems land in `errors`.
    pub fn execute_checks(&mut self, services: Services<'_>) -> Result<(), EngineError> {
        if self.executed {
            return Err(EngineError::AlreadyExecuted);
        }
        if let Target::Local(path) = &self.target
            && !path.is_dir()
        {
            return Err(EngineError::TargetMissing {
                path: path.to_string(),
            });
        }
        self.executed = true;

        tracing::info!(subject = %self.target, checks = self.checks.len(), mode = ?self.options.mode, "running checks");

        let mut lease = FsLease::Pending;
        for check in self.checks.clone() {
            let route = self.route(check);
            let started = Instant::now();
            let verdict = self.dispatch(check, route, services, &mut lease);
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            let (outcome, error) = match verdict {
                Verdict::Pass => (Outcome::Passed, None),
                Verdict::Fail => (Outcome::Failed, None),
                Verdict::Error(message) => (Outcome::Errored, Some(message)),
            };
            match &error {
                Some(message) => {
                    tracing::warn!(check = check.name(), ?route, elapsed_ms, error = %message, "check errored")
                }
                None => tracing::info!(check = check.name(), ?route, elapsed_ms, ?outcome, "check finished"),
            }

            self.results.push(
                outcome,
                CheckResult {
                    name: check.name().to_string(),
                    metadata: check.metadata(),
                    help: check.help(),
                    elapsed_ms,
                    error,
                },
            );
        }

        if let FsLease::Ready(fs) = lease {
            fs.release();
        }
        Ok(())
    }

    fn route(&self, check: &dyn Check) -> Route {
        let sandboxed = self.options.mode == Mode::Driver;
        if sandboxed && self.options.sandbox_all_checks {
            return Route::Sandbox;
        }
        match (check.requirement(), &self.target) {
            (Requirement::Reference, _) | (_, Target::Local(_)) => Route::Direct,
            (Requirement::Filesystem, Target::Image(_)) => Route::Acquire,
            (Requirement::Mount, Target::Image(_)) if sandboxed => Route::Sandbox,
            (Requirement::Mount, Target::Image(_)) => Route::MountScoped,
        }
    }

    fn dispatch(
        &self,
        check: &dyn Check,
        route: Route,
        services: Services<'_>,
        lease: &mut FsLease,
    ) -> Verdict {
        match route {
            Route::Direct => validate(check, &self.target),
            Route::Acquire => self.validate_acquired(check, services, lease),
            Route::MountScoped => self.validate_mounted(check, services),
            Route::Sandbox => self.validate_sandboxed(check, services),
        }
    }

    fn validate_acquired(
        &self,
        check: &dyn Check,
        services: Services<'_>,
        lease: &mut FsLease,
    ) -> Verdict {
        if let FsLease::Pending = lease {
            *lease = match (services.containers, &self.target) {
                (Some(containers), Target::Image(reference)) => {
                    match containers.acquire_filesystem(reference) {
                        Ok(fs) => FsLease::Ready(fs),
                        Err(err) => {
                            let message = error_chain(&err);
                            tracing::error!(image = %reference, error = %message, "image filesystem acquisition failed");
                            FsLease::Failed(format!("acquiring image filesystem: {message}"))
                        }
                    }
                }
                (None, _) => FsLease::Failed("no container engine configured".to_string()),
                (_, Target::Local(_)) => FsLease::Failed("target is already local".to_string()),
            };
        }

        match lease {
            FsLease::Ready(fs) => validate(check, &Target::Local(fs.root().to_owned())),
            FsLease::Failed(message) => Verdict::Error(message.clone()),
            FsLease::Pending => Verdict::Error("image filesystem unavailable".to_string()),
        }
    }

    fn validate_mounted(&self, check: &dyn Check, services: Services<'_>) -> Verdict {
        let Some(containers) = services.containers else {
            return Verdict::Error("no container engine configured".to_string());
        };
        let Target::Image(reference) = &self.target else {
            return validate(check, &self.target);
        };

        let mount = match containers.mount_image_scoped(reference) {
            Ok(mount) => mount,
            Err(err) => return Verdict::Error(format!("mounting image: {}", error_chain(&err))),
        };
        let verdict = validate(check, &Target::Local(mount.path().to_owned()));
        mount.release();
        verdict
    }

    fn validate_sandboxed(&self, check: &dyn Check, services: Services<'_>) -> Verdict {
        let Some(sandbox) = services.sandbox else {
            return Verdict::Error("no sandbox runner configured".to_string());
        };
        let request = SandboxRequest {
            check_name: check.name().to_string(),
            image: self.target.display_name(),
            mounted: self.target.is_local(),
        };

        let report = match sandbox.run_check(&request) {
            Ok(report) => report,
            Err(err) => return Verdict::Error(error_chain(&err)),
        };

        let found = report.find(check.name());
        match found.as_slice() {
            [(Outcome::Passed, _)] => Verdict::Pass,
            [(Outcome::Failed, _)] => Verdict::Fail,
            [(Outcome::Errored, entry)] => Verdict::Error(
                entry
                    .error
                    .clone()
                    .unwrap_or_else(|| "check errored inside the sandbox".to_string()),
            ),
            [] => Verdict::Error(format!(
                "sandbox report does not contain {}",
                check.name()
            )),
            many => Verdict::Error(format!(
                "sandbox report lists {} {} times",
                check.name(),
                many.len()
            )),
        }
    }
}

fn validate(check: &dyn Check, target: &Target) -> Verdict {
    match check.validate(target) {
        Ok(true) => Verdict::Pass,
        Ok(false) => Verdict::Fail,
        Err(err) => Verdict::Error(err.to_string()),
    }
}

/// `err` and each of its sources, joined with `": "`, so captured engine output reaches
/// the results.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
