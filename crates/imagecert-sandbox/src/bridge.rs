use crate::envelope::SandboxEnvelope;
use crate::error::SandboxError;
use camino::Utf8PathBuf;
use imagecert_types::{Results, ids};
use std::path::PathBuf;
use std::process::{Command, Output};

/// One check to run in the sandbox.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SandboxRequest {
    pub check_name: String,
    pub image: String,
    /// `image` is already a local path.
    pub mounted: bool,
}

/// Runs a single check in isolation and returns the worker's report.
///
/// The engine only talks to this trait, so tests can substitute an in-process fake.
pub trait SandboxRunner {
    fn run_check(&self, request: &SandboxRequest) -> Result<Results, SandboxError>;
}

/// What the parent learned from its own environment before spawning.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParentEnv {
    pub path: Option<String>,
    /// The sandbox marker is already set for this process.
    pub in_sandbox: bool,
}

impl ParentEnv {
    pub fn capture() -> Self {
        Self {
            path: std::env::var(ids::ENV_PATH).ok(),
            in_sandbox: std::env::var_os(ids::ENV_IN_SANDBOX).is_some(),
        }
    }
}

/// How a finished worker is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChildOutcome {
    /// Exit status zero.
    Succeeded,
    /// Non-zero exit with a fatal marker on stderr: the tool itself broke.
    FailedFatal,
    /// Non-zero exit without a fatal marker: the check ran and did not pass.
    FailedNonFatal,
}

/// Classify a worker exit.
///
/// Only a non-zero exit whose non-empty stderr contains the fatal marker (any case) is
/// treated as an infrastructure failure. This is substring matching over log text and
/// therefore brittle; see DESIGN.md before changing the worker's stderr format.
pub fn classify(success: bool, stderr: &str) -> ChildOutcome {
    if success {
        return ChildOutcome::Succeeded;
    }
    if !stderr.trim().is_empty()
        && stderr
            .to_ascii_lowercase()
            .contains(&ids::FATAL_MARKER.to_ascii_lowercase())
    {
        ChildOutcome::FailedFatal
    } else {
        ChildOutcome::FailedNonFatal
    }
}

/// Parent side of the re-exec protocol: `<helper...> <self-exe> check run`.
#[derive(Clone, Debug)]
pub struct SandboxBridge {
    helper: Vec<String>,
    self_exe: PathBuf,
    log_file: Utf8PathBuf,
    log_level: String,
    parent: ParentEnv,
    extra_env: Vec<(String, String)>,
}

impl SandboxBridge {
    /// `helper` is the namespace-enter command, e.g. `["podman", "unshare"]`.
    pub fn new(
        helper: Vec<String>,
        self_exe: impl Into<PathBuf>,
        log_file: impl Into<Utf8PathBuf>,
        log_level: impl Into<String>,
    ) -> Result<Self, SandboxError> {
        if helper.first().is_none_or(|program| program.is_empty()) {
            return Err(SandboxError::EmptyHelper);
        }
        Ok(Self {
            helper,
            self_exe: self_exe.into(),
            log_file: log_file.into(),
            log_level: log_level.into(),
            parent: ParentEnv::capture(),
            extra_env: Vec::new(),
        })
    }

    /// Replace the captured parent environment.
    pub fn with_parent_env(mut self, parent: ParentEnv) -> Self {
        self.parent = parent;
        self
    }

    /// Extra variables passed to every worker.
    pub fn with_extra_env(mut self, extra: Vec<(String, String)>) -> Self {
        self.extra_env = extra;
        self
    }

    fn envelope(&self, request: &SandboxRequest) -> SandboxEnvelope {
        SandboxEnvelope {
            check_name: request.check_name.clone(),
            image: request.image.clone(),
            mounted: request.mounted,
            path: self.parent.path.clone(),
            log_file: self.log_file.clone(),
            log_level: self.log_level.clone(),
            extra: self.extra_env.clone(),
        }
    }

    fn command(&self, request: &SandboxRequest) -> Result<(Command, String), SandboxError> {
        let Some((program, helper_args)) = self.helper.split_first() else {
            return Err(SandboxError::EmptyHelper);
        };

        let mut cmd = Command::new(program);
        cmd.args(helper_args)
            .arg(&self.self_exe)
            .args(ids::WORKER_ARGS)
            .env_clear()
            .envs(self.envelope(request).to_env());

        let rendered = format!(
            "{} {} {}",
            self.helper.join(" "),
            self.self_exe.display(),
            ids::WORKER_ARGS.join(" ")
        );
        Ok((cmd, rendered))
    }

    fn interpret(&self, request: &SandboxRequest, output: Output) -> Result<Results, SandboxError> {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let status = match output.status.code() {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        };

        match classify(output.status.success(), &stderr) {
            ChildOutcome::FailedFatal => {
                tracing::error!(check = %request.check_name, %status, stderr = %stderr.trim(), "sandboxed check failed fatally");
                return Err(SandboxError::ChildFatal {
                    check: request.check_name.clone(),
                    status,
                    stderr: stderr.trim().to_string(),
                });
            }
            ChildOutcome::FailedNonFatal => {
                tracing::debug!(check = %request.check_name, %status, "sandboxed check exited non-zero; reading verdict");
            }
            ChildOutcome::Succeeded => {}
        }

        serde_json::from_slice(&output.stdout).map_err(|source| SandboxError::MalformedPayload {
            check: request.check_name.clone(),
            source,
        })
    }
}

impl SandboxRunner for SandboxBridge {
    fn run_check(&self, request: &SandboxRequest) -> Result<Results, SandboxError> {
        if self.parent.in_sandbox {
            return Err(SandboxError::Recursion {
                marker: ids::ENV_IN_SANDBOX,
            });
        }

        let (mut cmd, rendered) = self.command(request)?;
        tracing::debug!(command = %rendered, check = %request.check_name, image = %request.image, "entering sandbox");

        // Blocks until the worker exits; both streams are fully buffered before parsing.
        let output = cmd.output().map_err(|source| SandboxError::Spawn {
            command: rendered,
            source,
        })?;

        self.interpret(request, output)
    }
}
