//! The environment-variable envelope exchanged between parent and worker.

use crate::error::SandboxError;
use camino::Utf8PathBuf;
use imagecert_types::ids;

/// Everything the parent hands to one sandboxed worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SandboxEnvelope {
    pub check_name: String,
    pub image: String,
    /// `image` is already a resolved local path.
    pub mounted: bool,
    /// Inherited `PATH`, propagated verbatim when present.
    pub path: Option<String>,
    pub log_file: Utf8PathBuf,
    pub log_level: String,
    /// Caller-supplied extras, applied after the protocol variables.
    pub extra: Vec<(String, String)>,
}

impl SandboxEnvelope {
    /// Environment for the worker process, in a stable order.
    ///
    /// The mounted flag is only present when true.
    pub fn to_env(&self) -> Vec<(String, String)> {
        let mut env = Vec::with_capacity(7 + self.extra.len());
        if let Some(path) = &self.path {
            env.push((ids::ENV_PATH.to_string(), path.clone()));
        }
        env.push((
            ids::ENV_IN_SANDBOX.to_string(),
            ids::IN_SANDBOX_SENTINEL.to_string(),
        ));
        env.push((ids::ENV_CHECK_NAME.to_string(), self.check_name.clone()));
        env.push((ids::ENV_IMAGE.to_string(), self.image.clone()));
        if self.mounted {
            env.push((ids::ENV_MOUNTED.to_string(), ids::MOUNTED_TRUE.to_string()));
        }
        env.extend(self.extra.iter().cloned());
        env.push((ids::ENV_LOG_FILE.to_string(), self.log_file.to_string()));
        env.push((ids::ENV_LOG_LEVEL.to_string(), self.log_level.clone()));
        env
    }
}

/// What a worker needs to run its single check, decoded from its environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerRequest {
    pub check_name: String,
    pub image: String,
    pub mounted: bool,
}

impl WorkerRequest {
    /// Decode from the process environment.
    pub fn from_env() -> Result<Self, SandboxError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Decode using `lookup` for variable access.
    ///
    /// The sandbox marker must be present; check name and image are required and must be
    /// non-empty. The mounted flag is true only for the exact value `"true"`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SandboxError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup(ids::ENV_IN_SANDBOX).is_none() {
            return Err(SandboxError::NotInSandbox {
                marker: ids::ENV_IN_SANDBOX,
            });
        }
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or(SandboxError::MissingVariable(key))
        };

        Ok(Self {
            check_name: required(ids::ENV_CHECK_NAME)?,
            image: required(ids::ENV_IMAGE)?,
            mounted: lookup(ids::ENV_MOUNTED).as_deref() == Some(ids::MOUNTED_TRUE),
        })
    }
}
