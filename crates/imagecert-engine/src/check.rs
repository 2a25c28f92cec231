use crate::target::Target;
use imagecert_types::{HelpText, Metadata};
use thiserror::Error;

/// What a check needs from its target before it can run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Requirement {
    /// Only the reference string.
    Reference,
    /// An extracted root filesystem.
    Filesystem,
    /// A mounted image; for remote images this needs the sandbox.
    Mount,
}

/// A single named certification check.
///
/// Checks hold no per-run state and may be shared across engines and threads.
pub trait Check: Send + Sync {
    fn name(&self) -> &'static str;

    fn requirement(&self) -> Requirement;

    /// `Ok(true)` passes, `Ok(false)` fails, `Err` means the check could not decide.
    ///
    /// For `Filesystem` and `Mount` checks the engine resolves the target to a
    /// [`Target::Local`] root before calling this.
    fn validate(&self, target: &Target) -> Result<bool, CheckError>;

    fn metadata(&self) -> Metadata;

    fn help(&self) -> HelpText;
}

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("{check} needs a local filesystem, got image reference {reference}")]
    NeedsFilesystem {
        check: &'static str,
        reference: String,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Invalid(String),
}

impl CheckError {
    pub fn io(path: impl std::fmt::Display, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }
}
