use camino::Utf8PathBuf;
use thiserror::Error;

/// Failure of a single container-engine invocation.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Non-zero exit. `output` is stdout followed by stderr.
    #[error("`{command}` exited with {status}: {output}")]
    Status {
        command: String,
        status: String,
        output: String,
    },
}

/// Why a tarball could not be extracted.
#[derive(Debug, Error)]
pub enum TarballError {
    #[error("file name must contain `.tar` exactly once, found {0} occurrences")]
    Name(usize),

    #[error("path has no UTF-8 file name")]
    MissingName,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid archive manifest: {0}")]
    Manifest(String),
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to pull image {reference}")]
    PullFailed {
        reference: String,
        #[source]
        source: CommandError,
    },

    #[error("failed to save image {reference} to {dest}")]
    SaveFailed {
        reference: String,
        dest: Utf8PathBuf,
        #[source]
        source: CommandError,
    },

    #[error("error extracting tarball {path}")]
    ExtractingTarball {
        path: Utf8PathBuf,
        #[source]
        source: TarballError,
    },

    #[error("failed to create container from {reference}")]
    CreateFailed {
        reference: String,
        #[source]
        source: CommandError,
    },

    #[error("failed to copy {src} out of container {container}")]
    CopyFailed {
        container: String,
        src: String,
        #[source]
        source: CommandError,
    },

    #[error("failed to remove container {container}")]
    RemoveFailed {
        container: String,
        #[source]
        source: CommandError,
    },

    #[error("failed to mount {target}")]
    MountFailed {
        target: String,
        #[source]
        source: CommandError,
    },

    #[error("failed to unmount {target}")]
    UnmountFailed {
        target: String,
        #[source]
        source: CommandError,
    },

    #[error("`{command}` produced unusable output: {reason}")]
    UnexpectedOutput { command: String, reason: String },

    #[error("failed to prepare work directory")]
    WorkDir(#[source] std::io::Error),
}
