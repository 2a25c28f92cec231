use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    /// The current process already runs inside the sandbox; spawning again would recurse.
    #[error("already running inside the sandbox ({marker} is set); refusing to re-enter")]
    Recursion { marker: &'static str },

    /// The worker entrypoint was invoked without the sandbox marker.
    #[error("worker mode requires {marker} to be set by the parent process")]
    NotInSandbox { marker: &'static str },

    #[error("required environment variable {0} is not set")]
    MissingVariable(&'static str),

    #[error("namespace helper command is empty")]
    EmptyHelper,

    #[error("failed to spawn `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The worker exited non-zero and reported a fatal error on stderr.
    #[error("sandboxed check {check} failed ({status}): {stderr}")]
    ChildFatal {
        check: String,
        status: String,
        stderr: String,
    },

    #[error("sandboxed check {check} wrote a malformed results payload")]
    MalformedPayload {
        check: String,
        #[source]
        source: serde_json::Error,
    },
}
