//! Privilege separation by self re-execution.
//!
//! The parent ([`SandboxBridge`]) runs `<namespace-helper> <self> check run` with a
//! purpose-built environment and reads one JSON `Results` document from the child's
//! stdout. The child side decodes its instructions with [`WorkerRequest`].
//!
//! Flow: idle -> child launched -> (succeeded | failed non-fatal) -> report parsed,
//! or -> failed fatal -> error. There are no retries at this level.

#![forbid(unsafe_code)]

mod bridge;
mod envelope;
mod error;

pub use bridge::{ChildOutcome, ParentEnv, SandboxBridge, SandboxRequest, SandboxRunner, classify};
pub use envelope::{SandboxEnvelope, WorkerRequest};
pub use error::SandboxError;
