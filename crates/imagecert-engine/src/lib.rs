//! Check registry and execution engine.
//!
//! Input: a registry of checks, the names of one policy's members, and a target.
//! Output: a `Results` snapshot partitioning every member into passed, failed, or errors.
//!
//! Image resources and the sandbox are reached through `imagecert-image` and the
//! `SandboxRunner` seam; this crate decides which one each check needs.

#![forbid(unsafe_code)]

pub mod check;
pub mod checks;
pub mod registry;
pub mod target;

mod engine;

#[cfg(test)]
mod proptest;
#[cfg(test)]
mod test_support;

pub use check::{Check, CheckError, Requirement};
pub use engine::{CheckEngine, EngineError, EngineOptions, Mode, Services};
pub use registry::{CheckRegistry, CheckRegistryBuilder, RegistryError, builtin_registry};
pub use target::Target;
