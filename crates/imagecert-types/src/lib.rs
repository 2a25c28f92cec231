//! Stable DTOs and IDs used across the imagecert workspace.
//!
//! This crate is intentionally boring:
//! - the `Results` snapshot produced by a policy run (and exchanged with the sandbox worker)
//! - per-check metadata and help text
//! - stable string IDs for checks, policies, and protocol environment variables

#![forbid(unsafe_code)]

pub mod ids;
pub mod meta;
pub mod results;

pub use meta::{HelpText, Level, Metadata};
pub use results::{CheckResult, Outcome, Results, SCHEMA_RESULTS_V1};
