//! Use case orchestration for imagecert.
//!
//! This crate provides the application layer: use cases that coordinate settings, the
//! check engine, the container-engine adapter, and the sandbox bridge.
//!
//! The CLI crate depends on this; it only handles argument parsing, logging, and I/O.

#![forbid(unsafe_code)]

mod check;
mod explain;
mod results;
mod worker;

pub use check::{
    CheckInput, CheckOutput, PASSTHROUGH_ENV, load_config, policy_checks, results_exit_code,
    run_check,
};
pub use explain::{
    CheckDescription, ExplainOutput, format_explanation, format_list, format_not_found,
    run_explain, run_list,
};
pub use results::{format_summary, parse_results_json, serialize_results, write_results};
pub use worker::{WorkerInput, run_worker};
