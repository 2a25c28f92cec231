//! Tracing setup.
//!
//! The driver logs to stderr. The sandbox worker appends to the shared sandbox log
//! instead: its stdout carries the results payload and its stderr is scanned for the
//! fatal marker, so neither may receive log lines.

use camino::Utf8Path;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn env_filter(level: Option<&str>) -> EnvFilter {
    let default = imagecert_settings::defaults::LOG_LEVEL;
    EnvFilter::try_new(level.unwrap_or(default)).unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the stderr subscriber used by every command except the worker.
pub fn init_stderr(level: Option<&str>) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt_layer)
        .try_init()
    {
        eprintln!("imagecert: failed to initialize logging: {err}");
    }
}

/// Install the worker subscriber, appending to `log_file`.
///
/// Without a usable log file the worker runs silent.
pub fn init_worker(log_file: Option<&Utf8Path>, level: Option<&str>) {
    let Some(path) = log_file else {
        return;
    };
    if let Some(parent) = path.parent()
        && !parent.as_str().is_empty()
        && std::fs::create_dir_all(parent).is_err()
    {
        return;
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };

    let fmt_layer = fmt::layer()
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .with_target(false);

    let _ = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt_layer)
        .try_init();
}
