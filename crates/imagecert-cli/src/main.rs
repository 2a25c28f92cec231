//! CLI entry point for imagecert.
//!
//! This module is intentionally thin: it handles argument parsing, logging, I/O, and
//! exit codes. All business logic lives in the `imagecert-app` crate.

mod logging;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use imagecert_app::{
    CheckInput, ExplainOutput, WorkerInput, format_explanation, format_list, format_not_found,
    format_summary, results_exit_code, run_check, run_explain, run_list, run_worker,
    serialize_results, write_results,
};
use imagecert_sandbox::WorkerRequest;
use imagecert_settings::{Overrides, parse_log_level};
use imagecert_types::ids;
use std::io::Write;

#[derive(Parser, Debug)]
#[command(
    name = "imagecert",
    version,
    about = "Certification checks for container and operator-bundle images"
)]
struct Cli {
    /// Path to imagecert config TOML (a missing file means defaults).
    #[arg(long, global = true, default_value = "imagecert.toml")]
    config: Utf8PathBuf,

    /// Override log level (trace|debug|info|warn|error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Override the container engine binary.
    #[arg(long, global = true)]
    container_engine: Option<String>,

    /// Override the namespace helper command line (e.g. "podman unshare").
    #[arg(long, global = true)]
    namespace_helper: Option<String>,

    /// Override the artifacts directory.
    #[arg(long, global = true)]
    artifacts_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a certification policy against an image.
    Check {
        #[command(subcommand)]
        policy: CheckCommand,
    },

    /// List every available check.
    List,

    /// Explain a check with remediation guidance.
    Explain {
        /// Check name (case-insensitive), e.g. "HasLicense".
        check: String,
    },
}

#[derive(Subcommand, Debug)]
enum CheckCommand {
    /// Run the container policy.
    Container(PolicyArgs),

    /// Run the operator-bundle policy.
    Operator(PolicyArgs),

    /// Sandbox worker entrypoint; started by imagecert itself.
    #[command(hide = true)]
    Run,
}

#[derive(Args, Debug)]
struct PolicyArgs {
    /// Image reference, or a root filesystem directory with --mounted.
    image: String,

    /// Treat IMAGE as an already-unpacked root filesystem.
    #[arg(long)]
    mounted: bool,

    /// Where to write the JSON results (default: <artifacts-dir>/results.json).
    #[arg(long)]
    results_out: Option<Utf8PathBuf>,

    /// Leave a check out of this run (repeatable).
    #[arg(long = "skip", value_name = "CHECK")]
    skip: Vec<String>,

    /// Run every check through the sandbox, not only mount checks.
    #[arg(long)]
    sandbox_all_checks: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.cmd {
        Commands::Check {
            policy: CheckCommand::Run,
        } => cmd_worker(&cli),
        Commands::Check {
            policy: CheckCommand::Container(args),
        } => cmd_check(&cli, ids::POLICY_CONTAINER, args),
        Commands::Check {
            policy: CheckCommand::Operator(args),
        } => cmd_check(&cli, ids::POLICY_OPERATOR, args),
        Commands::List => cmd_list(&cli),
        Commands::Explain { check } => cmd_explain(&cli, check),
    }
}

/// Read the config file; a missing file is allowed (defaults apply).
fn read_config(path: &Utf8Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

/// First log level found: flag, environment, config file.
fn driver_log_level(cli: &Cli, cfg_text: &str) -> Option<String> {
    cli.log_level
        .clone()
        .or_else(|| std::env::var(ids::ENV_LOG_LEVEL).ok())
        .or_else(|| {
            imagecert_settings::parse_config_toml(cfg_text)
                .ok()
                .and_then(|cfg| cfg.log_level)
        })
}

fn cmd_check(cli: &Cli, policy: &str, args: &PolicyArgs) -> anyhow::Result<()> {
    let cfg_text = read_config(&cli.config);
    let log_level = driver_log_level(cli, &cfg_text);
    logging::init_stderr(
        log_level
            .as_deref()
            .and_then(|l| parse_log_level(l).ok())
            .as_deref(),
    );

    let result = (|| -> anyhow::Result<i32> {
        let overrides = Overrides {
            container_engine: cli.container_engine.clone(),
            namespace_helper: cli
                .namespace_helper
                .as_deref()
                .map(|cmd| cmd.split_whitespace().map(str::to_string).collect()),
            log_level: cli
                .log_level
                .clone()
                .or_else(|| std::env::var(ids::ENV_LOG_LEVEL).ok()),
            artifacts_dir: cli.artifacts_dir.clone(),
            sandbox_all_checks: args.sandbox_all_checks.then_some(true),
            skip_checks: args.skip.clone(),
        };
        let self_exe = std::env::current_exe().context("locate the imagecert executable")?;

        let output = run_check(CheckInput {
            policy,
            image: &args.image,
            mounted: args.mounted,
            config_text: &cfg_text,
            overrides,
            self_exe,
        })?;

        let results_out = args
            .results_out
            .clone()
            .unwrap_or_else(|| output.resolved_config.artifacts_dir.join("results.json"));
        write_results(&results_out, &output.results).context("write results json")?;
        print!("{}", format_summary(&output.results));
        tracing::info!(path = %results_out, "results written");

        Ok(results_exit_code(&output.results))
    })();

    match result {
        Ok(code) => {
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("imagecert error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn cmd_worker(cli: &Cli) -> anyhow::Result<()> {
    let log_file = std::env::var(ids::ENV_LOG_FILE).ok().map(Utf8PathBuf::from);
    let log_level = std::env::var(ids::ENV_LOG_LEVEL).ok();
    logging::init_worker(
        log_file.as_deref(),
        log_level
            .as_deref()
            .and_then(|l| parse_log_level(l).ok())
            .as_deref(),
    );

    let result = (|| -> anyhow::Result<i32> {
        let request = WorkerRequest::from_env().context("decode sandbox request")?;
        // Everything the worker needs arrives in the request environment; the parent's
        // config file may not even be reachable from here.
        let overrides = Overrides {
            container_engine: std::env::var(ids::ENV_CONTAINER_ENGINE)
                .ok()
                .or_else(|| cli.container_engine.clone()),
            log_level,
            ..Overrides::default()
        };

        let results = run_worker(WorkerInput {
            request,
            config_text: "",
            overrides,
        })?;

        let bytes = serialize_results(&results)?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&bytes).context("write results to stdout")?;
        stdout.write_all(b"\n").context("write results to stdout")?;
        stdout.flush().context("flush stdout")?;

        Ok(results_exit_code(&results))
    })();

    match result {
        Ok(code) => {
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Err(err) => {
            let msg = format!("{err:#}");
            tracing::error!(error = %msg, "sandbox worker failed");
            eprintln!("{}", fatal_line(&msg));
            std::process::exit(1);
        }
    }
}

/// The line the parent looks for on stderr, e.g. `level=fatal msg="image mount failed"`.
fn fatal_line(msg: &str) -> String {
    format!("{} msg={msg:?}", ids::FATAL_MARKER)
}

fn cmd_list(cli: &Cli) -> anyhow::Result<()> {
    logging::init_stderr(cli.log_level.as_deref());
    let registry = imagecert_engine::builtin_registry().context("build check registry")?;
    print!("{}", format_list(&run_list(&registry)));
    Ok(())
}

fn cmd_explain(cli: &Cli, check: &str) -> anyhow::Result<()> {
    logging::init_stderr(cli.log_level.as_deref());
    let registry = imagecert_engine::builtin_registry().context("build check registry")?;
    match run_explain(&registry, check) {
        ExplainOutput::Found(description) => {
            print!("{}", format_explanation(&description));
            Ok(())
        }
        ExplainOutput::NotFound {
            identifier,
            available,
        } => {
            eprint!("{}", format_not_found(&identifier, &available));
            std::process::exit(1);
        }
    }
}
