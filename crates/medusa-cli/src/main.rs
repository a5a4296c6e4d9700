#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        clippy::dbg_macro,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        reason = "Test-only output and panic-based assertions are permitted."
    )
)]
// medusa-cli/src/main.rs
// ============================================================================
// Module: Medusa CLI Entry Point
// Description: Command dispatcher for the `stats` and `run` subcommands.
// Purpose: Parse CLI arguments, load configuration, and hand off to the
//          discovery/expansion/scheduling pipeline in `medusa_cli`'s library
//          modules.
// Dependencies: clap, medusa-cli, medusa-core, medusa-scheduler, tokio.
// ============================================================================

//! ## Overview
//! `medusa stats [ROOT]` discovers and expands every suite under `ROOT` and
//! prints a schedule/dependency summary without spawning a process. `medusa
//! run [ROOT] -- <robot args>` does the same discovery, then dispatches the
//! resulting Runs through the Scheduler, merging their outcomes into a JSON
//! report and exiting non-zero if any Run failed or was killed at the
//! hard/kill boundary (spec §6 exit-code contract).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use thiserror::Error;
use tokio::sync::watch;

use medusa_cli::commands;
use medusa_cli::config::MedusaConfig;
use medusa_cli::process::RobotProcessRunner;
use medusa_cli::report::JsonReportMerger;
use medusa_cli::suite_loader::FsSuiteSource;
use medusa_core::model::TimeoutError;
use medusa_core::model::TimeoutSpec;
use medusa_scheduler::StdoutObserver;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "medusa", disable_help_subcommand = true, arg_required_else_help = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a schedule/dependency summary without dispatching any process.
    Stats(StatsArgs),
    /// Discover, schedule, and dispatch every suite under `root`.
    Run(RunArgs),
}

/// Flags shared by both subcommands.
#[derive(Args, Debug)]
struct CommonArgs {
    /// Root directory to discover `.robot` suites under.
    #[arg(value_name = "ROOT", default_value = ".")]
    root: PathBuf,
    /// Path to a `medusa.toml` config file (defaults to `./medusa.toml` if
    /// present).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Overrides the scheduler-wide default `soft,hard,kill` timeout triple
    /// in seconds, applied to Runs whose suite declares no `medusa:timeout`.
    #[arg(short = 't', long = "timeout", value_name = "SOFT,HARD,KILL")]
    timeout: Option<String>,
    /// Keeps only Runs whose resolved stage or static dependency token
    /// equals this value.
    #[arg(short = 'f', long = "filter", value_name = "VALUE")]
    filter: Option<String>,
    /// Redirects merged report / `robot` output beneath this directory.
    #[arg(short = 'd', long = "outputdir", value_name = "DIR")]
    outputdir: Option<PathBuf>,
}

/// Arguments for the `stats` subcommand.
#[derive(Args, Debug)]
struct StatsArgs {
    /// Flags shared with `run`.
    #[command(flatten)]
    common: CommonArgs,
    /// Enriches the summary with full `medusa:for` bindings for Runs whose
    /// suite path contains this substring.
    #[arg(short = 's', long = "select", value_name = "SUBSTRING")]
    select: Option<String>,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
struct RunArgs {
    /// Flags shared with `stats`.
    #[command(flatten)]
    common: CommonArgs,
    /// Arguments forwarded to `robot` after Medusa's own injected
    /// `--variable`/`--metadata`/`--outputdir` flags.
    #[arg(last = true)]
    passthrough: Vec<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper: every fallible step along the way collapses to one
/// message printed to stderr.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a formatted message.
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match dispatch().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Parses arguments and executes the selected subcommand.
async fn dispatch() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Stats(args) => command_stats(args),
        Commands::Run(args) => command_run(args).await,
    }
}

// ============================================================================
// SECTION: Shared Setup
// ============================================================================

/// Loads configuration and applies `CommonArgs`' CLI-flag overrides on top
/// (CLI flag > config file > built-in default, spec §6/§9 precedence).
fn load_config(common: &CommonArgs) -> CliResult<MedusaConfig> {
    let mut config = MedusaConfig::load(common.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load configuration: {err}")))?;

    if let Some(timeout) = &common.timeout {
        config.default_timeout = parse_timeout_triple(timeout)?;
    }
    if let Some(outputdir) = &common.outputdir {
        config.output_dir.clone_from(outputdir);
    }
    Ok(config)
}

/// Parses a `-t/--timeout soft,hard,kill` flag value.
fn parse_timeout_triple(raw: &str) -> CliResult<TimeoutSpec> {
    let fields: Vec<&str> = raw.split(',').collect();
    let [soft, hard, kill] = fields.as_slice() else {
        return Err(CliError::new(format!(
            "--timeout must be a soft,hard,kill triple, found {raw:?}"
        )));
    };
    let parse_field = |field: &str| -> CliResult<u64> {
        field
            .trim()
            .parse()
            .map_err(|_| CliError::new(format!("--timeout fields must be non-negative integers: {raw:?}")))
    };
    TimeoutSpec::new(parse_field(soft)?, parse_field(hard)?, parse_field(kill)?)
        .map_err(|err: TimeoutError| CliError::new(err.to_string()))
}

// ============================================================================
// SECTION: Stats Command
// ============================================================================

/// Executes the `stats` subcommand.
fn command_stats(args: StatsArgs) -> CliResult<ExitCode> {
    let config = load_config(&args.common)?;
    let source = FsSuiteSource::new(args.common.root.clone());

    let expansion = commands::expand_all(&source, config.default_timeout)
        .map_err(|err| CliError::new(format!("failed to discover suites: {err}")))?;
    let stats = commands::build_stats(&expansion, args.select.as_deref());

    let mut stdout = std::io::stdout();
    print_stats(&mut stdout, &stats).map_err(|err| CliError::new(format!("failed to write stats: {err}")))?;

    Ok(ExitCode::SUCCESS)
}

/// Formats a [`commands::StatsReport`] as plain text.
fn print_stats(writer: &mut impl Write, stats: &commands::StatsReport) -> std::io::Result<()> {
    writeln!(writer, "stages:")?;
    for stage in &stats.stages {
        writeln!(writer, "  {} ({} run(s))", stage.stage, stage.run_count)?;
    }

    writeln!(writer, "runs:")?;
    for run in &stats.runs {
        let deps = run
            .static_deps
            .iter()
            .cloned()
            .chain(run.dynamic_deps.iter().map(|name| format!("ANY({name})")))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(writer, "  [{}] {}#{} (deps: {deps})", run.stage, run.suite_path, run.index)?;
        if let Some(bindings) = &run.bindings {
            for (name, value) in bindings {
                writeln!(writer, "      {name} = {value}")?;
            }
        }
    }

    if !stats.rejections.is_empty() {
        writeln!(writer, "rejected suites:")?;
        for rejection in &stats.rejections {
            writeln!(writer, "  {}: {}", rejection.suite_path, rejection.reason)?;
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes the `run` subcommand.
async fn command_run(args: RunArgs) -> CliResult<ExitCode> {
    let config = load_config(&args.common)?;
    let source = FsSuiteSource::new(args.common.root.clone());
    let runner = RobotProcessRunner::new(config.robot_bin.clone(), config.output_dir.clone(), args.passthrough);
    let mut merger = JsonReportMerger::new(config.output_dir.join("medusa-report.json"));
    let mut observer = StdoutObserver::new(std::io::stdout());

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let summary = commands::run(
        &source,
        runner,
        config.default_timeout,
        args.common.filter.as_deref(),
        &mut observer,
        &mut merger,
        cancel_rx,
    )
    .await
    .map_err(|err| CliError::new(format!("run failed: {err}")))?;

    for rejection in &summary.rejections {
        let _ = writeln!(std::io::stderr(), "rejected {}: {}", rejection.suite_path, rejection.reason);
    }
    let _ = writeln!(
        std::io::stdout(),
        "completed {} run(s), {} blocked, {} failed to dispatch",
        summary.completed,
        summary.blocked,
        summary.failed
    );

    Ok(if summary.all_clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// ============================================================================
// SECTION: Error Output
// ============================================================================

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = writeln!(std::io::stderr(), "{message}");
    ExitCode::FAILURE
}
