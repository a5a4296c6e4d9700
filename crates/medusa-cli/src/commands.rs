// medusa-cli/src/commands.rs
// ============================================================================
// Module: Medusa Commands
// Description: `stats` and `run` subcommand implementations (spec §6 CLI
//              contract), built on the discovery/expansion/scheduling
//              pipeline the rest of the workspace provides.
// Purpose: Keep `main.rs` a thin clap-dispatch shell by putting the actual
//          command logic somewhere `tests/*.rs` can also call directly.
// Dependencies: medusa-core, medusa-scheduler, tokio
// ============================================================================

//! ## Overview
//! `stats` discovers and expands every suite under a root directory and
//! prints a schedule/dependency summary without spawning a single process.
//! `run` does the same discovery/expansion, then hands the resulting Runs to
//! a [`Scheduler`] wired to a [`RobotProcessRunner`] and a
//! [`JsonReportMerger`], applying `-f/--filter` before dispatch and returning
//! the exit-code contract spec §6 names: zero if every Run exited clean,
//! non-zero if any Run failed or was killed at the hard/kill boundary.
//!
//! Rejecting one suite (bad metadata, unresolved reference, …) does not
//! abort the whole command — spec §7 treats per-suite rejection as
//! non-fatal unless it empties every stage; rejected suites are collected
//! and reported back to the caller instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use medusa_core::expand::expand_runs;
use medusa_core::metadata::read_metadata;
use medusa_core::model::DepToken;
use medusa_core::model::Run;
use medusa_core::model::StageToken;
use medusa_core::model::Suite;
use medusa_core::model::SuitePath;
use medusa_core::model::TimeoutSpec;
use medusa_scheduler::RunReport;
use medusa_scheduler::Scheduler;
use medusa_scheduler::SchedulerObserver;
use medusa_scheduler::SuiteSource;
use medusa_scheduler::SuiteSourceError;
use std::collections::BTreeMap;
use tokio::sync::watch;

use crate::process::RobotProcessRunner;
use crate::report::JsonReportMerger;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by either subcommand before scheduling begins.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The configured [`SuiteSource`] failed outright (not a per-suite
    /// rejection — those are collected, not raised).
    #[error(transparent)]
    SuiteSource(#[from] SuiteSourceError),
    /// The `run` command's merged report could not be finalized.
    #[error(transparent)]
    ReportMerge(#[from] medusa_scheduler::interfaces::ReportMergeError),
}

// ============================================================================
// SECTION: Expansion
// ============================================================================

/// One suite that could not be expanded into Runs, with the reason.
#[derive(Debug, Clone)]
pub struct SuiteRejection {
    /// The rejected suite's origin path.
    pub suite_path: SuitePath,
    /// A human-readable description of why it was rejected.
    pub reason: String,
}

/// The result of discovering and expanding every suite a [`SuiteSource`]
/// knows about.
#[derive(Debug, Default)]
pub struct ExpansionReport {
    /// Every Run produced by a successfully expanded suite.
    pub runs: Vec<Run>,
    /// Suites that failed metadata reading or expansion, with the reason.
    pub rejections: Vec<SuiteRejection>,
}

/// Discovers every suite `source` knows about and expands each into its
/// Runs, collecting per-suite failures instead of aborting (spec §7: suite
/// rejection does not abort the overall run).
///
/// # Errors
///
/// Returns [`CommandError::SuiteSource`] only if the source itself fails to
/// enumerate suites; an individual suite's metadata/expansion failure is
/// recorded in [`ExpansionReport::rejections`] instead.
pub fn expand_all(
    source: &dyn SuiteSource,
    default_timeout: TimeoutSpec,
) -> Result<ExpansionReport, CommandError> {
    let suites = source.suites()?;
    let mut report = ExpansionReport::default();

    for suite in &suites {
        match expand_suite(suite, default_timeout) {
            Ok(mut runs) => report.runs.append(&mut runs),
            Err(reason) => report.rejections.push(SuiteRejection {
                suite_path: suite.origin.clone(),
                reason,
            }),
        }
    }

    Ok(report)
}

/// Expands one suite, formatting any metadata/resolve/expand failure as a
/// single string (the precise error kind is not actionable past reporting).
fn expand_suite(suite: &Suite, default_timeout: TimeoutSpec) -> Result<Vec<Run>, String> {
    let metadata = read_metadata(suite).map_err(|err| err.to_string())?;
    expand_runs(suite, &metadata, default_timeout).map_err(|err| err.to_string())
}

// ============================================================================
// SECTION: Filtering
// ============================================================================

/// Keeps only Runs matching `filter` (spec §6 `-f/--filter`): a Run matches
/// if its resolved stage equals `filter`, or its static dep set contains it.
/// `None` keeps every Run.
#[must_use]
pub fn filter_runs(runs: Vec<Run>, filter: Option<&str>) -> Vec<Run> {
    let Some(filter) = filter else {
        return runs;
    };
    let dep = DepToken::new(filter);
    runs.into_iter()
        .filter(|run| run.stage.as_str() == filter || run.deps.static_deps.contains(&dep))
        .collect()
}

// ============================================================================
// SECTION: Stats
// ============================================================================

/// One Run's summary line for the `stats` subcommand.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Origin suite path.
    pub suite_path: String,
    /// Positional index within the suite's expansion.
    pub index: usize,
    /// Resolved stage string.
    pub stage: String,
    /// Static dependency tokens, in set order.
    pub static_deps: Vec<String>,
    /// Dynamic dependency variable names (options are left unresolved at
    /// stats time — no dispatch has occurred).
    pub dynamic_deps: Vec<String>,
    /// `medusa:for` bindings, present only when `-s/--select` matched this
    /// Run's suite path (spec §6: select "enriches stats output").
    pub bindings: Option<BTreeMap<String, String>>,
}

/// One stage's Run count, in the order `stats` reports stages (byte-
/// lexicographic, matching the Scheduler's own dispatch order).
#[derive(Debug, Clone)]
pub struct StageSummary {
    /// The stage's resolved string.
    pub stage: String,
    /// Number of Runs belonging to this stage.
    pub run_count: usize,
}

/// The full `stats` subcommand report.
#[derive(Debug, Clone, Default)]
pub struct StatsReport {
    /// Per-stage Run counts, in dispatch order.
    pub stages: Vec<StageSummary>,
    /// Per-Run summaries, in the same order `expand_all` produced them.
    pub runs: Vec<RunSummary>,
    /// Suites rejected during expansion.
    pub rejections: Vec<SuiteRejection>,
}

/// Builds a [`StatsReport`] from an [`ExpansionReport`], without dispatching
/// any process. `select` enriches the per-Run summary for suites whose path
/// contains it with the Run's full `medusa:for` bindings (spec §6
/// `-s/--select`).
#[must_use]
pub fn build_stats(expansion: &ExpansionReport, select: Option<&str>) -> StatsReport {
    let mut by_stage: BTreeMap<StageToken, usize> = BTreeMap::new();
    let mut runs = Vec::with_capacity(expansion.runs.len());

    for run in &expansion.runs {
        *by_stage.entry(run.stage.clone()).or_insert(0) += 1;

        let selected = select.is_some_and(|needle| run.suite_path.as_str().contains(needle));
        runs.push(RunSummary {
            suite_path: run.suite_path.to_string(),
            index: run.index,
            stage: run.stage.to_string(),
            static_deps: run.deps.static_deps.iter().map(DepToken::to_string).collect(),
            dynamic_deps: run.deps.dynamic.iter().map(|choice| choice.var_name.to_string()).collect(),
            bindings: selected
                .then(|| run.bindings.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()),
        });
    }

    StatsReport {
        stages: by_stage
            .into_iter()
            .map(|(stage, run_count)| StageSummary {
                stage: stage.to_string(),
                run_count,
            })
            .collect(),
        runs,
        rejections: expansion.rejections.clone(),
    }
}

// ============================================================================
// SECTION: Run
// ============================================================================

/// The `run` subcommand's final report: the merged manifest's path and
/// whether every dispatched Run exited clean (spec §6 exit-code contract).
#[derive(Debug, Clone)]
pub struct RunReportSummary {
    /// Number of Runs dispatched and merged into the report.
    pub completed: usize,
    /// Number of Runs that never became admissible before their stage
    /// drained (spec §7 `BlockedUnsatisfiable`).
    pub blocked: usize,
    /// Number of admitted Runs whose child process could not be spawned or
    /// supervised at all.
    pub failed: usize,
    /// Suites rejected during expansion, before scheduling began.
    pub rejections: Vec<SuiteRejection>,
    /// True if every dispatched Run exited clean and no Run was blocked or
    /// failed to dispatch (spec §6 exit-code contract).
    pub all_clean: bool,
}

/// Discovers, expands, filters, and dispatches every Run, merging their
/// outcomes into `merger` and reporting progress through `observer`.
///
/// `cancel` is the shared cancellation watch (spec §5); the caller is
/// responsible for flipping it (typically from a `ctrl_c` listener) and for
/// calling [`JsonReportMerger::finalize`] once this returns.
///
/// # Errors
///
/// Returns [`CommandError::SuiteSource`] if suite discovery itself fails.
pub async fn run(
    source: &dyn SuiteSource,
    runner: RobotProcessRunner,
    default_timeout: TimeoutSpec,
    filter: Option<&str>,
    observer: &mut dyn SchedulerObserver,
    merger: &mut JsonReportMerger,
    cancel: watch::Receiver<bool>,
) -> Result<RunReportSummary, CommandError> {
    let expansion = expand_all(source, default_timeout)?;
    let runs = filter_runs(expansion.runs, filter);

    let scheduler = Scheduler::new(runner);
    let reports = scheduler.run_all(runs, observer, &cancel).await;

    let mut blocked = 0usize;
    let mut failed = 0usize;

    for report in reports {
        match report {
            RunReport::Completed {
                run,
                supervision,
                ..
            } => {
                merger.record(&run, supervision.outcome, supervision.exit_status)?;
            }
            RunReport::BlockedUnsatisfiable {
                ..
            } => {
                blocked += 1;
            }
            RunReport::DispatchFailed {
                ..
            } => {
                failed += 1;
            }
        }
    }

    merger.finalize()?;

    Ok(RunReportSummary {
        completed: merger.recorded_count(),
        blocked,
        failed,
        rejections: expansion.rejections,
        all_clean: merger.all_clean() && blocked == 0 && failed == 0 && expansion.rejections.is_empty(),
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
