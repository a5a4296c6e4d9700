// medusa-scheduler/src/scheduler.rs
// ============================================================================
// Module: Scheduler
// Description: Stage-by-stage parallel dispatcher (spec §4.5).
// Purpose: For each stage, repeatedly admit the maximal set of Runs whose
//          effective deps are mutually disjoint with the in-flight set,
//          bind dynamic choices at dispatch time, and drive each dispatched
//          Run through the Timeout Supervisor.
// Dependencies: medusa-core, tokio, crate::{interfaces, observer, supervisor}
// ============================================================================

//! ## Overview
//! Dependencies are symmetric pairwise exclusions, not a DAG: the Scheduler
//! is a greedy mutual-exclusion admitter over a set cover. It is correct and
//! trivially work-conserving because exclusion is monotone — holding more
//! deps can only reduce future admissions, and every release is monotone in
//! the opposite direction (spec §4.5 "Why this shape").
//!
//! The single suspension point (spec §5) is "wait for any in-flight Run to
//! terminate"; every admission decision between terminations runs without
//! suspending, modeled here as one coordinator loop per stage plus one
//! lightweight `tokio::spawn`ed watcher task per dispatched Run, communicating
//! back over an `mpsc` channel.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::watch;

use medusa_core::model::DepToken;
use medusa_core::model::Run;
use medusa_core::model::StageToken;
use medusa_core::model::VarName;

use crate::interfaces::ProcessError;
use crate::interfaces::ProcessHandle;
use crate::interfaces::ProcessRunner;
use crate::observer::SchedulerObserver;
use crate::supervisor::supervise;
use crate::supervisor::SupervisionResult;

// ============================================================================
// SECTION: Run Report
// ============================================================================

/// The Scheduler's final report for one Run.
#[derive(Debug, Clone)]
pub enum RunReport {
    /// The Run was dispatched and the Supervisor reported a termination.
    Completed {
        /// The Run as dispatched, with dynamic-dep bindings filled in.
        run: Run,
        /// The effective dep set used to admit it, in injection order
        /// (static tokens in their canonical set order, then dynamically
        /// chosen values in `DynChoice` declared order; spec §6).
        effective_deps: Vec<DepToken>,
        /// The Supervisor's escalation report.
        supervision: SupervisionResult,
    },
    /// The Run's stage drained with this Run still unable to satisfy a
    /// `DynChoice` (spec §7 `EmptyDynamicPool` → `BlockedUnsatisfiable`).
    BlockedUnsatisfiable {
        /// The unbound Run as it sat in the queue.
        run: Run,
    },
    /// The Run was admitted but its child process could not be spawned or
    /// supervised at all (not a timeout escalation, not an admission
    /// failure — the `ProcessRunner`/Supervisor boundary itself errored).
    DispatchFailed {
        /// The admitted Run whose dispatch failed.
        run: Run,
        /// The underlying dispatch failure.
        error: DispatchError,
    },
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised dispatching a Run's child process.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    /// The underlying `ProcessRunner`/Supervisor failed.
    #[error(transparent)]
    Process(#[from] ProcessError),
}

// ============================================================================
// SECTION: Scheduler
// ============================================================================

/// Owns the execution of every stage, one at a time, for a fixed list of
/// expanded Runs.
pub struct Scheduler<R> {
    /// The child-process boundary used to dispatch admitted Runs.
    runner: Arc<R>,
}

/// One admitted Run's termination, reported back to the stage coordinator.
struct Termination {
    /// The terminated Run, with its final dynamic-dep bindings.
    run: Run,
    /// The effective dep set released by this termination.
    effective_deps: Vec<DepToken>,
    /// The Supervisor's escalation report, or the dispatch error.
    result: Result<SupervisionResult, DispatchError>,
}

impl<R> Scheduler<R>
where
    R: ProcessRunner + Send + Sync + 'static,
    R::Handle: ProcessHandle + Send + 'static,
{
    /// Creates a Scheduler dispatching through `runner`.
    pub fn new(runner: R) -> Self {
        Self {
            runner: Arc::new(runner),
        }
    }

    /// Runs every stage in byte-lexicographic order of its resolved stage
    /// string (spec §5 ordering guarantee (a)), returning one [`RunReport`]
    /// per input Run.
    ///
    /// `cancel` is a shared watch the caller flips to `true` to request a
    /// top-level cancellation (spec §5); the Scheduler stops admitting new
    /// Runs once observed and lets every in-flight Run's Supervisor collapse
    /// into its hard/kill path.
    pub async fn run_all(
        &self,
        runs: Vec<Run>,
        observer: &mut dyn SchedulerObserver,
        cancel: &watch::Receiver<bool>,
    ) -> Vec<RunReport> {
        let mut by_stage: BTreeMap<StageToken, Vec<Run>> = BTreeMap::new();
        for run in runs {
            by_stage.entry(run.stage.clone()).or_default().push(run);
        }

        let mut reports = Vec::new();
        for (stage, stage_runs) in by_stage {
            observer.stage_started(&stage, stage_runs.len());
            reports.extend(self.run_stage(stage_runs, observer, cancel).await);
            observer.stage_drained(&stage);
        }
        reports
    }

    /// Runs one stage's admission loop to completion (spec §4.5 stage loop).
    async fn run_stage(
        &self,
        runs: Vec<Run>,
        observer: &mut dyn SchedulerObserver,
        cancel: &watch::Receiver<bool>,
    ) -> Vec<RunReport> {
        let mut queue: VecDeque<Run> = runs.into();
        let mut held: BTreeSet<DepToken> = BTreeSet::new();
        let mut in_flight = 0usize;
        let mut reports = Vec::new();
        let (tx, mut rx) = mpsc::channel::<Termination>(queue.len().max(1));

        loop {
            // Admission pass: repeatedly admit the head-most admissible Run,
            // rescanning from the front after every admission, until one
            // full scan makes no further progress (spec §4.5 step 3).
            loop {
                let mut admitted_any = false;
                let mut index = 0;
                while index < queue.len() {
                    match try_admit(&queue[index], &held) {
                        Some(bindings) => {
                            let mut run = queue.remove(index).unwrap_or_else(|| unreachable!());
                            for (var, value) in bindings {
                                run.bindings.insert(var, value);
                            }
                            let effective = run.effective_deps().unwrap_or_default();
                            held.extend(effective.iter().cloned());
                            let effective_vec = ordered_effective_deps(&run);
                            observer.run_admitted(&run, &effective_vec);
                            self.dispatch(run, effective_vec, tx.clone(), cancel.clone());
                            in_flight += 1;
                            admitted_any = true;
                        }
                        None => index += 1,
                    }
                }
                if !admitted_any {
                    break;
                }
            }

            if queue.is_empty() && in_flight == 0 {
                break;
            }

            if in_flight == 0 {
                // No in-flight Run can ever release a dep, so nothing left
                // in `queue` can become admissible (spec §7
                // EmptyDynamicPool / BlockedUnsatisfiable).
                for run in queue.drain(..) {
                    observer.run_blocked_unsatisfiable(&run);
                    reports.push(RunReport::BlockedUnsatisfiable {
                        run,
                    });
                }
                break;
            }

            // The single suspension point (spec §5): wait for any in-flight
            // Run to terminate before resuming admission.
            if let Some(termination) = rx.recv().await {
                for token in &termination.effective_deps {
                    held.remove(token);
                }
                in_flight -= 1;
                observer.run_released(&termination.run, &termination.effective_deps);
                match termination.result {
                    Ok(supervision) => reports.push(RunReport::Completed {
                        run: termination.run,
                        effective_deps: termination.effective_deps,
                        supervision,
                    }),
                    Err(error) => {
                        observer.run_dispatch_failed(&termination.run, &error);
                        reports.push(RunReport::DispatchFailed {
                            run: termination.run,
                            error,
                        });
                    }
                }
            }
        }

        reports
    }

    /// Spawns the admitted Run's child process and its Supervisor watcher
    /// task, reporting termination back over `tx`.
    fn dispatch(
        &self,
        run: Run,
        effective_deps: Vec<DepToken>,
        tx: mpsc::Sender<Termination>,
        cancel: watch::Receiver<bool>,
    ) {
        let runner = Arc::clone(&self.runner);
        let for_bindings: BTreeMap<String, String> =
            run.bindings.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        let effective_strings: Vec<String> =
            effective_deps.iter().map(|token| token.as_str().to_string()).collect();
        tokio::spawn(async move {
            let outcome = async {
                let handle = runner.spawn(&run, &effective_strings, &for_bindings).await?;
                supervise(run.timeout, handle, cancel).await
            }
            .await
            .map_err(DispatchError::from);
            let _ = tx
                .send(Termination {
                    run,
                    effective_deps,
                    result: outcome,
                })
                .await;
        });
    }
}

// ============================================================================
// SECTION: Admission
// ============================================================================

/// Tests whether `run` is admissible against the current `held` set and, if
/// so, greedily binds each `DynChoice` to the first declared option not in
/// `held` (spec §4.5: "first-available in declared option order").
///
/// Returns `None` if the Run's static deps collide with `held` or any
/// `DynChoice`'s option pool is fully held.
fn try_admit(run: &Run, held: &BTreeSet<DepToken>) -> Option<BTreeMap<VarName, String>> {
    if !run.deps.static_deps.is_disjoint(held) {
        return None;
    }
    let mut bindings = BTreeMap::new();
    for choice in &run.deps.dynamic {
        let chosen = choice.options.iter().find(|option| !held.contains(*option))?;
        bindings.insert(choice.var_name.clone(), chosen.as_str().to_string());
    }
    Some(bindings)
}

/// Orders a bound Run's effective dep set for injection as `MEDUSA_DEPS`
/// (spec §6): static tokens first, in their canonical set order, then
/// dynamically chosen values in `DynChoice` declaration order, duplicates
/// removed.
///
/// The static half's "declared order" from the original `medusa:deps`
/// source is not preserved by [`medusa_core::model::DepSpec`], which models
/// the static half as an order-free set (spec §3: "no ordering is
/// semantically required within a set"); see `DESIGN.md` for this decision.
fn ordered_effective_deps(run: &Run) -> Vec<DepToken> {
    let mut out: Vec<DepToken> = run.deps.static_deps.iter().cloned().collect();
    for choice in &run.deps.dynamic {
        if let Some(bound) = run.bindings.get(&choice.var_name) {
            let token = DepToken::new(bound.clone());
            if !out.contains(&token) {
                out.push(token);
            }
        }
    }
    out
}
