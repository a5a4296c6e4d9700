// medusa-scheduler/src/interfaces.rs
// ============================================================================
// Module: Medusa External Interfaces
// Description: Trait boundaries standing in for Medusa's out-of-scope
//              collaborators: the Robot Framework parser, the `robot`
//              subprocess mechanics, and output merging / report generation.
// Purpose: Let the Scheduler and Timeout Supervisor depend on narrow,
//          testable seams instead of a concrete parser or process library.
// Dependencies: async-trait, medusa-core
// ============================================================================

//! ## Overview
//! Spec §6 names three external collaborators and gives each an interface
//! rather than an implementation: [`SuiteSource`] (the Robot Framework
//! parser), [`ProcessRunner`] (the subprocess/IO mechanics of invoking
//! `robot`), and [`ReportMerger`] (output merging / HTML report generation).
//! `medusa-cli` supplies concrete implementations; this crate only depends
//! on the trait.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::process::ExitStatus;

use async_trait::async_trait;
use thiserror::Error;

use medusa_core::model::Run;
use medusa_core::model::Suite;

// ============================================================================
// SECTION: Suite Source
// ============================================================================

/// Errors raised while a [`SuiteSource`] reads suites.
#[derive(Debug, Error)]
pub enum SuiteSourceError {
    /// The underlying parser or filesystem failed.
    #[error("suite source failed: {0}")]
    Source(String),
}

/// The Robot Framework parser boundary: produces parsed [`Suite`]s.
///
/// Medusa's core never reads suite files itself; it only consumes the
/// variable table and `medusa:*` metadata entries this trait's implementor
/// already extracted.
pub trait SuiteSource {
    /// Returns every suite this source knows about, in discovery order.
    ///
    /// # Errors
    ///
    /// Returns [`SuiteSourceError`] if the underlying parser fails.
    fn suites(&self) -> Result<Vec<Suite>, SuiteSourceError>;
}

// ============================================================================
// SECTION: Process Runner
// ============================================================================

/// The three escalation signals the Timeout Supervisor delivers (spec §4.6).
///
/// Exact OS signal semantics are a [`ProcessRunner`] implementation detail;
/// the contract is only that `Soft` asks the child to begin teardown, `Hard`
/// forces termination, and `Kill` is unconditional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Cooperative teardown request.
    Soft,
    /// Forced termination.
    Hard,
    /// Unconditional kill.
    Kill,
}

/// Errors raised spawning or signaling a child process.
#[derive(Debug, Clone, Error)]
pub enum ProcessError {
    /// The child process could not be spawned.
    #[error("failed to spawn child process: {0}")]
    Spawn(String),
    /// A signal could not be delivered to a running child.
    #[error("failed to signal child process: {0}")]
    Signal(String),
    /// Waiting for the child's exit failed.
    #[error("failed to wait for child process: {0}")]
    Wait(String),
}

/// A single dispatched child process, as far as the Supervisor is concerned:
/// something that can be signaled and awaited.
#[async_trait]
pub trait ProcessHandle: Send {
    /// Delivers an escalation signal to the running child.
    ///
    /// Implementations should treat signaling an already-exited child as a
    /// no-op rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Signal`] if delivery fails for a still-live
    /// child.
    async fn signal(&mut self, signal: Signal) -> Result<(), ProcessError>;

    /// Awaits the child's exit and returns its status.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Wait`] if the wait itself fails (not if the
    /// child exits non-zero — that is a normal [`ExitStatus`]).
    async fn wait(&mut self) -> Result<ExitStatus, ProcessError>;
}

/// The subprocess/IO mechanics of invoking `robot`: spawns one child per
/// dispatched [`Run`], injecting the variable bindings and `MEDUSA_*`
/// suite-level variables spec §6 names.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// The live child-process handle this runner produces.
    type Handle: ProcessHandle;

    /// Spawns the child process for one dispatched Run.
    ///
    /// `effective_deps` is the Run's bound dependency set (spec §6
    /// `MEDUSA_DEPS`); `for_bindings` is the Run's `medusa:for` binding map
    /// (spec §6 `MEDUSA_FOR`).
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Spawn`] if the child cannot be started.
    async fn spawn(
        &self,
        run: &Run,
        effective_deps: &[String],
        for_bindings: &BTreeMap<String, String>,
    ) -> Result<Self::Handle, ProcessError>;
}

// ============================================================================
// SECTION: Report Merger
// ============================================================================

/// One Run's reported outcome, as the Timeout Supervisor observed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The child exited on its own before any timer fired.
    ExitedClean,
    /// The child exited on its own after the soft signal but before hard.
    ExitedAfterSoft,
    /// The child was still alive at the hard deadline and was force-killed.
    KilledAtHard,
    /// The child was still alive after the hard signal's kill grace and was
    /// unconditionally killed.
    KilledAtKill,
}

/// Errors raised merging per-Run reports into one.
#[derive(Debug, Error)]
pub enum ReportMergeError {
    /// The underlying report merger failed.
    #[error("report merge failed: {0}")]
    Merge(String),
}

/// The output merging / HTML report generation boundary: combines the
/// individual Robot outputs of every terminated Run into one report.
///
/// Medusa's core never inspects Robot's own output files; it only tells the
/// merger which Run finished with which [`RunOutcome`] and exit status.
pub trait ReportMerger {
    /// Records one Run's termination for later merging.
    ///
    /// # Errors
    ///
    /// Returns [`ReportMergeError`] if the merger cannot record the result
    /// (e.g. the Run's own output file is missing or unreadable).
    fn record(
        &mut self,
        run: &Run,
        outcome: RunOutcome,
        status: Option<ExitStatus>,
    ) -> Result<(), ReportMergeError>;

    /// Finalizes and writes the merged report.
    ///
    /// # Errors
    ///
    /// Returns [`ReportMergeError`] if the merged report cannot be written.
    fn finalize(&mut self) -> Result<(), ReportMergeError>;
}
