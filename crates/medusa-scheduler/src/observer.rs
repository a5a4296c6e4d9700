// medusa-scheduler/src/observer.rs
// ============================================================================
// Module: Scheduler Observer
// Description: Structured progress reporting for stage/admission/release
//              events, with a default stdout implementation.
// Purpose: Let callers (CLI, tests) observe scheduling decisions without the
//          Scheduler depending on a logging-framework macro.
// Dependencies: std
// ============================================================================

//! ## Overview
//! `decision-gate`'s own workspace carries no `log`/`tracing` dependency;
//! CLI-facing progress is routed through explicit, typed calls instead of a
//! logging macro. Medusa follows the same convention: [`SchedulerObserver`]
//! is a plain trait the Scheduler calls at well-defined points, and
//! [`StdoutObserver`] is the default implementation that formats those
//! events as single lines.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;

use medusa_core::model::DepToken;
use medusa_core::model::Run;
use medusa_core::model::StageToken;

use crate::scheduler::DispatchError;

// ============================================================================
// SECTION: Observer Trait
// ============================================================================

/// Structured scheduling events a [`crate::scheduler::Scheduler`] reports.
pub trait SchedulerObserver {
    /// A stage began accepting admissions.
    fn stage_started(&mut self, stage: &StageToken, run_count: usize) {
        let _ = (stage, run_count);
    }

    /// Every Run in a stage has terminated; the stage is draining.
    fn stage_drained(&mut self, stage: &StageToken) {
        let _ = stage;
    }

    /// A Run was admitted and dispatched, with its bound effective deps.
    fn run_admitted(&mut self, run: &Run, effective_deps: &[DepToken]) {
        let _ = (run, effective_deps);
    }

    /// A Run terminated, releasing its held deps.
    fn run_released(&mut self, run: &Run, effective_deps: &[DepToken]) {
        let _ = (run, effective_deps);
    }

    /// A Run could not be admitted before its stage otherwise drained.
    fn run_blocked_unsatisfiable(&mut self, run: &Run) {
        let _ = run;
    }

    /// An admitted Run's child process could not be spawned or supervised.
    fn run_dispatch_failed(&mut self, run: &Run, error: &DispatchError) {
        let _ = (run, error);
    }
}

// ============================================================================
// SECTION: Stdout Observer
// ============================================================================

/// Default [`SchedulerObserver`] that writes one line per event to the
/// supplied writer (typically `std::io::stdout()`).
pub struct StdoutObserver<W> {
    /// Destination writer for formatted event lines.
    writer: W,
}

impl<W: Write> StdoutObserver<W> {
    /// Creates an observer writing to `writer`.
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
        }
    }

    /// Writes one line, silently dropping the (rare) write failure — a
    /// progress line is best-effort and must never fail scheduling.
    fn line(&mut self, message: &std::fmt::Arguments<'_>) {
        let _ = writeln!(self.writer, "{message}");
    }
}

impl<W: Write> SchedulerObserver for StdoutObserver<W> {
    fn stage_started(&mut self, stage: &StageToken, run_count: usize) {
        self.line(&format_args!("[stage {stage}] starting ({run_count} run(s))"));
    }

    fn stage_drained(&mut self, stage: &StageToken) {
        self.line(&format_args!("[stage {stage}] drained"));
    }

    fn run_admitted(&mut self, run: &Run, effective_deps: &[DepToken]) {
        let deps = join_tokens(effective_deps);
        self.line(&format_args!(
            "[stage {}] admitted {}#{} (deps: {deps})",
            run.stage, run.suite_path, run.index
        ));
    }

    fn run_released(&mut self, run: &Run, effective_deps: &[DepToken]) {
        let deps = join_tokens(effective_deps);
        self.line(&format_args!(
            "[stage {}] released {}#{} (deps: {deps})",
            run.stage, run.suite_path, run.index
        ));
    }

    fn run_blocked_unsatisfiable(&mut self, run: &Run) {
        self.line(&format_args!(
            "[stage {}] {}#{} blocked unsatisfiable",
            run.stage, run.suite_path, run.index
        ));
    }

    fn run_dispatch_failed(&mut self, run: &Run, error: &DispatchError) {
        self.line(&format_args!(
            "[stage {}] {}#{} dispatch failed: {error}",
            run.stage, run.suite_path, run.index
        ));
    }
}

/// Joins dependency tokens for a one-line progress message.
fn join_tokens(tokens: &[DepToken]) -> String {
    tokens.iter().map(DepToken::as_str).collect::<Vec<_>>().join(", ")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use medusa_core::model::DepSpec;
    use medusa_core::model::Suite;
    use medusa_core::model::TimeoutSpec;
    use medusa_core::model::VariableTable;
    use std::collections::BTreeMap;

    use crate::interfaces::ProcessError;

    fn run_fixture() -> Run {
        let suite = Suite::new("t.robot", VariableTable::new());
        Run {
            suite_path: suite.origin,
            stage: StageToken::new("0"),
            deps: DepSpec::default(),
            timeout: TimeoutSpec::new(1, 2, 1).unwrap(),
            bindings: BTreeMap::new(),
            index: 0,
        }
    }

    #[test]
    fn default_methods_are_no_ops() {
        struct Silent;
        impl SchedulerObserver for Silent {}
        let mut observer = Silent;
        let run = run_fixture();
        observer.stage_started(&run.stage, 1);
        observer.run_admitted(&run, &[]);
        observer.run_released(&run, &[]);
        observer.run_blocked_unsatisfiable(&run);
        observer.run_dispatch_failed(&run, &DispatchError::Process(ProcessError::Spawn("boom".to_string())));
        observer.stage_drained(&run.stage);
    }

    #[test]
    fn stdout_observer_formats_admission_line() {
        let mut buffer = Vec::new();
        let mut observer = StdoutObserver::new(&mut buffer);
        let run = run_fixture();
        observer.run_admitted(&run, &[DepToken::new("db")]);
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("admitted"));
        assert!(text.contains("db"));
    }

    #[test]
    fn stdout_observer_formats_dispatch_failed_line() {
        let mut buffer = Vec::new();
        let mut observer = StdoutObserver::new(&mut buffer);
        let run = run_fixture();
        observer.run_dispatch_failed(&run, &DispatchError::Process(ProcessError::Spawn("boom".to_string())));
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("dispatch failed"));
        assert!(text.contains("boom"));
    }
}
