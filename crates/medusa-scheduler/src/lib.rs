// medusa-scheduler/src/lib.rs
// ============================================================================
// Crate: medusa-scheduler
// Description: The execution half of Medusa: stage-by-stage scheduling,
//              dependency admission control, and timeout escalation.
// Purpose: Turn a flat list of expanded `Run`s (produced by `medusa-core`)
//          into dispatched child processes, respecting mutual-exclusion
//          dependencies and per-Run timeout triples.
// Dependencies: medusa-core, tokio, async-trait, thiserror
// ============================================================================

//! # medusa-scheduler
//!
//! `medusa-core` is pure and synchronous: it parses metadata, resolves
//! variables, and expands `medusa:for` into a flat list of [`Run`]s. This
//! crate consumes that list and actually executes it.
//!
//! - [`interfaces`] names the three external collaborators (suite parsing,
//!   process spawning, report merging) as traits.
//! - [`scheduler`] is the admission-control loop described in spec §4.5.
//! - [`supervisor`] is the per-Run soft/hard/kill escalation state machine
//!   (spec §4.6).
//! - [`observer`] is the structured progress-reporting seam the Scheduler
//!   calls instead of a logging macro.
//!
//! [`Run`]: medusa_core::model::Run

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod interfaces;
pub mod observer;
pub mod scheduler;
pub mod supervisor;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use interfaces::ProcessError;
pub use interfaces::ProcessHandle;
pub use interfaces::ProcessRunner;
pub use interfaces::ReportMergeError;
pub use interfaces::ReportMerger;
pub use interfaces::RunOutcome;
pub use interfaces::Signal;
pub use interfaces::SuiteSource;
pub use interfaces::SuiteSourceError;
pub use observer::SchedulerObserver;
pub use observer::StdoutObserver;
pub use scheduler::DispatchError;
pub use scheduler::RunReport;
pub use scheduler::Scheduler;
pub use supervisor::supervise;
pub use supervisor::SupervisionResult;
