// medusa-scheduler/src/supervisor.rs
// ============================================================================
// Module: Timeout Supervisor
// Description: Per-Run soft -> hard -> kill escalation (spec §4.6).
// Purpose: Drive one dispatched Run's child process to termination, either
//          by letting it exit on its own or by escalating through three
//          signal boundaries.
// Dependencies: medusa-core, tokio, crate::interfaces
// ============================================================================

//! ## Overview
//! Three timers start at dispatch time: soft (cooperative teardown), hard
//! (forced termination, measured from dispatch), and kill (unconditional,
//! measured from hard's expiry, not from dispatch). A Run that exits on its
//! own at any point cancels every remaining timer. `soft == hard` collapses
//! the soft phase into an immediate hard escalation (spec §8 B2) because the
//! hard deadline elapses in the same instant the soft signal is sent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::process::ExitStatus;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;

use medusa_core::model::TimeoutSpec;

use crate::interfaces::ProcessError;
use crate::interfaces::ProcessHandle;
use crate::interfaces::RunOutcome;
use crate::interfaces::Signal;

// ============================================================================
// SECTION: Result
// ============================================================================

/// The Timeout Supervisor's report for one dispatched Run.
#[derive(Debug, Clone, Copy)]
pub struct SupervisionResult {
    /// Which escalation boundary the Run terminated at.
    pub outcome: RunOutcome,
    /// The child's exit status, if the wait itself succeeded.
    pub exit_status: Option<ExitStatus>,
    /// Whether a top-level user cancellation drove this termination rather
    /// than the Run's own timeout triple.
    pub cancelled: bool,
}

// ============================================================================
// SECTION: Internal Race Outcome
// ============================================================================

/// The result of racing a child's exit against a deadline and a
/// cancellation flag.
enum Race {
    /// The child exited on its own.
    Exited(ExitStatus),
    /// The deadline elapsed first.
    TimedOut,
    /// A top-level cancellation was observed first.
    Cancelled,
}

/// Races `handle.wait()` against a `duration` sleep and the cancellation
/// watch becoming true, whichever resolves first.
async fn race<H: ProcessHandle>(
    handle: &mut H,
    duration: Duration,
    cancel: &mut watch::Receiver<bool>,
) -> Result<Race, ProcessError> {
    if *cancel.borrow() {
        return Ok(Race::Cancelled);
    }
    tokio::select! {
        biased;
        exited = handle.wait() => Ok(Race::Exited(exited?)),
        () = sleep(duration) => Ok(Race::TimedOut),
        changed = cancel.changed() => {
            if changed.is_ok() && *cancel.borrow() {
                Ok(Race::Cancelled)
            } else {
                // The cancel watch was dropped or flipped back to false;
                // neither case can happen in normal operation, so keep
                // waiting on the child as the only remaining signal.
                Ok(Race::Exited(handle.wait().await?))
            }
        }
    }
}

// ============================================================================
// SECTION: Supervision
// ============================================================================

/// Drives one dispatched Run's child to termination under its timeout
/// triple, reporting which escalation boundary (if any) it crossed.
///
/// `cancel` is a shared watch flipped to `true` by a top-level user
/// cancellation; observing it at any point before the kill signal collapses
/// the remaining schedule directly into the hard-then-kill path (spec §5
/// Cancellation).
///
/// # Errors
///
/// Returns [`ProcessError`] if signaling or waiting on the child fails.
pub async fn supervise<H: ProcessHandle>(
    timeout: TimeoutSpec,
    mut handle: H,
    mut cancel: watch::Receiver<bool>,
) -> Result<SupervisionResult, ProcessError> {
    let soft = Duration::from_secs(timeout.soft);
    let hard = Duration::from_secs(timeout.hard);
    let kill = Duration::from_secs(timeout.kill);

    match race(&mut handle, soft, &mut cancel).await? {
        Race::Exited(status) => {
            return Ok(SupervisionResult {
                outcome: RunOutcome::ExitedClean,
                exit_status: Some(status),
                cancelled: false,
            })
        }
        Race::Cancelled => {
            return escalate_from_hard(&mut handle, kill, &mut cancel, true).await;
        }
        Race::TimedOut => {
            handle.signal(Signal::Soft).await?;
        }
    }

    // `soft == hard` means the hard deadline has already elapsed (spec §8
    // B2): escalate immediately instead of sleeping for zero duration.
    let remaining_to_hard = hard.saturating_sub(soft);
    match race(&mut handle, remaining_to_hard, &mut cancel).await? {
        Race::Exited(status) => Ok(SupervisionResult {
            outcome: RunOutcome::ExitedAfterSoft,
            exit_status: Some(status),
            cancelled: false,
        }),
        Race::Cancelled => escalate_from_hard(&mut handle, kill, &mut cancel, true).await,
        Race::TimedOut => escalate_from_hard(&mut handle, kill, &mut cancel, false).await,
    }
}

/// Sends the hard signal (if not already implied by cancellation) and races
/// the child's exit against the kill grace period, escalating to kill if it
/// elapses.
async fn escalate_from_hard<H: ProcessHandle>(
    handle: &mut H,
    kill: Duration,
    cancel: &mut watch::Receiver<bool>,
    cancelled: bool,
) -> Result<SupervisionResult, ProcessError> {
    handle.signal(Signal::Hard).await?;
    match race(handle, kill, cancel).await? {
        Race::Exited(status) => Ok(SupervisionResult {
            outcome: RunOutcome::KilledAtHard,
            exit_status: Some(status),
            cancelled,
        }),
        Race::Cancelled => {
            handle.signal(Signal::Kill).await?;
            let status = handle.wait().await?;
            Ok(SupervisionResult {
                outcome: RunOutcome::KilledAtKill,
                exit_status: Some(status),
                cancelled: true,
            })
        }
        Race::TimedOut => {
            handle.signal(Signal::Kill).await?;
            let status = handle.wait().await?;
            Ok(SupervisionResult {
                outcome: RunOutcome::KilledAtKill,
                exit_status: Some(status),
                cancelled,
            })
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::os::unix::process::ExitStatusExt;
    use std::sync::Arc;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// A fake child process driven entirely by `tokio::time`: it "exits" at
    /// a fixed deadline (captured once at construction, so repeated `wait`
    /// calls agree) unless a non-soft signal arrives first.
    struct FakeHandle {
        deadline: Option<tokio::time::Instant>,
        signals: Arc<Mutex<Vec<Signal>>>,
        exited: Arc<Notify>,
    }

    impl FakeHandle {
        fn new(exit_after: Option<Duration>) -> Self {
            Self {
                deadline: exit_after.map(|delay| tokio::time::Instant::now() + delay),
                signals: Arc::new(Mutex::new(Vec::new())),
                exited: Arc::new(Notify::new()),
            }
        }
    }

    #[async_trait]
    impl ProcessHandle for FakeHandle {
        async fn signal(&mut self, signal: Signal) -> Result<(), ProcessError> {
            self.signals.lock().unwrap().push(signal);
            if signal != Signal::Soft {
                self.exited.notify_one();
            }
            Ok(())
        }

        async fn wait(&mut self) -> Result<ExitStatus, ProcessError> {
            if let Some(deadline) = self.deadline {
                tokio::select! {
                    () = tokio::time::sleep_until(deadline) => {}
                    () = self.exited.notified() => {}
                }
            } else {
                self.exited.notified().await;
            }
            Ok(ExitStatus::from_raw(0))
        }
    }

    fn no_cancel() -> watch::Receiver<bool> {
        watch::channel(false).1
    }

    #[tokio::test(start_paused = true)]
    async fn child_exiting_before_soft_is_clean() {
        let timeout = TimeoutSpec::new(2, 5, 3).unwrap();
        let handle = FakeHandle::new(Some(Duration::from_secs(1)));
        let result = supervise(timeout, handle, no_cancel()).await.unwrap();
        assert_eq!(result.outcome, RunOutcome::ExitedClean);
        assert!(!result.cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn child_exiting_after_soft_before_hard_is_exited_after_soft() {
        let timeout = TimeoutSpec::new(2, 5, 3).unwrap();
        // Exits (via its own accord) 3s after spawn: after the soft signal
        // fires at t=2 but before the hard deadline at t=5.
        let handle = FakeHandle::new(Some(Duration::from_secs(3)));
        let result = supervise(timeout, handle, no_cancel()).await.unwrap();
        assert_eq!(result.outcome, RunOutcome::ExitedAfterSoft);
    }

    #[tokio::test(start_paused = true)]
    async fn unresponsive_child_is_killed_at_hard() {
        let timeout = TimeoutSpec::new(2, 5, 3).unwrap();
        // Never exits on its own; the hard signal (mocked as forcing exit)
        // should land at t=5, inside the t=8 kill boundary.
        let handle = FakeHandle::new(None);
        let result = supervise(timeout, handle, no_cancel()).await.unwrap();
        assert_eq!(result.outcome, RunOutcome::KilledAtHard);
    }

    #[tokio::test(start_paused = true)]
    async fn soft_equals_hard_collapses_to_immediate_hard() {
        let timeout = TimeoutSpec::new(2, 2, 3).unwrap();
        let handle = FakeHandle::new(None);
        let result = supervise(timeout, handle, no_cancel()).await.unwrap();
        assert_eq!(result.outcome, RunOutcome::KilledAtHard);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_skips_straight_to_hard_then_kill() {
        let timeout = TimeoutSpec::new(100, 200, 5).unwrap();
        let handle = FakeHandle::new(None);
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let result = supervise(timeout, handle, rx).await.unwrap();
        assert!(result.cancelled);
        assert_eq!(result.outcome, RunOutcome::KilledAtHard);
    }
}
