// medusa-core/src/model/run.rs
// ============================================================================
// Module: Medusa Run Model
// Description: The schedulable unit: one execution of one suite with one
//              concrete set of variable bindings.
// Purpose: Carry a Run's resolved stage, dependency spec, timeout, and
//          bindings from the Run Expander through to the Scheduler.
// Dependencies: crate::model::ids
// ============================================================================

//! ## Overview
//! A Run's `deps` and `stage` are fully resolved before scheduling, except for
//! dynamic-dep variables, which remain unbound in `bindings` until dispatch.
//! Fields mirror spec §3 exactly: `suite_path`, `stage`, `deps`, `timeout`,
//! `bindings`, `index`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::model::ids::DepToken;
use crate::model::ids::StageToken;
use crate::model::ids::SuitePath;
use crate::model::ids::VarName;

// ============================================================================
// SECTION: Timeout
// ============================================================================

/// The `(soft, hard, kill)` escalation triple, in seconds.
///
/// # Invariants
/// - All three fields are strictly positive.
/// - `soft <= hard`. `kill` bounds the post-hard grace period and has no
///   ordering constraint against `soft`/`hard` beyond being positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutSpec {
    /// Seconds from dispatch until the soft (cooperative teardown) signal.
    pub soft: u64,
    /// Seconds from dispatch until the hard (forced termination) signal.
    pub hard: u64,
    /// Seconds from the hard signal until the unconditional kill signal.
    pub kill: u64,
}

impl TimeoutSpec {
    /// Creates a timeout spec, validating spec §3's invariants.
    ///
    /// # Errors
    ///
    /// Returns [`TimeoutError::NotPositive`] if any field is zero, or
    /// [`TimeoutError::SoftExceedsHard`] if `soft > hard`.
    pub fn new(soft: u64, hard: u64, kill: u64) -> Result<Self, TimeoutError> {
        if soft == 0 || hard == 0 || kill == 0 {
            return Err(TimeoutError::NotPositive);
        }
        if soft > hard {
            return Err(TimeoutError::SoftExceedsHard {
                soft,
                hard,
            });
        }
        Ok(Self {
            soft,
            hard,
            kill,
        })
    }
}

/// Errors constructing a [`TimeoutSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TimeoutError {
    /// One of `soft`, `hard`, or `kill` was zero.
    #[error("timeout values must be strictly positive")]
    NotPositive,
    /// `soft` exceeded `hard`.
    #[error("soft timeout ({soft}s) exceeds hard timeout ({hard}s)")]
    SoftExceedsHard {
        /// The offending soft value.
        soft: u64,
        /// The offending hard value.
        hard: u64,
    },
}

// ============================================================================
// SECTION: Dependency Spec
// ============================================================================

/// One dynamic dependency: a variable bound, at dispatch time, to exactly one
/// of an ordered set of candidate tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynChoice {
    /// The variable name bound by this choice (the `$X` in `ANY $X IN $LIST`).
    pub var_name: VarName,
    /// Candidate tokens, in declared order (determines tie-break order).
    pub options: Vec<DepToken>,
}

/// A Run's dependency specification, partitioned into static tokens and
/// dynamic choice groups.
///
/// # Invariants
/// - `static_deps` has duplicates collapsed (it is a true set).
/// - `dynamic` is ordered by first appearance in the source metadata, which
///   is the order the Scheduler must scan for deterministic tie-breaks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepSpec {
    /// Fixed dependency tokens, held for the Run's whole lifetime.
    pub static_deps: BTreeSet<DepToken>,
    /// Dynamic dependency groups, in declaration order.
    pub dynamic: Vec<DynChoice>,
}

// ============================================================================
// SECTION: Run
// ============================================================================

/// The unit of execution: one concrete expansion of one suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    /// Origin suite path.
    pub suite_path: SuitePath,
    /// Resolved stage string (sorted byte-lexicographically against peers).
    pub stage: StageToken,
    /// Static and dynamic dependency specification.
    pub deps: DepSpec,
    /// Soft/hard/kill timeout triple, inherited from the scheduler default
    /// when the suite declares no `medusa:timeout`.
    pub timeout: TimeoutSpec,
    /// Variable bindings: `medusa:for` assignments, later overlaid with
    /// dynamic-dep choices made at dispatch time.
    pub bindings: BTreeMap<VarName, String>,
    /// Positional identifier within the suite's expansion, for reporting.
    pub index: usize,
}

impl Run {
    /// Returns the effective dependency set once `self.bindings` carries a
    /// bound value for every [`DynChoice`] variable: the union of the static
    /// set and every dynamically chosen value.
    ///
    /// Returns `None` if any `DynChoice` variable is not yet bound.
    #[must_use]
    pub fn effective_deps(&self) -> Option<BTreeSet<DepToken>> {
        let mut out = self.deps.static_deps.clone();
        for choice in &self.deps.dynamic {
            let bound = self.bindings.get(&choice.var_name)?;
            out.insert(DepToken::new(bound.clone()));
        }
        Some(out)
    }
}
