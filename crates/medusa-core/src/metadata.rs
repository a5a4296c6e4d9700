// medusa-core/src/metadata.rs
// ============================================================================
// Module: Medusa Metadata Reader
// Description: Extracts raw `medusa:*` key/value pairs from a parsed suite.
// Purpose: Validate the four recognized keys' declaration shape before any
//          value resolution takes place.
// Dependencies: crate::model::suite
// ============================================================================

//! ## Overview
//! The Metadata Reader is the first pipeline stage (spec §4.1). It recognizes
//! exactly four `medusa:*` keys — `stage`, `deps`, `for`, `timeout` — and
//! rejects any other `medusa:*` key as a user error. It does not resolve
//! variable references; that is the Value Resolver's job.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::model::MetadataEntry;
use crate::model::Suite;

// ============================================================================
// SECTION: Raw Metadata
// ============================================================================

/// The four recognized `medusa:*` keys, read but not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMetadata {
    /// The suite's single `medusa:stage` entry.
    pub stage: MetadataEntry,
    /// One or more `medusa:deps` entries, in declaration order.
    pub deps: Vec<MetadataEntry>,
    /// The suite's single `medusa:for` entry, if declared.
    pub for_clause: Option<MetadataEntry>,
    /// The suite's single `medusa:timeout` entry, if declared.
    pub timeout: Option<MetadataEntry>,
}

const KNOWN_KEYS: [&str; 4] = ["stage", "deps", "for", "timeout"];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while reading `medusa:*` metadata.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// A `medusa:*` key outside the four recognized keys was declared.
    #[error("unknown medusa metadata key: medusa:{0}")]
    UnknownKey(String),
    /// The suite declared no `medusa:stage` key.
    #[error("suite is missing required medusa:stage metadata")]
    MissingStage,
    /// The suite declared no `medusa:deps` key.
    #[error("suite is missing required medusa:deps metadata")]
    MissingDeps,
    /// `medusa:stage` was declared more than once.
    #[error("medusa:stage must have exactly one entry, found {0}")]
    DuplicateStage(usize),
    /// `medusa:for` was declared more than once.
    #[error("medusa:for must have exactly one entry, found {0}")]
    DuplicateFor(usize),
    /// `medusa:timeout` was declared more than once.
    #[error("medusa:timeout must have exactly one entry, found {0}")]
    DuplicateTimeout(usize),
    /// `medusa:for` did not contain the literal `IN` separator.
    #[error("medusa:for is missing the literal IN separator")]
    MalformedFor,
    /// `medusa:timeout` did not contain a single comma-separated triple.
    #[error("medusa:timeout must be a single comma-separated soft,hard,kill triple")]
    MalformedTimeout,
}

// ============================================================================
// SECTION: Reader
// ============================================================================

/// Reads and structurally validates a suite's `medusa:*` metadata.
///
/// # Errors
///
/// Returns [`MetadataError`] for unknown keys, missing required keys, or
/// malformed `for`/`timeout` entry shapes (everything else is left for the
/// Value Resolver and Run Expander, since it depends on variable resolution).
pub fn read_metadata(suite: &Suite) -> Result<RawMetadata, MetadataError> {
    for key in &suite.metadata {
        if !KNOWN_KEYS.contains(&key.name.as_str()) {
            return Err(MetadataError::UnknownKey(key.name.clone()));
        }
    }

    let stage_entries = suite.entries_for("stage");
    if stage_entries.is_empty() {
        return Err(MetadataError::MissingStage);
    }
    if stage_entries.len() > 1 {
        return Err(MetadataError::DuplicateStage(stage_entries.len()));
    }

    let deps_entries = suite.entries_for("deps");
    if deps_entries.is_empty() {
        return Err(MetadataError::MissingDeps);
    }

    let for_entries = suite.entries_for("for");
    if for_entries.len() > 1 {
        return Err(MetadataError::DuplicateFor(for_entries.len()));
    }
    if let Some(entry) = for_entries.first() {
        if !entry.iter().any(|token| token == "IN") {
            return Err(MetadataError::MalformedFor);
        }
    }

    let timeout_entries = suite.entries_for("timeout");
    if timeout_entries.len() > 1 {
        return Err(MetadataError::DuplicateTimeout(timeout_entries.len()));
    }
    if let Some(entry) = timeout_entries.first() {
        if entry.len() != 1 || entry[0].split(',').count() != 3 {
            return Err(MetadataError::MalformedTimeout);
        }
    }

    Ok(RawMetadata {
        stage: stage_entries[0].clone(),
        deps: deps_entries.to_vec(),
        for_clause: for_entries.first().cloned(),
        timeout: timeout_entries.first().cloned(),
    })
}
