// medusa-core/src/model/suite.rs
// ============================================================================
// Module: Medusa Suite Model
// Description: Parsed suite input: origin path, variable table, raw metadata.
// Purpose: Provide the Metadata Reader's input shape, independent of whatever
//          Robot Framework parser produced it.
// Dependencies: crate::model::{ids, value}
// ============================================================================

//! ## Overview
//! `Suite` is the boundary type between the (out of scope) Robot Framework
//! parser and Medusa's own pipeline. Several metadata keys may repeat (e.g.
//! two `medusa:deps` lines); each key is modeled as an ordered sequence of
//! entries, never overwritten by a later line.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::model::ids::SuitePath;
use crate::model::value::VariableTable;

// ============================================================================
// SECTION: Metadata Entry
// ============================================================================

/// One `medusa:*` metadata line: an ordered sequence of raw value tokens,
/// each of which may still contain `${...}`/`@{...}`/`&{...}` references.
pub type MetadataEntry = Vec<String>;

/// A single recognized `medusa:*` metadata key and its entries, in source
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataKey {
    /// The key name without the `medusa:` prefix (`"stage"`, `"deps"`, …).
    pub name: String,
    /// Entries in declaration order; an entry is a token list.
    pub entries: Vec<MetadataEntry>,
}

// ============================================================================
// SECTION: Suite
// ============================================================================

/// A parsed Robot Framework suite, reduced to what the Medusa core needs.
///
/// # Invariants
/// - `metadata` preserves source declaration order, including duplicate keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suite {
    /// Origin path of the suite file.
    pub origin: SuitePath,
    /// The suite's declared variable table.
    pub variables: VariableTable,
    /// Raw `medusa:*` metadata entries, in declaration order.
    pub metadata: Vec<MetadataKey>,
}

impl Suite {
    /// Creates a new suite from its parsed components.
    #[must_use]
    pub fn new(origin: impl Into<SuitePath>, variables: VariableTable) -> Self {
        Self {
            origin: origin.into(),
            variables,
            metadata: Vec::new(),
        }
    }

    /// Appends a raw metadata entry under the given key name.
    pub fn push_metadata(&mut self, key: impl Into<String>, entry: MetadataEntry) {
        let key = key.into();
        if let Some(existing) = self.metadata.iter_mut().find(|k| k.name == key) {
            existing.entries.push(entry);
        } else {
            self.metadata.push(MetadataKey {
                name: key,
                entries: vec![entry],
            });
        }
    }

    /// Returns all entries declared under the given key name, in order.
    #[must_use]
    pub fn entries_for(&self, key: &str) -> &[MetadataEntry] {
        self.metadata
            .iter()
            .find(|k| k.name == key)
            .map_or(&[], |k| k.entries.as_slice())
    }
}
