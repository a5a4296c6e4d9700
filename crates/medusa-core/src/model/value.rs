// medusa-core/src/model/value.rs
// ============================================================================
// Module: Medusa Value Model
// Description: Resolved variable values and the suite variable table.
// Purpose: Provide the tagged Value variant (scalar | sequence | mapping |
//          unbound) consumed by the Value Resolver and Run Expander.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A resolved metadata value is either a scalar string, an ordered sequence
//! of strings, or a mapping from string to string. `Unbound` is the explicit
//! sentinel for a variable table entry declared with no value (Robot
//! Framework's `None`) — this is what `medusa:for` targets and dynamic-dep
//! variables must carry before a Run's own bindings are overlaid.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::model::ids::VarName;

// ============================================================================
// SECTION: Value
// ============================================================================

/// A resolved variable value.
///
/// # Invariants
/// - A resolved `Value` never contains unresolved `${...}`/`@{...}`/`&{...}`
///   syntax; that substitution is the Value Resolver's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Value {
    /// A scalar string value.
    Scalar(String),
    /// An ordered sequence of strings (Robot `@{...}` list variable).
    Sequence(Vec<String>),
    /// An ordered mapping from string key to string value (Robot `&{...}` dict variable).
    Mapping(Vec<(String, String)>),
    /// Declared but unset (Robot Framework `None`).
    Unbound,
}

impl Value {
    /// Returns the value as a scalar string, if it is one.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns the value as a sequence, if it is one.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[String]> {
        match self {
            Self::Sequence(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    /// Returns the value as an ordered mapping, if it is one.
    #[must_use]
    pub fn as_mapping(&self) -> Option<&[(String, String)]> {
        match self {
            Self::Mapping(entries) => Some(entries.as_slice()),
            _ => None,
        }
    }

    /// Returns true when the value is [`Value::Unbound`].
    #[must_use]
    pub const fn is_unbound(&self) -> bool {
        matches!(self, Self::Unbound)
    }

    /// Flattens the value to a list of element strings in declared order.
    ///
    /// Scalars flatten to a single-element list; mappings flatten to their
    /// values (not their keys), per the in-place flattening rule for list and
    /// dict references inside a metadata entry.
    #[must_use]
    pub fn flatten(&self) -> Vec<String> {
        match self {
            Self::Scalar(value) => vec![value.clone()],
            Self::Sequence(values) => values.clone(),
            Self::Mapping(entries) => entries.iter().map(|(_, value)| value.clone()).collect(),
            Self::Unbound => Vec::new(),
        }
    }
}

// ============================================================================
// SECTION: Variable Table
// ============================================================================

/// A suite's variable table: the mapping from variable name to resolved
/// value, as declared in the suite source (not including per-run overlays).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableTable {
    entries: BTreeMap<VarName, Value>,
}

impl VariableTable {
    /// Creates an empty variable table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a variable binding.
    pub fn insert(&mut self, name: impl Into<VarName>, value: Value) {
        self.entries.insert(name.into(), value);
    }

    /// Looks up a variable by name.
    #[must_use]
    pub fn get(&self, name: &VarName) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Returns an overlay table where `overlay` entries take precedence over
    /// `self`'s entries; used to re-resolve metadata with `medusa:for`
    /// per-iteration bindings applied on top of the suite's declared table.
    #[must_use]
    pub fn overlay(&self, overlay: &BTreeMap<VarName, String>) -> Self {
        let mut merged = self.clone();
        for (name, value) in overlay {
            merged.insert(name.clone(), Value::Scalar(value.clone()));
        }
        merged
    }
}
