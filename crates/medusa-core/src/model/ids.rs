// medusa-core/src/model/ids.rs
// ============================================================================
// Module: Medusa Identifiers
// Description: Canonical opaque identifiers used throughout the scheduling core.
// Purpose: Provide strongly typed, serializable string wrappers so stage
//          labels, dependency tokens, and variable names cannot be confused
//          with one another at the type level.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque and serialize as strings. Validation (e.g. rejecting
//! empty tokens) is handled at the parsing boundaries that construct them,
//! not within these wrappers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Macro
// ============================================================================

macro_rules! string_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

string_id!(SuitePath, "Filesystem origin path of a parsed suite.");
string_id!(StageToken, "Resolved `medusa:stage` value; sorted byte-lexicographically.");
string_id!(DepToken, "Opaque string naming a shared resource a Run may hold.");
string_id!(VarName, "Name of a variable in a suite's variable table.");
