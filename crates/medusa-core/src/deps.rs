// medusa-core/src/deps.rs
// ============================================================================
// Module: Medusa Dependency Model
// Description: Classifies resolved `medusa:deps` tokens into a DepSpec.
// Purpose: Collapse literal dependency tokens into a set and group
//          `ANY ... IN ...` windows into ordered DynChoice groups.
// Dependencies: crate::model::run, crate::resolve
// ============================================================================

//! ## Overview
//! Classification is the last step before a suite's deps are fixed as part
//! of a [`Run`](crate::model::Run). Static tokens deduplicate naturally by
//! being inserted into a set; dynamic groups keep first-appearance order,
//! since that order is what the Scheduler uses for deterministic tie-breaks
//! (spec §4.5).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::model::DepSpec;
use crate::model::DepToken;
use crate::model::DynChoice;
use crate::resolve::ResolvedDepToken;

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Classifies a `medusa:deps` key's resolved entries into a [`DepSpec`].
///
/// Multiple `ANY ... IN ...` windows naming the same dynamic-dep variable
/// (across entries or within one) are folded into a single [`DynChoice`],
/// keeping the options from the first window encountered.
#[must_use]
pub fn classify_deps(entries: &[Vec<ResolvedDepToken>]) -> DepSpec {
    let mut static_deps = BTreeSet::new();
    let mut dynamic: Vec<DynChoice> = Vec::new();

    for entry in entries {
        for token in entry {
            match token {
                ResolvedDepToken::Literal(value) => {
                    static_deps.insert(DepToken::new(value.clone()));
                }
                ResolvedDepToken::AnyIn {
                    var_name,
                    options,
                } => {
                    if !dynamic.iter().any(|choice| &choice.var_name == var_name) {
                        dynamic.push(DynChoice {
                            var_name: var_name.clone(),
                            options: options.iter().cloned().map(DepToken::new).collect(),
                        });
                    }
                }
            }
        }
    }

    DepSpec {
        static_deps,
        dynamic,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VarName;

    #[test]
    fn literal_tokens_collapse_into_a_set() {
        let entries = vec![vec![
            ResolvedDepToken::Literal("db".to_string()),
            ResolvedDepToken::Literal("db".to_string()),
            ResolvedDepToken::Literal("cache".to_string()),
        ]];
        let spec = classify_deps(&entries);
        assert_eq!(spec.static_deps.len(), 2);
        assert!(spec.dynamic.is_empty());
    }

    #[test]
    fn any_in_windows_keep_first_appearance_order() {
        let entries = vec![
            vec![ResolvedDepToken::AnyIn {
                var_name: VarName::new("PORT"),
                options: vec!["8080".to_string(), "8081".to_string()],
            }],
            vec![ResolvedDepToken::AnyIn {
                var_name: VarName::new("SLOT"),
                options: vec!["a".to_string(), "b".to_string()],
            }],
        ];
        let spec = classify_deps(&entries);
        assert_eq!(spec.dynamic.len(), 2);
        assert_eq!(spec.dynamic[0].var_name, VarName::new("PORT"));
        assert_eq!(spec.dynamic[1].var_name, VarName::new("SLOT"));
    }

    #[test]
    fn duplicate_dyn_choice_variable_keeps_first_options() {
        let entries = vec![vec![
            ResolvedDepToken::AnyIn {
                var_name: VarName::new("PORT"),
                options: vec!["8080".to_string()],
            },
            ResolvedDepToken::AnyIn {
                var_name: VarName::new("PORT"),
                options: vec!["9090".to_string()],
            },
        ]];
        let spec = classify_deps(&entries);
        assert_eq!(spec.dynamic.len(), 1);
        assert_eq!(spec.dynamic[0].options, vec![DepToken::new("8080")]);
    }
}
