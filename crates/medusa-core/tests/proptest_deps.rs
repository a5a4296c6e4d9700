// medusa-core/tests/proptest_deps.rs
// ============================================================================
// Module: Dependency Classification Property-Based Tests
// Description: Property tests for `classify_deps`'s static/dynamic split.
// Purpose: Cover the "DynChoice options equal the for-source's elements"
//          invariant across randomly generated dep-entry shapes, not just
//          the handful of fixtures the unit tests exercise.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeSet;

use medusa_core::classify_deps;
use medusa_core::model::DepToken;
use medusa_core::model::VarName;
use medusa_core::resolve::ResolvedDepToken;
use proptest::prelude::*;

/// Generates a short, printable token safe to use as a literal dep or
/// dynamic-dep option.
fn token_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}"
}

/// Generates one `ANY $VAR IN [options]` window with at least one option, so
/// the dynamic pool is never vacuously empty.
fn any_in_strategy() -> impl Strategy<Value = ResolvedDepToken> {
    (token_strategy(), prop::collection::vec(token_strategy(), 1 .. 6)).prop_map(
        |(var_name, options)| ResolvedDepToken::AnyIn {
            var_name: VarName::new(var_name),
            options,
        },
    )
}

proptest! {
    #[test]
    fn literal_tokens_always_collapse_into_a_deduplicated_set(
        tokens in prop::collection::vec(token_strategy(), 0 .. 20)
    ) {
        let entries = vec![tokens.iter().cloned().map(ResolvedDepToken::Literal).collect()];
        let spec = classify_deps(&entries);
        let expected: BTreeSet<DepToken> = tokens.into_iter().map(DepToken::new).collect();
        prop_assert_eq!(spec.static_deps, expected);
        prop_assert!(spec.dynamic.is_empty());
    }

    #[test]
    fn dyn_choice_options_equal_the_declared_any_in_options(
        choice in any_in_strategy()
    ) {
        let ResolvedDepToken::AnyIn { var_name, options } = &choice else {
            unreachable!("any_in_strategy only produces AnyIn tokens");
        };
        let entries = vec![vec![choice.clone()]];
        let spec = classify_deps(&entries);

        prop_assert_eq!(spec.dynamic.len(), 1);
        prop_assert_eq!(&spec.dynamic[0].var_name, var_name);
        let expected: Vec<DepToken> = options.iter().cloned().map(DepToken::new).collect();
        prop_assert_eq!(&spec.dynamic[0].options, &expected);
    }

    #[test]
    fn duplicate_any_in_variable_always_keeps_the_first_window_seen(
        first in any_in_strategy(), second_options in prop::collection::vec(token_strategy(), 1 .. 6)
    ) {
        let ResolvedDepToken::AnyIn { var_name, options: first_options } = first.clone() else {
            unreachable!("any_in_strategy only produces AnyIn tokens");
        };
        let second = ResolvedDepToken::AnyIn {
            var_name: var_name.clone(),
            options: second_options,
        };
        let entries = vec![vec![first, second]];
        let spec = classify_deps(&entries);

        prop_assert_eq!(spec.dynamic.len(), 1);
        let expected: Vec<DepToken> = first_options.into_iter().map(DepToken::new).collect();
        prop_assert_eq!(&spec.dynamic[0].options, &expected);
    }
}
