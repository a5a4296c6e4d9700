// medusa-core/tests/pipeline_scenarios.rs
// ============================================================================
// Integration tests: end-to-end metadata -> resolve -> expand scenarios
// (spec §8 seeds 1, 2, 6).
// ============================================================================

use std::collections::BTreeSet;

use medusa_core::expand_runs;
use medusa_core::read_metadata;
use medusa_core::model::DepToken;
use medusa_core::model::Suite;
use medusa_core::model::TimeoutSpec;
use medusa_core::model::Value;
use medusa_core::model::VariableTable;

fn default_timeout() -> TimeoutSpec {
    TimeoutSpec::new(60, 120, 30).unwrap_or_else(|err| panic!("default timeout: {err}"))
}

/// Spec §8 seed 1 ("variables.robot fixture"): a suite whose `medusa:for`
/// iterates `LIST_OF_LISTS` (three sub-lists of arity 3) and whose
/// `medusa:deps`/`medusa:stage` reference scalars, a number, and a plain
/// list — expanding to 3 Runs with a shared resolved stage and dep set.
#[test]
fn variables_fixture_expands_to_three_runs_with_shared_deps_and_stage() {
    let mut vars = VariableTable::new();
    vars.insert("SCALAR_STRING", Value::Scalar("hello".to_string()));
    vars.insert("SCALAR_NUMBER", Value::Scalar("42".to_string()));
    vars.insert(
        "LIST",
        Value::Sequence(vec!["one".to_string(), "two".to_string(), "3".to_string()]),
    );
    vars.insert("STAGE", Value::Scalar("Special_Stage".to_string()));
    vars.insert(
        "LIST_OF_LISTS",
        Value::Sequence(vec![
            "one,two,three".to_string(),
            "a,b,c".to_string(),
            "1,2,3".to_string(),
        ]),
    );

    let mut suite = Suite::new("variables.robot", vars);
    suite.push_metadata("stage", vec!["my${STAGE}".to_string()]);
    suite.push_metadata(
        "deps",
        vec![
            "plain".to_string(),
            "${SCALAR_STRING}".to_string(),
            "${SCALAR_NUMBER}".to_string(),
            "@{LIST}".to_string(),
        ],
    );
    suite.push_metadata(
        "for",
        vec![
            "A".to_string(),
            "B".to_string(),
            "C".to_string(),
            "IN".to_string(),
            "@{LIST_OF_LISTS}".to_string(),
        ],
    );

    let metadata = read_metadata(&suite).unwrap_or_else(|err| panic!("read_metadata: {err}"));
    let runs = expand_runs(&suite, &metadata, default_timeout())
        .unwrap_or_else(|err| panic!("expand_runs: {err}"));

    assert_eq!(runs.len(), 3);

    let expected_deps: BTreeSet<DepToken> = ["plain", "hello", "42", "one", "two", "3"]
        .into_iter()
        .map(DepToken::new)
        .collect();

    for run in &runs {
        assert_eq!(run.stage.as_str(), "mySpecial_Stage");
        assert_eq!(run.deps.static_deps, expected_deps);
        assert!(run.deps.dynamic.is_empty());
    }

    assert_eq!(runs[0].bindings.get(&medusa_core::model::VarName::new("A")).unwrap(), "one");
    assert_eq!(runs[0].bindings.get(&medusa_core::model::VarName::new("B")).unwrap(), "two");
    assert_eq!(runs[0].bindings.get(&medusa_core::model::VarName::new("C")).unwrap(), "three");
    assert_eq!(runs[2].bindings.get(&medusa_core::model::VarName::new("A")).unwrap(), "1");
}

/// Spec §8 seed 2 ("dynamic_deps.robot fixture"): two disjoint `ANY ... IN
/// ...` pools classify into two independent `DynChoice` groups, each Run
/// carrying both, unbound until dispatch (which is `medusa-scheduler`'s job
/// — this test only checks the classification `medusa-core` hands off).
#[test]
fn dynamic_deps_fixture_classifies_two_independent_dyn_choices() {
    let mut vars = VariableTable::new();
    vars.insert(
        "SRC1",
        Value::Sequence(vec!["1.1".to_string(), "1.2".to_string(), "any.1".to_string(), "any.2".to_string()]),
    );
    vars.insert(
        "SRC2",
        Value::Sequence(vec!["2.1".to_string(), "2.2".to_string(), "any.1".to_string(), "any.2".to_string()]),
    );

    let mut suite = Suite::new("dynamic_deps.robot", vars);
    suite.push_metadata("stage", vec!["0".to_string()]);
    suite.push_metadata(
        "deps",
        vec![
            "ANY".to_string(),
            "$DYN1".to_string(),
            "IN".to_string(),
            "$SRC1".to_string(),
            "ANY".to_string(),
            "$DYN2".to_string(),
            "IN".to_string(),
            "$SRC2".to_string(),
        ],
    );

    let metadata = read_metadata(&suite).unwrap_or_else(|err| panic!("read_metadata: {err}"));
    let runs = expand_runs(&suite, &metadata, default_timeout())
        .unwrap_or_else(|err| panic!("expand_runs: {err}"));

    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert!(run.deps.static_deps.is_empty());
    assert_eq!(run.deps.dynamic.len(), 2);
    assert_eq!(run.deps.dynamic[0].var_name.as_str(), "DYN1");
    assert_eq!(run.deps.dynamic[0].options[0], DepToken::new("1.1"));
    assert_eq!(run.deps.dynamic[1].var_name.as_str(), "DYN2");
    assert_eq!(run.deps.dynamic[1].options[0], DepToken::new("2.1"));
}

/// Spec §8 seed 6 ("dict for-source"): `&{RUNS}` with two entries and two
/// targets produces one Run per key/value pair, key bound to the first
/// target, value to the second.
#[test]
fn dict_for_source_binds_key_and_value_per_target() {
    let mut vars = VariableTable::new();
    vars.insert(
        "RUNS",
        Value::Mapping(vec![("working".to_string(), "2s".to_string()), ("broken".to_string(), "10s".to_string())]),
    );

    let mut suite = Suite::new("dict_for.robot", vars);
    suite.push_metadata("stage", vec!["0".to_string()]);
    suite.push_metadata("deps", vec!["fixture".to_string()]);
    suite.push_metadata(
        "for",
        vec!["DEP".to_string(), "SLEEP_TIME".to_string(), "IN".to_string(), "&{RUNS}".to_string()],
    );

    let metadata = read_metadata(&suite).unwrap_or_else(|err| panic!("read_metadata: {err}"));
    let runs = expand_runs(&suite, &metadata, default_timeout())
        .unwrap_or_else(|err| panic!("expand_runs: {err}"));

    assert_eq!(runs.len(), 2);
    let dep = medusa_core::model::VarName::new("DEP");
    let sleep_time = medusa_core::model::VarName::new("SLEEP_TIME");
    assert_eq!(runs[0].bindings.get(&dep).unwrap(), "working");
    assert_eq!(runs[0].bindings.get(&sleep_time).unwrap(), "2s");
    assert_eq!(runs[1].bindings.get(&dep).unwrap(), "broken");
    assert_eq!(runs[1].bindings.get(&sleep_time).unwrap(), "10s");
}
