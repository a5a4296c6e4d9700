// medusa-cli/tests/suite_discovery.rs
// ============================================================================
// Integration tests: filesystem suite discovery through to Run expansion,
// exercising `FsSuiteSource` and `commands::expand_all` together against
// real `.robot` fixture text on disk (spec §8 seed 1 "variables.robot").
// ============================================================================

use std::fs;

use medusa_cli::commands;
use medusa_cli::suite_loader::FsSuiteSource;
use medusa_core::model::TimeoutSpec;
use medusa_scheduler::SuiteSource;

fn default_timeout() -> TimeoutSpec {
    TimeoutSpec::new(60, 120, 30).unwrap_or_else(|err| panic!("default timeout: {err}"))
}

const VARIABLES_FIXTURE: &str = "\
*** Settings ***
Metadata    medusa:stage    my${STAGE}
Metadata    medusa:deps    plain    ${SCALAR_STRING}    ${SCALAR_NUMBER}    @{LIST}
Metadata    medusa:for    A    B    C    IN    @{LIST_OF_LISTS}

*** Variables ***
${SCALAR_STRING}    hello
${SCALAR_NUMBER}    42
@{LIST}    one    two    3
${STAGE}    Special_Stage
@{LIST_OF_LISTS}    one,two,three    a,b,c    1,2,3
";

#[test]
fn fs_suite_source_discovers_and_expands_nested_robot_files() {
    let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let nested = dir.path().join("suites").join("group_a");
    fs::create_dir_all(&nested).unwrap_or_else(|err| panic!("mkdir: {err}"));
    fs::write(nested.join("variables.robot"), VARIABLES_FIXTURE).unwrap_or_else(|err| panic!("write: {err}"));

    let source = FsSuiteSource::new(dir.path());
    let suites = source.suites().unwrap_or_else(|err| panic!("suites: {err}"));
    assert_eq!(suites.len(), 1);

    let expansion = commands::expand_all(&source, default_timeout())
        .unwrap_or_else(|err| panic!("expand_all: {err}"));
    assert!(expansion.rejections.is_empty());
    assert_eq!(expansion.runs.len(), 3);

    for run in &expansion.runs {
        assert_eq!(run.stage.as_str(), "mySpecial_Stage");
        let deps: Vec<&str> = run.deps.static_deps.iter().map(|d| d.as_str()).collect();
        for expected in ["plain", "hello", "42", "one", "two", "3"] {
            assert!(deps.contains(&expected), "missing dep {expected} in {deps:?}");
        }
    }
}

#[test]
fn fs_suite_source_collects_rejection_without_aborting_other_suites() {
    let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    fs::write(dir.path().join("good.robot"), VARIABLES_FIXTURE).unwrap_or_else(|err| panic!("write good: {err}"));
    fs::write(
        dir.path().join("bad.robot"),
        "*** Settings ***\nMetadata    medusa:deps    db\n",
    )
    .unwrap_or_else(|err| panic!("write bad: {err}"));

    let source = FsSuiteSource::new(dir.path());
    let expansion = commands::expand_all(&source, default_timeout())
        .unwrap_or_else(|err| panic!("expand_all: {err}"));

    assert_eq!(expansion.rejections.len(), 1);
    assert!(expansion.rejections[0].suite_path.as_str().ends_with("bad.robot"));
    assert_eq!(expansion.runs.len(), 3);
}
