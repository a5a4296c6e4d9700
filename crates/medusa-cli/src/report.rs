// medusa-cli/src/report.rs
// ============================================================================
// Module: Medusa Report Merger
// Description: Consolidates per-Run termination outcomes into one JSON
//              manifest, implementing `medusa-scheduler`'s `ReportMerger`.
// Purpose: The concrete "output merging / HTML report generation" boundary
//          spec §1 treats as an external collaborator — Medusa's own scope
//          ends at handing each Run's outcome to this trait; building the
//          actual Robot HTML report from the individual suite outputs is
//          explicitly out of scope (spec §1).
// Dependencies: medusa-core, medusa-scheduler, serde_json
// ============================================================================

//! ## Overview
//! Each terminated Run is recorded as one manifest entry carrying its
//! origin suite, index, stage, final bindings, [`RunOutcome`], and exit
//! status. `finalize` writes the accumulated entries as one pretty-printed
//! JSON file; merging the suites' own Robot output XML/HTML is left to
//! whatever downstream tool consumes this manifest, matching spec §1's
//! scoping of "output merging / HTML report generation" as external.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitStatus;

use serde::Serialize;
use thiserror::Error;

use medusa_core::model::Run;
use medusa_scheduler::interfaces::ReportMergeError;
use medusa_scheduler::interfaces::ReportMerger;
use medusa_scheduler::interfaces::RunOutcome;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised writing the merged JSON manifest.
#[derive(Debug, Error)]
pub enum JsonReportError {
    /// The manifest could not be serialized.
    #[error("failed to serialize report manifest: {0}")]
    Serialize(#[source] serde_json::Error),
    /// The manifest file could not be written.
    #[error("failed to write report manifest {path}: {source}")]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl From<JsonReportError> for ReportMergeError {
    fn from(error: JsonReportError) -> Self {
        Self::Merge(error.to_string())
    }
}

// ============================================================================
// SECTION: Manifest Entry
// ============================================================================

/// One Run's recorded outcome, as written to the manifest.
#[derive(Debug, Clone, Serialize)]
struct ManifestEntry {
    /// Origin suite path.
    suite_path: String,
    /// Positional index within the suite's expansion.
    index: usize,
    /// Resolved stage string.
    stage: String,
    /// Final variable bindings (`medusa:for` assignments plus bound dynamic
    /// deps).
    bindings: std::collections::BTreeMap<String, String>,
    /// Which escalation boundary the Run terminated at.
    outcome: &'static str,
    /// The child's exit code, if available and representable.
    exit_code: Option<i32>,
}

/// Maps a [`RunOutcome`] to its manifest label.
const fn outcome_label(outcome: RunOutcome) -> &'static str {
    match outcome {
        RunOutcome::ExitedClean => "exited_clean",
        RunOutcome::ExitedAfterSoft => "exited_after_soft",
        RunOutcome::KilledAtHard => "killed_at_hard",
        RunOutcome::KilledAtKill => "killed_at_kill",
    }
}

// ============================================================================
// SECTION: Report Merger
// ============================================================================

/// A [`ReportMerger`] that accumulates Run outcomes in memory and writes
/// them as one JSON manifest on [`finalize`](ReportMerger::finalize).
pub struct JsonReportMerger {
    /// Destination path for the merged manifest.
    output_path: PathBuf,
    /// Accumulated entries, in recording order.
    entries: Vec<ManifestEntry>,
}

impl JsonReportMerger {
    /// Creates a merger that will write its manifest to `output_path`.
    #[must_use]
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            entries: Vec::new(),
        }
    }

    /// Returns the accumulated entry count, for CLI summary output.
    #[must_use]
    pub fn recorded_count(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if every recorded Run exited clean or after a soft
    /// signal — the exit-code contract spec §6 names (zero unless a Run
    /// failed or was killed at the hard/kill boundary).
    #[must_use]
    pub fn all_clean(&self) -> bool {
        self.entries.iter().all(|entry| {
            matches!(entry.outcome, "exited_clean" | "exited_after_soft")
                && entry.exit_code == Some(0)
        })
    }
}

impl ReportMerger for JsonReportMerger {
    fn record(
        &mut self,
        run: &Run,
        outcome: RunOutcome,
        status: Option<ExitStatus>,
    ) -> Result<(), ReportMergeError> {
        self.entries.push(ManifestEntry {
            suite_path: run.suite_path.to_string(),
            index: run.index,
            stage: run.stage.to_string(),
            bindings: run.bindings.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            outcome: outcome_label(outcome),
            exit_code: status.and_then(|status| status.code()),
        });
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), ReportMergeError> {
        write_manifest(&self.output_path, &self.entries).map_err(Into::into)
    }
}

/// Serializes `entries` and writes them to `path`, creating any missing
/// parent directory first.
fn write_manifest(path: &Path, entries: &[ManifestEntry]) -> Result<(), JsonReportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| JsonReportError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }
    let text = serde_json::to_string_pretty(entries).map_err(JsonReportError::Serialize)?;
    fs::write(path, text).map_err(|source| JsonReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use medusa_core::model::DepSpec;
    use medusa_core::model::StageToken;
    use medusa_core::model::Suite;
    use medusa_core::model::TimeoutSpec;
    use medusa_core::model::VariableTable;
    use std::os::unix::process::ExitStatusExt;

    fn run_fixture() -> Run {
        let suite = Suite::new("t.robot", VariableTable::new());
        Run {
            suite_path: suite.origin,
            stage: StageToken::new("0"),
            deps: DepSpec::default(),
            timeout: TimeoutSpec::new(1, 2, 1).unwrap(),
            bindings: std::collections::BTreeMap::new(),
            index: 0,
        }
    }

    #[test]
    fn records_and_writes_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");
        let mut merger = JsonReportMerger::new(&path);
        merger.record(&run_fixture(), RunOutcome::ExitedClean, Some(ExitStatus::from_raw(0))).unwrap();
        assert_eq!(merger.recorded_count(), 1);
        assert!(merger.all_clean());
        merger.finalize().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0]["outcome"], "exited_clean");
        assert_eq!(parsed[0]["suite_path"], "t.robot");
    }

    #[test]
    fn killed_run_is_not_all_clean() {
        let mut merger = JsonReportMerger::new("unused.json");
        merger.record(&run_fixture(), RunOutcome::KilledAtHard, Some(ExitStatus::from_raw(9))).unwrap();
        assert!(!merger.all_clean());
    }

    #[test]
    fn exited_after_soft_with_success_status_is_all_clean() {
        let mut merger = JsonReportMerger::new("unused.json");
        merger.record(&run_fixture(), RunOutcome::ExitedAfterSoft, Some(ExitStatus::from_raw(0))).unwrap();
        assert!(merger.all_clean());
    }

    #[test]
    fn exited_after_soft_with_failure_status_is_not_all_clean() {
        let mut merger = JsonReportMerger::new("unused.json");
        merger.record(&run_fixture(), RunOutcome::ExitedAfterSoft, Some(ExitStatus::from_raw(256))).unwrap();
        assert!(!merger.all_clean());
    }
}
