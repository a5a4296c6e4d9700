// medusa-cli/src/suite_loader.rs
// ============================================================================
// Module: Medusa Suite Loader
// Description: Reads `medusa:*` metadata and variable tables out of Robot
//              Framework suite files on disk.
// Purpose: Provide the concrete `SuiteSource` implementation standing in for
//          spec §6's "external Robot Framework parser" — there is no Rust
//          crate for Robot's own suite format, so the CLI carries a minimal,
//          self-contained reader of the subset spec §4.1/§8 fixtures use:
//          the `*** Settings ***` `Metadata` table and the `*** Variables
//          ***` table.
// Dependencies: medusa-core, medusa-scheduler
// ============================================================================

//! ## Overview
//! Robot Framework suite files are plain text, divided into `*** Section
//! ***` headers; cells within a row are separated by two or more spaces (or
//! a tab), Robot's own convention for distinguishing cell boundaries from
//! incidental whitespace inside a value. This loader only reads the two
//! sections Medusa's core cares about:
//!
//! - `*** Settings ***`: `Metadata    medusa:<key>    <tokens...>` rows feed
//!   [`Suite::push_metadata`].
//! - `*** Variables ***`: `${NAME}`/`@{NAME}`/`&{NAME}` rows feed the
//!   suite's [`VariableTable`]; a scalar row with no value cell declares the
//!   variable `Unbound` (Robot Framework's `None`), which is what
//!   `medusa:for` targets and dynamic-dep variables must be before a Run's
//!   own bindings are overlaid (spec §3 invariant).
//!
//! Everything else (`*** Test Cases ***`, `*** Keywords ***`, `*** Tasks
//! ***`, non-`medusa:*` `Metadata` rows, and non-`Metadata` Settings rows)
//! is read past without interpretation — this loader only extracts what the
//! scheduling core consumes, exactly as spec §6 scopes the suite boundary.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

use medusa_core::model::Suite;
use medusa_core::model::Value;
use medusa_core::model::VariableTable;
use medusa_scheduler::interfaces::SuiteSource;
use medusa_scheduler::interfaces::SuiteSourceError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised reading or parsing suite files from disk.
#[derive(Debug, Error)]
pub enum SuiteLoadError {
    /// The root directory could not be walked.
    #[error("failed to read suite directory {path}: {source}")]
    Walk {
        /// Directory that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A `.robot` file could not be read.
    #[error("failed to read suite file {path}: {source}")]
    Read {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A `&{NAME}` row declared a cell with no `key=value` separator.
    #[error("{path}: dict variable {name} has a malformed entry: {entry:?}")]
    MalformedDictEntry {
        /// File containing the offending row.
        path: PathBuf,
        /// The dict variable's name.
        name: String,
        /// The offending cell.
        entry: String,
    },
}

impl From<SuiteLoadError> for SuiteSourceError {
    fn from(error: SuiteLoadError) -> Self {
        Self::Source(error.to_string())
    }
}

// ============================================================================
// SECTION: Cell Splitting
// ============================================================================

/// Splits one suite line into Robot Framework cells: runs of two or more
/// spaces (or any tab) separate cells, a single space does not.
fn split_cells(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut space_run = 0usize;

    for ch in line.chars() {
        if ch == '\t' {
            if !current.is_empty() || space_run > 0 {
                cells.push(std::mem::take(&mut current));
            }
            space_run = 0;
            continue;
        }
        if ch == ' ' {
            space_run += 1;
            if space_run >= 2 {
                if !current.is_empty() {
                    cells.push(std::mem::take(&mut current));
                }
                continue;
            }
            current.push(ch);
            continue;
        }
        space_run = 0;
        current.push(ch);
    }
    if !current.trim().is_empty() {
        cells.push(current);
    }
    cells.into_iter().map(|cell| cell.trim().to_string()).filter(|cell| !cell.is_empty()).collect()
}

/// The suite section a row belongs to, as far as this loader cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    /// `*** Settings ***`.
    Settings,
    /// `*** Variables ***`.
    Variables,
    /// Any other recognized or unrecognized section header.
    Other,
}

/// Recognizes a `*** Section Name ***` header row, case-insensitively.
fn section_header(line: &str) -> Option<Section> {
    let trimmed = line.trim();
    if !trimmed.starts_with("***") || !trimmed.ends_with("***") {
        return None;
    }
    let name = trimmed.trim_matches('*').trim().to_ascii_lowercase();
    Some(match name.as_str() {
        "settings" => Section::Settings,
        "variables" => Section::Variables,
        _ => Section::Other,
    })
}

// ============================================================================
// SECTION: Variable Row Parsing
// ============================================================================

/// Parses one `*** Variables ***` row into a `(name, Value)` pair, or `None`
/// if the row's first cell carries no recognized sigil (a continuation row
/// this loader does not support is silently skipped, matching the scope of
/// spec §8's fixtures, which never span a declaration across rows).
fn parse_variable_row(path: &Path, cells: &[String]) -> Result<Option<(String, Value)>, SuiteLoadError> {
    let Some(first) = cells.first() else {
        return Ok(None);
    };
    let rest = &cells[1..];

    if let Some(name) = first.strip_prefix('&').and_then(|s| s.strip_prefix('{')).and_then(|s| s.strip_suffix('}'))
    {
        let mut entries = Vec::with_capacity(rest.len());
        for entry in rest {
            let Some((key, value)) = entry.split_once('=') else {
                return Err(SuiteLoadError::MalformedDictEntry {
                    path: path.to_path_buf(),
                    name: name.to_string(),
                    entry: entry.clone(),
                });
            };
            entries.push((key.to_string(), value.to_string()));
        }
        return Ok(Some((name.to_string(), Value::Mapping(entries))));
    }

    if let Some(name) = first.strip_prefix('@').and_then(|s| s.strip_prefix('{')).and_then(|s| s.strip_suffix('}'))
    {
        return Ok(Some((name.to_string(), Value::Sequence(rest.to_vec()))));
    }

    if let Some(name) = first.strip_prefix('$').and_then(|s| s.strip_prefix('{')).and_then(|s| s.strip_suffix('}'))
    {
        // A scalar spanning multiple cells joins with a single space, Robot
        // Framework's own rule for continuation cells on a `${...}` row.
        let value = if rest.is_empty() { Value::Unbound } else { Value::Scalar(rest.join(" ")) };
        return Ok(Some((name.to_string(), value)));
    }

    Ok(None)
}

// ============================================================================
// SECTION: Suite Parsing
// ============================================================================

/// Parses one suite file's text into a [`Suite`].
///
/// # Errors
///
/// Returns [`SuiteLoadError::MalformedDictEntry`] if a `&{NAME}` row
/// contains a cell with no `=` separator.
pub fn parse_suite(origin: &Path, text: &str) -> Result<Suite, SuiteLoadError> {
    let mut variables = VariableTable::new();
    let mut metadata_rows: Vec<(String, Vec<String>)> = Vec::new();
    let mut section = Section::Other;

    for line in text.lines() {
        if let Some(next_section) = section_header(line) {
            section = next_section;
            continue;
        }
        let cells = split_cells(line);
        if cells.is_empty() {
            continue;
        }

        match section {
            Section::Settings => {
                if cells[0].eq_ignore_ascii_case("metadata") && cells.len() >= 2 {
                    if let Some(key) = cells[1].strip_prefix("medusa:") {
                        metadata_rows.push((key.to_string(), cells[2..].to_vec()));
                    }
                }
            }
            Section::Variables => {
                if let Some((name, value)) = parse_variable_row(origin, &cells)? {
                    variables.insert(name, value);
                }
            }
            Section::Other => {}
        }
    }

    let mut suite = Suite::new(origin.to_string_lossy().to_string(), variables);
    for (key, entry) in metadata_rows {
        suite.push_metadata(key, entry);
    }
    Ok(suite)
}

// ============================================================================
// SECTION: Filesystem Suite Source
// ============================================================================

/// A [`SuiteSource`] that recursively discovers `*.robot` files under a root
/// directory and parses each with [`parse_suite`].
pub struct FsSuiteSource {
    /// Root directory to walk for `*.robot` files.
    root: PathBuf,
}

impl FsSuiteSource {
    /// Creates a suite source rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Recursively collects every `*.robot` file path under `root`, in
    /// directory-read order (not sorted — determinism of overall dispatch
    /// order comes from the Scheduler's stage/queue ordering, not suite
    /// discovery order).
    fn discover(&self, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), SuiteLoadError> {
        let entries = fs::read_dir(dir).map_err(|source| SuiteLoadError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| SuiteLoadError::Walk {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.is_dir() {
                self.discover(&path, out)?;
            } else if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("robot")) {
                out.push(path);
            }
        }
        Ok(())
    }
}

impl SuiteSource for FsSuiteSource {
    fn suites(&self) -> Result<Vec<Suite>, SuiteSourceError> {
        let mut paths = Vec::new();
        self.discover(&self.root, &mut paths)?;
        paths.sort();

        let mut suites = Vec::with_capacity(paths.len());
        for path in paths {
            let text = fs::read_to_string(&path).map_err(|source| SuiteLoadError::Read {
                path: path.clone(),
                source,
            })?;
            suites.push(parse_suite(&path, &text)?);
        }
        Ok(suites)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_two_or_more_spaces_not_one() {
        let cells = split_cells("Metadata    medusa:deps    plain    one two");
        assert_eq!(cells, vec!["Metadata", "medusa:deps", "plain", "one two"]);
    }

    #[test]
    fn splits_on_tabs() {
        let cells = split_cells("Metadata\tmedusa:stage\tunit");
        assert_eq!(cells, vec!["Metadata", "medusa:stage", "unit"]);
    }

    #[test]
    fn parses_metadata_and_variables() {
        let text = "\
*** Settings ***
Metadata    medusa:stage    unit
Metadata    medusa:deps    plain    ${SCALAR}    @{LIST}

*** Variables ***
${SCALAR}    hello
@{LIST}    one    two    3
&{ENV_MAP}    dev=10    prod=20
${DYN_TARGET}
";
        let suite = parse_suite(Path::new("t.robot"), text).unwrap();
        assert_eq!(suite.entries_for("stage"), &[vec!["unit".to_string()]]);
        assert_eq!(
            suite.entries_for("deps"),
            &[vec!["plain".to_string(), "${SCALAR}".to_string(), "@{LIST}".to_string()]]
        );
        assert_eq!(
            suite.variables.get(&medusa_core::model::VarName::new("SCALAR")),
            Some(&Value::Scalar("hello".to_string()))
        );
        assert_eq!(
            suite.variables.get(&medusa_core::model::VarName::new("LIST")),
            Some(&Value::Sequence(vec!["one".to_string(), "two".to_string(), "3".to_string()]))
        );
        assert_eq!(
            suite.variables.get(&medusa_core::model::VarName::new("ENV_MAP")),
            Some(&Value::Mapping(vec![
                ("dev".to_string(), "10".to_string()),
                ("prod".to_string(), "20".to_string())
            ]))
        );
        assert_eq!(
            suite.variables.get(&medusa_core::model::VarName::new("DYN_TARGET")),
            Some(&Value::Unbound)
        );
    }

    #[test]
    fn ignores_non_medusa_metadata_and_other_sections() {
        let text = "\
*** Settings ***
Metadata    owner    someone
Library    Collections

*** Test Cases ***
Example
    Log    hello
";
        let suite = parse_suite(Path::new("t.robot"), text).unwrap();
        assert!(suite.metadata.is_empty());
    }

    #[test]
    fn malformed_dict_entry_is_an_error() {
        let text = "\
*** Variables ***
&{BAD}    not_a_pair
";
        let err = parse_suite(Path::new("t.robot"), text).unwrap_err();
        assert!(matches!(err, SuiteLoadError::MalformedDictEntry { .. }));
    }
}
