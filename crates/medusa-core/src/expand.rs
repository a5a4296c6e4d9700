// medusa-core/src/expand.rs
// ============================================================================
// Module: Medusa Run Expander
// Description: Turns one suite's resolved metadata into its concrete Runs.
// Purpose: Parse `medusa:for`, iterate its resolved source, and re-resolve
//          stage/deps/timeout once per iteration with the per-iteration
//          binding overlay applied.
// Dependencies: crate::model, crate::metadata, crate::resolve
// ============================================================================

//! ## Overview
//! A suite with no `medusa:for` expands to exactly one Run (spec §4.3). A
//! suite with `medusa:for T1 .. Tk IN <source>` expands to one Run per
//! iteration element of the resolved source, each carrying its own
//! `bindings` overlay before stage/deps/timeout are re-resolved.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;

use crate::deps::classify_deps;
use crate::metadata::RawMetadata;
use crate::model::ForClause;
use crate::model::Run;
use crate::model::StageToken;
use crate::model::Suite;
use crate::model::TimeoutError;
use crate::model::TimeoutSpec;
use crate::model::VarName;
use crate::model::Value;
use crate::resolve::resolve_deps_entry;
use crate::resolve::resolve_entry;
use crate::resolve::ResolveError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while expanding a suite's metadata into Runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExpandError {
    /// A token in the resolver pipeline failed to resolve.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// A `medusa:timeout` triple failed `TimeoutSpec`'s own validation.
    #[error(transparent)]
    Timeout(#[from] TimeoutError),
    /// `medusa:timeout`'s three comma-separated fields did not parse as
    /// non-negative integers.
    #[error("medusa:timeout fields must be non-negative integers: {0}")]
    TimeoutNotInteger(String),
    /// The resolved `medusa:for` source did not match any of the four
    /// recognized iteration shapes for the declared target arity.
    #[error(
        "medusa:for source has {elements} element(s) of shape {shape}, incompatible with \
         {targets} target(s)"
    )]
    InvalidIterationShape {
        /// Number of elements the resolved source produced.
        elements: usize,
        /// A short label for the source's resolved shape.
        shape: &'static str,
        /// Declared target arity (`medusa:for`'s target count).
        targets: usize,
    },
    /// A sequence-of-sequences iteration shape had an element whose arity
    /// did not match the declared target arity.
    #[error("medusa:for iteration element {index} has arity {found}, expected {expected}")]
    ForArityMismatch {
        /// Index of the offending iteration element.
        index: usize,
        /// The element's actual arity.
        found: usize,
        /// The declared target arity.
        expected: usize,
    },
    /// A `medusa:for` target or dynamic-dep variable was already bound to a
    /// non-`Unbound` value in the suite's own variable table (spec §3
    /// invariant, §7 `TargetNotNone`).
    #[error(
        "variable {0} is used as a medusa:for target or dynamic-dep variable but is already \
         bound in the suite's variable table"
    )]
    TargetNotNone(VarName),
}

// ============================================================================
// SECTION: For-Clause Parsing
// ============================================================================

/// Parses a raw `medusa:for` entry (already validated to contain the literal
/// `IN` separator by the Metadata Reader) into targets and a source token.
///
/// The entry shape is `T1 .. Tk IN <source>`: every token before `IN` is a
/// target variable name, and exactly one token follows `IN`.
fn parse_for_clause(entry: &[String]) -> ForClause {
    let in_index = entry.iter().position(|token| token == "IN").unwrap_or(entry.len());
    let targets = entry[..in_index]
        .iter()
        .map(|name| VarName::new(name.clone()))
        .collect();
    let source_token = entry.get(in_index + 1).cloned().unwrap_or_default();
    ForClause {
        targets,
        source_token,
    }
}

// ============================================================================
// SECTION: Iteration Shape
// ============================================================================

/// One iteration's binding overlay: target variable name to bound string.
type IterationBindings = BTreeMap<VarName, String>;

/// Resolves `medusa:for`'s source and splits it into one binding overlay per
/// iteration, per spec §4.3's four iteration shape rules.
///
/// # Errors
///
/// Returns [`ExpandError::InvalidIterationShape`] or
/// [`ExpandError::ForArityMismatch`] when the resolved source's shape is
/// incompatible with the declared target arity.
fn iteration_bindings(
    clause: &ForClause,
    source: &Value,
) -> Result<Vec<IterationBindings>, ExpandError> {
    let arity = clause.arity();

    match source {
        Value::Mapping(entries) if arity == 2 => Ok(entries
            .iter()
            .map(|(key, value)| {
                let mut bindings = IterationBindings::new();
                bindings.insert(clause.targets[0].clone(), key.clone());
                bindings.insert(clause.targets[1].clone(), value.clone());
                bindings
            })
            .collect()),
        Value::Mapping(entries) => Err(ExpandError::InvalidIterationShape {
            elements: entries.len(),
            shape: "mapping",
            targets: arity,
        }),

        Value::Sequence(elements) if arity == 1 => Ok(elements
            .iter()
            .map(|element| {
                let mut bindings = IterationBindings::new();
                bindings.insert(clause.targets[0].clone(), element.clone());
                bindings
            })
            .collect()),
        Value::Sequence(elements) => {
            // Each element must itself split into exactly `arity` fields,
            // joined the same way a Robot Framework list-of-tuples would be
            // represented: as a single string with `,` separating fields.
            elements
                .iter()
                .enumerate()
                .map(|(index, element)| {
                    let fields: Vec<&str> = element.split(',').collect();
                    if fields.len() != arity {
                        return Err(ExpandError::ForArityMismatch {
                            index,
                            found: fields.len(),
                            expected: arity,
                        });
                    }
                    let mut bindings = IterationBindings::new();
                    for (target, field) in clause.targets.iter().zip(fields) {
                        bindings.insert(target.clone(), field.to_string());
                    }
                    Ok(bindings)
                })
                .collect()
        }

        Value::Scalar(scalar) if arity == 1 => {
            let mut bindings = IterationBindings::new();
            bindings.insert(clause.targets[0].clone(), scalar.clone());
            Ok(vec![bindings])
        }
        Value::Scalar(_) => Err(ExpandError::InvalidIterationShape {
            elements: 1,
            shape: "scalar",
            targets: arity,
        }),

        Value::Unbound => Err(ExpandError::InvalidIterationShape {
            elements: 0,
            shape: "unbound",
            targets: arity,
        }),
    }
}

// ============================================================================
// SECTION: Timeout Resolution
// ============================================================================

/// Resolves a `medusa:timeout` entry's single comma-separated triple.
///
/// # Errors
///
/// Returns [`ExpandError::TimeoutNotInteger`] if a field is not a
/// non-negative integer, or propagates [`TimeoutError`] from
/// [`TimeoutSpec::new`].
fn resolve_timeout(
    entry: &[String],
    vars: &crate::model::VariableTable,
) -> Result<TimeoutSpec, ExpandError> {
    let resolved = resolve_entry(entry, vars)?;
    let joined = resolved.join("");
    let fields: Vec<&str> = joined.split(',').collect();
    if fields.len() != 3 {
        return Err(ExpandError::TimeoutNotInteger(joined));
    }
    let mut parsed = [0u64; 3];
    for (slot, field) in parsed.iter_mut().zip(&fields) {
        *slot = field
            .trim()
            .parse()
            .map_err(|_| ExpandError::TimeoutNotInteger(joined.clone()))?;
    }
    Ok(TimeoutSpec::new(parsed[0], parsed[1], parsed[2])?)
}

// ============================================================================
// SECTION: Expansion
// ============================================================================

/// Expands one suite's already-read metadata into its concrete Runs.
///
/// # Errors
///
/// Returns [`ExpandError`] if any stage/deps/timeout/for token fails to
/// resolve, or if `medusa:for`'s resolved source is shaped incompatibly with
/// its declared target arity.
pub fn expand_runs(
    suite: &Suite,
    metadata: &RawMetadata,
    default_timeout: TimeoutSpec,
) -> Result<Vec<Run>, ExpandError> {
    let iterations: Vec<IterationBindings> = match &metadata.for_clause {
        None => vec![IterationBindings::new()],
        Some(entry) => {
            let clause = parse_for_clause(entry);
            for target in &clause.targets {
                require_unbound(suite, target)?;
            }
            let source = crate::resolve::resolve_token(&clause.source_token, &suite.variables)?;
            iteration_bindings(&clause, &source)?
        }
    };

    let mut runs = Vec::with_capacity(iterations.len());
    for (index, bindings) in iterations.into_iter().enumerate() {
        let overlaid = suite.variables.overlay(&bindings);

        let stage_tokens = resolve_entry(&metadata.stage, &overlaid)?;
        let stage = StageToken::new(stage_tokens.join(""));

        let deps_entries = metadata
            .deps
            .iter()
            .map(|entry| resolve_deps_entry(entry, &overlaid))
            .collect::<Result<Vec<_>, _>>()?;
        let deps = classify_deps(&deps_entries);

        if index == 0 {
            for choice in &deps.dynamic {
                require_unbound(suite, &VarName::new(choice.var_name.as_str()))?;
            }
        }

        let timeout = match &metadata.timeout {
            Some(entry) => resolve_timeout(entry, &overlaid)?,
            None => default_timeout,
        };

        runs.push(Run {
            suite_path: suite.origin.clone(),
            stage,
            deps,
            timeout,
            bindings,
            index,
        });
    }

    Ok(runs)
}

/// Rejects a `medusa:for` target or dynamic-dep variable that the suite's
/// own variable table already binds to a non-`Unbound` value (spec §3
/// invariant, §7 `TargetNotNone`): such a variable could never receive its
/// per-iteration or per-dispatch binding, since the suite author already
/// gave it a fixed value.
fn require_unbound(suite: &Suite, name: &VarName) -> Result<(), ExpandError> {
    match suite.variables.get(name) {
        Some(value) if !matches!(value, Value::Unbound) => {
            Err(ExpandError::TargetNotNone(name.clone()))
        }
        _ => Ok(()),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Suite;
    use crate::model::VariableTable;

    fn default_timeout() -> TimeoutSpec {
        TimeoutSpec::new(30, 60, 10).unwrap()
    }

    fn metadata_with(
        stage: &[&str],
        deps: Vec<Vec<&str>>,
        for_clause: Option<Vec<&str>>,
        timeout: Option<Vec<&str>>,
    ) -> RawMetadata {
        RawMetadata {
            stage: stage.iter().map(|s| s.to_string()).collect(),
            deps: deps
                .into_iter()
                .map(|entry| entry.into_iter().map(String::from).collect())
                .collect(),
            for_clause: for_clause
                .map(|entry| entry.into_iter().map(String::from).collect()),
            timeout: timeout.map(|entry| entry.into_iter().map(String::from).collect()),
        }
    }

    #[test]
    fn suite_without_for_clause_expands_to_one_run() {
        let suite = Suite::new("t.robot", VariableTable::new());
        let metadata = metadata_with(&["unit"], vec![vec!["db"]], None, None);
        let runs = expand_runs(&suite, &metadata, default_timeout()).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].stage.as_str(), "unit");
        assert_eq!(runs[0].index, 0);
        assert!(runs[0].bindings.is_empty());
    }

    #[test]
    fn for_clause_over_sequence_yields_one_run_per_element() {
        let mut vars = VariableTable::new();
        vars.insert(
            "HOSTS",
            Value::Sequence(vec!["a".to_string(), "b".to_string(), "c".to_string()]),
        );
        let suite = Suite::new("t.robot", vars);
        let metadata = metadata_with(
            &["unit"],
            vec![vec!["db"]],
            Some(vec!["HOST", "IN", "@{HOSTS}"]),
            None,
        );
        let runs = expand_runs(&suite, &metadata, default_timeout()).unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[1].bindings.get(&VarName::new("HOST")).unwrap(), "b");
    }

    #[test]
    fn for_clause_over_mapping_binds_key_and_value() {
        let mut vars = VariableTable::new();
        vars.insert(
            "ENV_MAP",
            Value::Mapping(vec![
                ("dev".to_string(), "10".to_string()),
                ("prod".to_string(), "20".to_string()),
            ]),
        );
        let suite = Suite::new("t.robot", vars);
        let metadata = metadata_with(
            &["unit"],
            vec![vec!["db"]],
            Some(vec!["NAME", "REPLICAS", "IN", "&{ENV_MAP}"]),
            None,
        );
        let runs = expand_runs(&suite, &metadata, default_timeout()).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].bindings.get(&VarName::new("NAME")).unwrap(), "dev");
        assert_eq!(runs[0].bindings.get(&VarName::new("REPLICAS")).unwrap(), "10");
    }

    #[test]
    fn timeout_entry_overrides_default() {
        let suite = Suite::new("t.robot", VariableTable::new());
        let metadata = metadata_with(
            &["unit"],
            vec![vec!["db"]],
            None,
            Some(vec!["5,15,3"]),
        );
        let runs = expand_runs(&suite, &metadata, default_timeout()).unwrap();
        assert_eq!(runs[0].timeout, TimeoutSpec::new(5, 15, 3).unwrap());
    }

    #[test]
    fn dynamic_dep_window_survives_expansion() {
        let mut vars = VariableTable::new();
        vars.insert(
            "PORTS",
            Value::Sequence(vec!["8080".to_string(), "8081".to_string()]),
        );
        let suite = Suite::new("t.robot", vars);
        let metadata = metadata_with(
            &["unit"],
            vec![vec!["ANY", "$PORT", "IN", "$PORTS"]],
            None,
            None,
        );
        let runs = expand_runs(&suite, &metadata, default_timeout()).unwrap();
        assert_eq!(runs[0].deps.dynamic.len(), 1);
        assert_eq!(runs[0].deps.dynamic[0].var_name, VarName::new("PORT"));
    }

    #[test]
    fn for_target_already_bound_is_an_error() {
        let mut vars = VariableTable::new();
        vars.insert("HOST", Value::Scalar("fixed".to_string()));
        vars.insert(
            "HOSTS",
            Value::Sequence(vec!["a".to_string(), "b".to_string()]),
        );
        let suite = Suite::new("t.robot", vars);
        let metadata = metadata_with(
            &["unit"],
            vec![vec!["db"]],
            Some(vec!["HOST", "IN", "@{HOSTS}"]),
            None,
        );
        assert!(matches!(
            expand_runs(&suite, &metadata, default_timeout()),
            Err(ExpandError::TargetNotNone(name)) if name.as_str() == "HOST"
        ));
    }

    #[test]
    fn dynamic_dep_variable_already_bound_is_an_error() {
        let mut vars = VariableTable::new();
        vars.insert("PORT", Value::Scalar("9999".to_string()));
        vars.insert(
            "PORTS",
            Value::Sequence(vec!["8080".to_string(), "8081".to_string()]),
        );
        let suite = Suite::new("t.robot", vars);
        let metadata = metadata_with(
            &["unit"],
            vec![vec!["ANY", "$PORT", "IN", "$PORTS"]],
            None,
            None,
        );
        assert!(matches!(
            expand_runs(&suite, &metadata, default_timeout()),
            Err(ExpandError::TargetNotNone(name)) if name.as_str() == "PORT"
        ));
    }

    #[test]
    fn scalar_for_source_with_arity_above_one_is_an_error() {
        let mut vars = VariableTable::new();
        vars.insert("HOST", Value::Scalar("a".to_string()));
        let suite = Suite::new("t.robot", vars);
        let metadata = metadata_with(
            &["unit"],
            vec![vec!["db"]],
            Some(vec!["A", "B", "IN", "$HOST"]),
            None,
        );
        assert!(matches!(
            expand_runs(&suite, &metadata, default_timeout()),
            Err(ExpandError::InvalidIterationShape { .. })
        ));
    }
}
