// medusa-core/src/resolve.rs
// ============================================================================
// Module: Medusa Value Resolver
// Description: Substitutes variable references in metadata tokens.
// Purpose: Turn raw `${...}`/`@{...}`/`&{...}` tokens into resolved Values,
//          flattening list/dict references in place for ordinary entries and
//          recognizing the structural `ANY $X IN $LIST` dynamic-dep pattern.
// Dependencies: crate::model::value
// ============================================================================

//! ## Overview
//! The resolver is a pure function of (token(s), variable table); resolving
//! the same entry twice against the same table yields identical output
//! (spec §8 R1). It never mutates its inputs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::model::VarName;
use crate::model::Value;
use crate::model::VariableTable;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while resolving variable references.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A `${...}`/`@{...}`/`&{...}` reference named a variable that is
    /// unbound or not declared.
    #[error("unresolved variable reference: {0}")]
    UnresolvedReference(String),
    /// A `@{...}` or `&{...}` reference named a variable of the wrong shape.
    #[error("type mismatch resolving {reference}: expected {expected}, found {found}")]
    TypeMismatch {
        /// The offending reference token.
        reference: String,
        /// The shape the sigil required.
        expected: &'static str,
        /// The shape the variable table actually held.
        found: &'static str,
    },
    /// An `ANY ... IN ...` window had the right keywords but the wrong
    /// variable shapes (e.g. the pool did not resolve to a sequence).
    #[error("malformed ANY ... IN ... dependency: {0}")]
    MalformedDynChoice(String),
}

// ============================================================================
// SECTION: Single Token Resolution
// ============================================================================

/// Resolves a single raw token against a variable table.
///
/// # Errors
///
/// Returns [`ResolveError::UnresolvedReference`] when a referenced variable
/// is unbound or undeclared, or [`ResolveError::TypeMismatch`] when a
/// `@{...}`/`&{...}` sigil does not match the variable's declared shape.
pub fn resolve_token(token: &str, vars: &VariableTable) -> Result<Value, ResolveError> {
    if let Some(inner) = strip_sigil(token, "@{", "}") {
        return match lookup(inner, vars, token)? {
            Value::Sequence(seq) => Ok(Value::Sequence(seq.clone())),
            other => Err(ResolveError::TypeMismatch {
                reference: token.to_string(),
                expected: "sequence",
                found: value_shape(other),
            }),
        };
    }

    if let Some(inner) = strip_sigil(token, "&{", "}") {
        return match lookup(inner, vars, token)? {
            Value::Mapping(map) => Ok(Value::Mapping(map.clone())),
            other => Err(ResolveError::TypeMismatch {
                reference: token.to_string(),
                expected: "mapping",
                found: value_shape(other),
            }),
        };
    }

    if let Some(inner) = strip_sigil(token, "${", "}") {
        if let Ok(number) = inner.parse::<i64>() {
            return Ok(Value::Scalar(number.to_string()));
        }
        return lookup(inner, vars, token).map(Clone::clone);
    }

    if let Some(inner) = token.strip_prefix('$') {
        if !inner.is_empty() {
            return lookup(inner, vars, token).map(Clone::clone);
        }
    }

    Ok(Value::Scalar(token.to_string()))
}

/// Resolves and flattens one ordinary metadata entry (stage, timeout, or a
/// `medusa:for` source token list), expanding any list/dict reference into
/// its element strings in place.
///
/// # Errors
///
/// See [`resolve_token`].
pub fn resolve_entry(entry: &[String], vars: &VariableTable) -> Result<Vec<String>, ResolveError> {
    let mut out = Vec::with_capacity(entry.len());
    for token in entry {
        let value = resolve_token(token, vars)?;
        if value.is_unbound() {
            return Err(ResolveError::UnresolvedReference(token.clone()));
        }
        out.extend(value.flatten());
    }
    Ok(out)
}

// ============================================================================
// SECTION: Dependency Entry Resolution
// ============================================================================

/// One resolved token of a `medusa:deps` entry: either a literal dependency
/// string, or a structurally recognized `ANY $VAR IN $LIST` dynamic choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedDepToken {
    /// A literal, already-flattened dependency string.
    Literal(String),
    /// A dynamic dependency choice recognized from an `ANY ... IN ...` window.
    AnyIn {
        /// The dynamic-dep variable name (`$VAR`).
        var_name: VarName,
        /// The pool of candidate tokens, in declared order.
        options: Vec<String>,
    },
}

/// Resolves one `medusa:deps` entry, recognizing `ANY $VAR IN $LIST` windows
/// structurally instead of flattening them, and flattening every other token
/// (including ordinary list/dict references) in place.
///
/// # Errors
///
/// Returns [`ResolveError::MalformedDynChoice`] when an `ANY ... IN ...`
/// window's variable shapes do not match (the pool must resolve to a
/// sequence); otherwise see [`resolve_token`].
pub fn resolve_deps_entry(
    entry: &[String],
    vars: &VariableTable,
) -> Result<Vec<ResolvedDepToken>, ResolveError> {
    let mut out = Vec::new();
    let mut index = 0;
    while index < entry.len() {
        if is_any_in_window(entry, index) {
            let var_token = &entry[index + 1];
            let list_token = &entry[index + 3];
            let var_name = extract_bare_var_name(var_token).ok_or_else(|| {
                ResolveError::MalformedDynChoice(format!(
                    "expected a scalar variable reference, found {var_token}"
                ))
            })?;
            let options = match resolve_token(list_token, vars)? {
                Value::Sequence(seq) => seq,
                other => {
                    return Err(ResolveError::TypeMismatch {
                        reference: list_token.clone(),
                        expected: "sequence",
                        found: value_shape(&other),
                    })
                }
            };
            out.push(ResolvedDepToken::AnyIn {
                var_name: VarName::new(var_name),
                options,
            });
            index += 4;
            continue;
        }

        let value = resolve_token(&entry[index], vars)?;
        if value.is_unbound() {
            return Err(ResolveError::UnresolvedReference(entry[index].clone()));
        }
        out.extend(value.flatten().into_iter().map(ResolvedDepToken::Literal));
        index += 1;
    }
    Ok(out)
}

/// Returns true when `entry[index..]` begins with an `ANY ... IN ...` window.
fn is_any_in_window(entry: &[String], index: usize) -> bool {
    entry.len() >= index + 4 && entry[index] == "ANY" && entry[index + 2] == "IN"
}

/// Extracts the bare variable name from a scalar reference token (`$X` or
/// `${X}`), without performing a lookup — the dynamic-dep variable is
/// expected to be [`Value::Unbound`] in the table until dispatch binds it.
fn extract_bare_var_name(token: &str) -> Option<String> {
    if let Some(inner) = strip_sigil(token, "${", "}") {
        return Some(inner.to_string());
    }
    token.strip_prefix('$').map(ToString::to_string)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Strips a `prefix ... suffix` sigil, returning the inner text if present.
fn strip_sigil<'a>(token: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    token.strip_prefix(prefix)?.strip_suffix(suffix)
}

/// Looks up a variable name, mapping a missing/unbound entry to
/// [`ResolveError::UnresolvedReference`] tagged with the original token.
fn lookup<'a>(
    name: &str,
    vars: &'a VariableTable,
    original_token: &str,
) -> Result<&'a Value, ResolveError> {
    match vars.get(&VarName::new(name)) {
        Some(value) if !value.is_unbound() => Ok(value),
        _ => Err(ResolveError::UnresolvedReference(original_token.to_string())),
    }
}

/// Returns a label describing a `Value`'s shape, for type-mismatch errors.
const fn value_shape(value: &Value) -> &'static str {
    match value {
        Value::Scalar(_) => "scalar",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Unbound => "unbound",
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
