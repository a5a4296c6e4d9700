// medusa-core/src/model/mod.rs
// ============================================================================
// Module: Medusa Data Model
// Description: Canonical types shared by every pipeline stage.
// Purpose: Provide stable, serializable types for suites, values, and Runs.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The data model defines `Value`, `Suite`, `ForClause`, `Run`, and `DepSpec`
//! exactly as spec §3 describes them. These types are the canonical source of
//! truth for every other module in this crate and for `medusa-scheduler`.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod for_clause;
pub mod ids;
pub mod run;
pub mod suite;
pub mod value;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use for_clause::ForClause;
pub use ids::DepToken;
pub use ids::StageToken;
pub use ids::SuitePath;
pub use ids::VarName;
pub use run::DepSpec;
pub use run::DynChoice;
pub use run::Run;
pub use run::TimeoutError;
pub use run::TimeoutSpec;
pub use suite::MetadataEntry;
pub use suite::MetadataKey;
pub use suite::Suite;
pub use value::Value;
pub use value::VariableTable;
