// medusa-cli/src/lib.rs
// ============================================================================
// Module: Medusa CLI Library
// Description: Shared helpers for the Medusa command-line interface.
// Purpose: Provide the config loader, suite loader, process runner, report
//          merger, and command implementations the `medusa` binary dispatches
//          to, in a form `tests/*.rs` can also exercise directly.
// Dependencies: medusa-core, medusa-scheduler, clap, serde, toml, tokio.
// ============================================================================

//! # medusa-cli
//!
//! This crate is the ambient stack around `medusa-core` and
//! `medusa-scheduler`: a config file loader, a concrete `SuiteSource` that
//! reads `medusa:*` metadata and variable tables out of Robot Framework
//! suite files, a `ProcessRunner` that actually spawns `robot`, a
//! `ReportMerger` that writes a consolidated JSON manifest, and the
//! `stats`/`run` subcommands spec §6 names.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Config file loading (`medusa.toml`) with CLI-flag override precedence.
pub mod config;
/// `stats`/`run` command implementations, callable from `main.rs` and tests.
pub mod commands;
/// The `ProcessRunner`/`ProcessHandle` implementation that spawns `robot`.
pub mod process;
/// The `ReportMerger` implementation that writes a consolidated JSON manifest.
pub mod report;
/// The `SuiteSource` implementation that reads `medusa:*` metadata and
/// variable tables out of Robot Framework suite files on disk.
pub mod suite_loader;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::MedusaConfig;
pub use process::RobotProcessRunner;
pub use report::JsonReportMerger;
pub use suite_loader::FsSuiteSource;
pub use suite_loader::SuiteLoadError;
