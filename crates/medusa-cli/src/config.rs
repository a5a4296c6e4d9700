// medusa-cli/src/config.rs
// ============================================================================
// Module: Medusa Configuration
// Description: Loads `medusa.toml` scheduler-wide defaults.
// Purpose: Provide strict, fail-closed config parsing with hard size limits,
//          the same posture the teacher's own config crate applies to its
//          TOML input.
// Dependencies: medusa-core, serde, toml
// ============================================================================

//! ## Overview
//! `medusa.toml` carries scheduler-wide defaults: the default timeout triple
//! applied to Runs whose suite declares no `medusa:timeout`, the output
//! directory for merged reports, and the path to the `robot` executable.
//! Precedence is CLI flag > config file > built-in default, the same order
//! the teacher's CLI documents for its own `--config` flag.
//!
//! Missing config files are not an error — `medusa.toml` is optional and the
//! built-in defaults apply — but a config file that exists and fails to
//! parse, or declares an unknown key, is rejected outright (fail closed).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use medusa_core::model::TimeoutError;
use medusa_core::model::TimeoutSpec;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no `--config` path is given.
pub const DEFAULT_CONFIG_NAME: &str = "medusa.toml";
/// Maximum configuration file size accepted, to fail closed on runaway input.
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;
/// Built-in default soft/hard/kill timeout triple when neither the config
/// file nor a suite's `medusa:timeout` declares one.
const BUILTIN_DEFAULT_TIMEOUT: (u64, u64, u64) = (60, 120, 30);
/// Built-in default output directory for merged reports.
const BUILTIN_OUTPUT_DIR: &str = "output";
/// Built-in default `robot` executable name, resolved against `PATH`.
const BUILTIN_ROBOT_BIN: &str = "robot";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised loading `medusa.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file exceeded [`MAX_CONFIG_FILE_SIZE`].
    #[error("config file {path} is {size} bytes, exceeding the {limit} byte limit")]
    TooLarge {
        /// Path of the oversized file.
        path: PathBuf,
        /// Actual file size in bytes.
        size: u64,
        /// The enforced limit.
        limit: u64,
    },
    /// The config file failed to parse as TOML, or declared an unknown key.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// The config's `default_timeout` triple failed [`TimeoutSpec`]'s own
    /// validation (spec §3 invariants: strictly positive, `soft <= hard`).
    #[error("config default_timeout is invalid: {0}")]
    InvalidTimeout(#[source] TimeoutError),
}

// ============================================================================
// SECTION: Config
// ============================================================================

/// One `(soft, hard, kill)` timeout triple as it appears in TOML.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimeoutTriple {
    /// Seconds until the soft signal.
    soft: u64,
    /// Seconds until the hard signal.
    hard: u64,
    /// Seconds from hard until the unconditional kill.
    kill: u64,
}

/// Raw, strict deserialization target for `medusa.toml`; every field is
/// optional so a present config file need only override what it cares
/// about, but an unrecognized key is still rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    /// Scheduler-wide default timeout, applied when a suite declares none.
    default_timeout: Option<TimeoutTriple>,
    /// Directory the `run` command writes merged reports into.
    output_dir: Option<PathBuf>,
    /// Path (or `PATH`-resolved name) of the `robot` executable to spawn.
    robot_bin: Option<String>,
}

/// Medusa's scheduler-wide configuration, after CLI-flag overrides have been
/// applied on top of `medusa.toml` and the built-in defaults.
#[derive(Debug, Clone)]
pub struct MedusaConfig {
    /// Default timeout triple for Runs with no `medusa:timeout`.
    pub default_timeout: TimeoutSpec,
    /// Output directory for the `run` command's merged report.
    pub output_dir: PathBuf,
    /// The `robot` executable to spawn for each dispatched Run.
    pub robot_bin: String,
}

impl Default for MedusaConfig {
    fn default() -> Self {
        let (soft, hard, kill) = BUILTIN_DEFAULT_TIMEOUT;
        Self {
            // `BUILTIN_DEFAULT_TIMEOUT` is a compile-time constant satisfying
            // `TimeoutSpec::new`'s invariants; this can never fail.
            default_timeout: TimeoutSpec::new(soft, hard, kill)
                .unwrap_or_else(|_| unreachable_default_timeout()),
            output_dir: PathBuf::from(BUILTIN_OUTPUT_DIR),
            robot_bin: BUILTIN_ROBOT_BIN.to_string(),
        }
    }
}

/// Panics only if [`BUILTIN_DEFAULT_TIMEOUT`] is ever edited into an invalid
/// triple; guarded by `config_defaults_builtin_timeout_is_valid` below.
fn unreachable_default_timeout() -> TimeoutSpec {
    unreachable!("BUILTIN_DEFAULT_TIMEOUT must satisfy TimeoutSpec::new's invariants")
}

impl MedusaConfig {
    /// Loads configuration from `path` if given, else [`DEFAULT_CONFIG_NAME`]
    /// in the current directory if it exists, else built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicitly named path does not exist or
    /// cannot be read, if the file exceeds [`MAX_CONFIG_FILE_SIZE`], if it
    /// fails to parse or names an unknown key, or if `default_timeout` fails
    /// [`TimeoutSpec`]'s own validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = match path {
            Some(explicit) => Some(explicit.to_path_buf()),
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_NAME);
                default_path.is_file().then_some(default_path)
            }
        };

        let Some(config_path) = resolved else {
            return Ok(Self::default());
        };

        let raw = read_raw_config(&config_path)?;
        let mut config = Self::default();
        if let Some(triple) = raw.default_timeout {
            config.default_timeout = TimeoutSpec::new(triple.soft, triple.hard, triple.kill)
                .map_err(ConfigError::InvalidTimeout)?;
        }
        if let Some(output_dir) = raw.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(robot_bin) = raw.robot_bin {
            config.robot_bin = robot_bin;
        }
        Ok(config)
    }
}

/// Reads and parses one `medusa.toml` file, enforcing the size limit before
/// ever handing the bytes to the TOML parser.
fn read_raw_config(path: &Path) -> Result<RawConfig, ConfigError> {
    let metadata = fs::metadata(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::TooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            limit: MAX_CONFIG_FILE_SIZE,
        });
    }

    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
