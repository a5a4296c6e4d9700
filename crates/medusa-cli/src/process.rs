// medusa-cli/src/process.rs
// ============================================================================
// Module: Medusa Process Runner
// Description: Spawns `robot` child processes and delivers escalation
//              signals, implementing `medusa-scheduler`'s `ProcessRunner`
//              and `ProcessHandle` traits.
// Purpose: The concrete subprocess/IO mechanics spec §1 names as an external
//          collaborator and spec §6 specifies the variable-injection
//          contract for.
// Dependencies: medusa-core, medusa-scheduler, tokio
// ============================================================================

//! ## Overview
//! `robot` itself is invoked once per dispatched Run, with one `--variable`
//! argument per `bindings` entry plus the three `MEDUSA_*` suite-level
//! variables and the `--metadata` overrides spec §6 names. On Unix, the
//! three escalation signals (spec §9) map to `SIGINT` (soft, cooperative
//! teardown), `SIGTERM` (hard, forced termination), and `SIGKILL`
//! (unconditional kill); `SIGINT`/`SIGTERM` are delivered through the `kill`
//! utility rather than an `unsafe` direct syscall, keeping this crate free
//! of `unsafe_code` like the rest of the workspace. Non-Unix targets collapse
//! the soft signal straight into the hard kill, since there is no portable
//! cooperative-teardown signal to send.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::process::ExitStatus;
use std::process::Stdio;

use async_trait::async_trait;

use medusa_core::model::Run;
use medusa_scheduler::interfaces::ProcessError;
use medusa_scheduler::interfaces::ProcessHandle;
use medusa_scheduler::interfaces::ProcessRunner;
use medusa_scheduler::interfaces::Signal;

// ============================================================================
// SECTION: Process Runner
// ============================================================================

/// Spawns one `robot` child process per dispatched [`Run`].
pub struct RobotProcessRunner {
    /// Path (or `PATH`-resolved name) of the `robot` executable.
    robot_bin: String,
    /// Output directory passed to `robot --outputdir`.
    output_dir: std::path::PathBuf,
    /// Extra arguments forwarded verbatim after Medusa's own injected
    /// arguments (the CLI's `--` passthrough, spec §6).
    passthrough_args: Vec<String>,
}

impl RobotProcessRunner {
    /// Creates a runner that spawns `robot_bin`, writing output under
    /// `output_dir`, forwarding `passthrough_args` after Medusa's own
    /// injected variable and metadata overrides.
    #[must_use]
    pub fn new(
        robot_bin: impl Into<String>,
        output_dir: impl Into<std::path::PathBuf>,
        passthrough_args: Vec<String>,
    ) -> Self {
        Self {
            robot_bin: robot_bin.into(),
            output_dir: output_dir.into(),
            passthrough_args,
        }
    }

    /// Builds the full `robot` argument list for one dispatched Run (spec
    /// §6 variable-injection contract).
    fn build_args(&self, run: &Run, effective_deps: &[String], for_bindings: &BTreeMap<String, String>) -> Vec<String> {
        let mut args = Vec::new();

        for (name, value) in &run.bindings {
            args.push("--variable".to_string());
            args.push(format!("{name}:{value}"));
        }

        args.push("--variable".to_string());
        args.push(format!("MEDUSA_STAGE:{}", run.stage));

        args.push("--variable".to_string());
        args.push(format!("MEDUSA_DEPS:{}", effective_deps.join(":")));

        let for_joined =
            for_bindings.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(":");
        args.push("--variable".to_string());
        args.push(format!("MEDUSA_FOR:{for_joined}"));

        // Spec §6: "The resolved medusa:deps suite metadata rewritten as a
        // single string joining the effective deps with exactly four
        // spaces" — a `--metadata` override distinct from the `MEDUSA_DEPS`
        // variable above. Robot's `--metadata` flag splits name:value on the
        // first colon, so the `medusa:` prefix is escaped.
        args.push("--metadata".to_string());
        args.push(format!("medusa\\:deps:{}", effective_deps.join("    ")));
        args.push("--metadata".to_string());
        args.push(format!("medusa\\:stage:{}", run.stage));

        args.push("--outputdir".to_string());
        args.push(self.output_dir.to_string_lossy().into_owned());

        args.extend(self.passthrough_args.iter().cloned());
        args.push(run.suite_path.to_string());
        args
    }
}

#[async_trait]
impl ProcessRunner for RobotProcessRunner {
    type Handle = RobotProcessHandle;

    async fn spawn(
        &self,
        run: &Run,
        effective_deps: &[String],
        for_bindings: &BTreeMap<String, String>,
    ) -> Result<Self::Handle, ProcessError> {
        let args = self.build_args(run, effective_deps, for_bindings);
        let child = tokio::process::Command::new(&self.robot_bin)
            .args(&args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|err| ProcessError::Spawn(err.to_string()))?;
        Ok(RobotProcessHandle {
            child,
        })
    }
}

// ============================================================================
// SECTION: Process Handle
// ============================================================================

/// A live `robot` child process.
pub struct RobotProcessHandle {
    /// The underlying tokio child handle.
    child: tokio::process::Child,
}

#[async_trait]
impl ProcessHandle for RobotProcessHandle {
    async fn signal(&mut self, signal: Signal) -> Result<(), ProcessError> {
        let Some(pid) = self.child.id() else {
            // Already exited; signaling a gone child is a no-op (spec §4.6
            // Supervisor contract delegated to the ProcessHandle).
            return Ok(());
        };

        match signal {
            Signal::Kill => self.child.start_kill().map_err(|err| ProcessError::Signal(err.to_string())),
            Signal::Soft | Signal::Hard => deliver_teardown_signal(pid, signal, &mut self.child).await,
        }
    }

    async fn wait(&mut self) -> Result<ExitStatus, ProcessError> {
        self.child.wait().await.map_err(|err| ProcessError::Wait(err.to_string()))
    }
}

/// Delivers the cooperative-teardown (`Soft`) or forced-termination
/// (`Hard`) signal. On Unix, shells out to the `kill` utility rather than an
/// `unsafe` direct syscall; non-Unix targets have no portable cooperative
/// signal, so both collapse into an immediate [`tokio::process::Child::start_kill`].
#[cfg(unix)]
async fn deliver_teardown_signal(
    pid: u32,
    signal: Signal,
    child: &mut tokio::process::Child,
) -> Result<(), ProcessError> {
    let _ = child;
    let sig_name = match signal {
        Signal::Soft => "INT",
        Signal::Hard => "TERM",
        Signal::Kill => "KILL",
    };
    let status = tokio::process::Command::new("kill")
        .arg("-s")
        .arg(sig_name)
        .arg(pid.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|err| ProcessError::Signal(err.to_string()))?;
    // `kill` exits non-zero if the process already vanished between the
    // `id()` check and delivery; that race is not a Supervisor error.
    let _ = status;
    Ok(())
}

/// Non-Unix fallback: no portable cooperative signal exists, so both `Soft`
/// and `Hard` collapse straight to a forced kill.
#[cfg(not(unix))]
async fn deliver_teardown_signal(
    _pid: u32,
    _signal: Signal,
    child: &mut tokio::process::Child,
) -> Result<(), ProcessError> {
    child.start_kill().map_err(|err| ProcessError::Signal(err.to_string()))
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

    fn run_fixture() -> Run {
        let suite = Suite::new("suites/unit.robot", VariableTable::new());
        let mut bindings = BTreeMap::new();
        bindings.insert(medusa_core::model::VarName::new("HOST"), "db1".to_string());
        Run {
            suite_path: suite.origin,
            stage: StageToken::new("unit"),
            deps: DepSpec::default(),
            timeout: TimeoutSpec::new(1, 2, 1).unwrap(),
            bindings,
            index: 0,
        }
    }

    #[test]
    fn build_args_injects_bindings_and_medusa_variables() {
        let runner = RobotProcessRunner::new("robot", "out", vec!["--loglevel".to_string(), "DEBUG".to_string()]);
        let run = run_fixture();
        let for_bindings = BTreeMap::from([("HOST".to_string(), "db1".to_string())]);
        let args = runner.build_args(&run, &["db".to_string(), "cache".to_string()], &for_bindings);

        assert!(args.windows(2).any(|w| w == ["--variable", "HOST:db1"]));
        assert!(args.windows(2).any(|w| w == ["--variable", "MEDUSA_STAGE:unit"]));
        assert!(args.windows(2).any(|w| w == ["--variable", "MEDUSA_DEPS:db:cache"]));
        assert!(args.windows(2).any(|w| w == ["--metadata", "medusa\\:deps:db    cache"]));
        assert!(args.windows(2).any(|w| w == ["--metadata", "medusa\\:stage:unit"]));
        assert!(args.windows(2).any(|w| w == ["--loglevel", "DEBUG"]));
        assert_eq!(args.last().unwrap(), "suites/unit.robot");
    }
}
