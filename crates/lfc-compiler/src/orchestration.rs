//! Interface to whatever builds and runs the generated federates.
//!
//! The compiler only emits artifacts. Building them and launching the
//! resulting processes belongs to an [`Orchestrator`], which classifies
//! every process it runs into an [`ExecutionOutcome`].

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use lfc_codegen::FederateArtifacts;

/// Wall-clock bound on one launched process.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// How a build or a launched program ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Pass,
    /// Exited with a non-zero status or was killed by a signal.
    Fail,
    /// Exceeded its timeout and was terminated.
    Timeout,
    /// Could not be started at all.
    NoExec,
}

impl ExecutionOutcome {
    pub fn is_pass(self) -> bool {
        self == ExecutionOutcome::Pass
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionOutcome::Pass => "pass",
            ExecutionOutcome::Fail => "fail",
            ExecutionOutcome::Timeout => "timeout",
            ExecutionOutcome::NoExec => "no-exec",
        };
        f.write_str(s)
    }
}

/// Classify a finished process. A timeout wins over whatever status the
/// terminated process reported; no exit code means it died from a signal.
pub fn classify_exit(started: bool, timed_out: bool, exit_code: Option<i32>) -> ExecutionOutcome {
    if !started {
        ExecutionOutcome::NoExec
    } else if timed_out {
        ExecutionOutcome::Timeout
    } else if exit_code == Some(0) {
        ExecutionOutcome::Pass
    } else {
        ExecutionOutcome::Fail
    }
}

/// Builds generated federates and launches the resulting program.
pub trait Orchestrator {
    /// Build one federate whose artifacts were written to `dir`.
    fn build(&mut self, federate: &FederateArtifacts, dir: &Path) -> ExecutionOutcome;

    /// Launch every built federate together. Processes still running
    /// after `timeout` must be terminated and reported as
    /// [`ExecutionOutcome::Timeout`].
    fn launch(&mut self, federates: &[&FederateArtifacts], timeout: Duration) -> ExecutionOutcome;
}
