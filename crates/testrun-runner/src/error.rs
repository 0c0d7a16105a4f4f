//! Error types for runner module

use thiserror::Error;

use crate::types::{RunPhase, Signal};

/// Hard failures of a runner call.
///
/// Problems with the *output* of a test (missing redirected files, bad
/// encoding, NUL bytes) are not errors here; they are reported through the
/// job's status and caveats so a test always produces a result.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("{operation} is not supported by the {runner} runner")]
    UnsupportedOperation {
        operation: &'static str,
        runner: &'static str,
    },

    #[error("Cannot {operation} while the runner is {state}")]
    InvalidState {
        operation: &'static str,
        state: RunPhase,
    },

    #[error("Failed to spawn '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Failed to wait for test process: {reason}")]
    WaitFailed { reason: String },

    #[error("Failed to deliver {signal}: {reason}")]
    SignalFailed { signal: Signal, reason: String },

    #[error("Exit code already recorded as {existing}")]
    ExitCodeAlreadySet { existing: i32 },

    #[error("Cannot finalize before an exit code is recorded")]
    ExitCodeMissing,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
