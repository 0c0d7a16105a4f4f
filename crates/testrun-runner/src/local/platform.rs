//! Platform-specific process control for [`super::LocalRunner`].
//!
//! On unix the test process leads its own process group, so signals reach
//! every process it started (MPI ranks, helper scripts). Elsewhere only a
//! hard kill of the direct child is available.

use std::process::{Child, Command, ExitStatus};

use crate::error::RunnerError;
use crate::types::Signal;

/// Configure the command before spawning
pub(crate) fn prepare(command: &mut Command) {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    #[cfg(not(unix))]
    {
        let _ = command;
    }
}

/// Deliver `signal` to the child's process group
#[cfg(unix)]
pub(crate) fn signal(child: &mut Child, signal: Signal) -> Result<(), RunnerError> {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    let pgid = Pid::from_raw(child.id() as i32);
    killpg(pgid, nix::sys::signal::Signal::from(signal)).map_err(|errno| {
        RunnerError::SignalFailed {
            signal,
            reason: errno.desc().to_string(),
        }
    })
}

#[cfg(not(unix))]
pub(crate) fn signal(child: &mut Child, signal: Signal) -> Result<(), RunnerError> {
    match signal {
        Signal::Kill => kill(child),
        _ => Err(RunnerError::UnsupportedOperation {
            operation: "send_signal",
            runner: "local",
        }),
    }
}

/// Hard-kill the child and everything in its group
#[cfg(unix)]
pub(crate) fn kill(child: &mut Child) -> Result<(), RunnerError> {
    signal(child, Signal::Kill)
}

#[cfg(not(unix))]
pub(crate) fn kill(child: &mut Child) -> Result<(), RunnerError> {
    child.kill().map_err(|err| RunnerError::SignalFailed {
        signal: Signal::Kill,
        reason: err.to_string(),
    })
}

/// Exit code reported to the harness; signal deaths map to `-signal`
pub(crate) fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status
            .code()
            .or_else(|| status.signal().map(|sig| -sig))
            .unwrap_or(-1)
    }

    #[cfg(not(unix))]
    {
        status.code().unwrap_or(-1)
    }
}
