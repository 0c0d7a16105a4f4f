//! The `Runner` contract shared by every execution backend.
//!
//! A harness drives one runner per test:
//!
//! ```text
//! spawn(timer) -> wait(timer) -> output() / exit_code()
//!                   ^
//!                   kill() / send_signal() from a watchdog thread
//! ```
//!
//! Backends own how the command runs; [`RunnerCore`] owns what every backend
//! must agree on: the lifecycle, the exit code, and the finalized output.

use std::io::{Read, Seek};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use testrun_config::HarnessOptions;

use crate::error::RunnerError;
use crate::job::Job;
use crate::sanitize::sanitize_output;
use crate::stream::read_output;
use crate::timer::Timer;
use crate::types::{RunPhase, Signal};

/// Execution backend for a single test.
///
/// Every method takes `&self` so that `kill` and `send_signal` can be called
/// from another thread while `wait` blocks. Implementations must make that
/// one race safe; nothing else about a runner is shared.
pub trait Runner: Send + Sync {
    /// Short backend name used in logs and errors
    fn name(&self) -> &'static str;

    /// Shared lifecycle and output state
    fn core(&self) -> &RunnerCore;

    /// Start the test under `timer`. Moves the runner to `Spawned`.
    fn spawn(&self, timer: &Timer) -> Result<(), RunnerError>;

    /// Block until the test finishes or `timer` expires.
    ///
    /// Implementations record the exit code and call
    /// [`RunnerCore::finalize`] (usually via [`RunnerCore::complete`])
    /// before returning.
    fn wait(&self, timer: &Timer) -> Result<(), RunnerError>;

    /// Best-effort termination of a running test. Does not wait for it.
    fn kill(&self);

    /// Deliver a named signal to the running test.
    ///
    /// Backends that cannot deliver arbitrary signals (a batch job may only
    /// support cancellation) keep this default.
    fn send_signal(&self, signal: Signal) -> Result<(), RunnerError> {
        tracing::debug!(runner = self.name(), %signal, "Signal delivery not supported");
        Err(RunnerError::UnsupportedOperation {
            operation: "send_signal",
            runner: self.name(),
        })
    }

    /// Combined output; only trustworthy once `wait` has returned
    fn output(&self) -> String {
        self.core().output()
    }

    /// Exit code; `None` until `wait` has returned
    fn exit_code(&self) -> Option<i32> {
        self.core().exit_code()
    }

    fn phase(&self) -> RunPhase {
        self.core().phase()
    }
}

#[derive(Debug)]
struct CoreState {
    phase: RunPhase,
    exit_code: Option<i32>,
    output: String,
    replaced_invalid: bool,
}

/// State every backend embeds: the job, the options, and one execution's
/// exit code and output.
#[derive(Debug)]
pub struct RunnerCore {
    job: Arc<Job>,
    options: Arc<HarnessOptions>,
    state: Mutex<CoreState>,
}

impl RunnerCore {
    #[must_use]
    pub fn new(job: Arc<Job>, options: Arc<HarnessOptions>) -> Self {
        Self {
            job,
            options,
            state: Mutex::new(CoreState {
                phase: RunPhase::Created,
                exit_code: None,
                output: String::new(),
                replaced_invalid: false,
            }),
        }
    }

    #[must_use]
    pub fn job(&self) -> &Arc<Job> {
        &self.job
    }

    #[must_use]
    pub fn options(&self) -> &Arc<HarnessOptions> {
        &self.options
    }

    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.lock().phase
    }

    #[must_use]
    pub fn output(&self) -> String {
        self.lock().output.clone()
    }

    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.lock().exit_code
    }

    /// `Created -> Spawned`. Backends call this once their process or job
    /// exists.
    pub fn mark_spawned(&self) -> Result<(), RunnerError> {
        let mut state = self.lock();
        if state.phase != RunPhase::Created {
            return Err(RunnerError::InvalidState {
                operation: "spawn",
                state: state.phase,
            });
        }
        state.phase = RunPhase::Spawned;
        Ok(())
    }

    /// Fail with `InvalidState` unless the runner is `Spawned`
    pub fn ensure_spawned(&self, operation: &'static str) -> Result<(), RunnerError> {
        let phase = self.phase();
        if phase == RunPhase::Spawned {
            Ok(())
        } else {
            Err(RunnerError::InvalidState {
                operation,
                state: phase,
            })
        }
    }

    /// Append decoded text. Output is append-only until finalized.
    pub fn append_output(&self, text: &str) -> Result<(), RunnerError> {
        let mut state = self.lock();
        if state.phase == RunPhase::Completed {
            return Err(RunnerError::InvalidState {
                operation: "append output",
                state: state.phase,
            });
        }
        state.output.push_str(text);
        Ok(())
    }

    /// Append raw bytes, substituting U+FFFD for invalid UTF-8.
    ///
    /// A substitution is remembered and reported as a caveat at finalize.
    pub fn append_output_bytes(&self, bytes: &[u8]) -> Result<(), RunnerError> {
        let text = String::from_utf8_lossy(bytes);
        if let std::borrow::Cow::Owned(_) = text {
            tracing::debug!(
                test = %self.job.name(),
                "Substituted invalid UTF-8 in captured output"
            );
            self.lock().replaced_invalid = true;
        }
        self.append_output(&text)
    }

    /// Read a captured stream with the job as status sink.
    ///
    /// See [`crate::stream::read_output`] for the failure behavior.
    pub fn read_output<R>(&self, stream: &mut R) -> String
    where
        R: Read + Seek + ?Sized,
    {
        read_output(stream, self.job.as_ref())
    }

    /// Record the exit code. Only valid while `Spawned`, and only once.
    pub fn set_exit_code(&self, code: i32) -> Result<(), RunnerError> {
        let mut state = self.lock();
        if state.phase != RunPhase::Spawned {
            return Err(RunnerError::InvalidState {
                operation: "set exit code",
                state: state.phase,
            });
        }
        if let Some(existing) = state.exit_code {
            return Err(RunnerError::ExitCodeAlreadySet { existing });
        }
        state.exit_code = Some(code);
        Ok(())
    }

    /// Assemble and sanitize the combined output. `Spawned -> Completed`.
    ///
    /// Redirected output files are appended in the tester's order, then the
    /// output is checked for serializability and stripped of NULs. Problems
    /// land on the job's status and caveats; the only error is calling this
    /// outside `Spawned` or before the exit code is recorded.
    pub fn finalize(&self) -> Result<(), RunnerError> {
        let files = self
            .job
            .tester()
            .redirected_output_files(&self.options);

        let mut state = self.lock();
        if state.phase != RunPhase::Spawned {
            return Err(RunnerError::InvalidState {
                operation: "finalize",
                state: state.phase,
            });
        }
        if state.exit_code.is_none() {
            return Err(RunnerError::ExitCodeMissing);
        }

        let mut output = std::mem::take(&mut state.output);
        sanitize_output(
            &mut output,
            &files,
            self.options.output.header_width,
            state.replaced_invalid,
            self.job.as_ref(),
        );
        state.output = output;
        state.phase = RunPhase::Completed;

        tracing::debug!(
            test = %self.job.name(),
            redirected_files = files.len(),
            output_bytes = state.output.len(),
            "Output finalized"
        );
        Ok(())
    }

    /// Record the exit code and finalize; the last step of every `wait`
    pub fn complete(&self, exit_code: i32) -> Result<(), RunnerError> {
        self.ensure_spawned("complete")?;
        self.set_exit_code(exit_code)?;
        self.finalize()
    }

    fn lock(&self) -> MutexGuard<'_, CoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobStatus, StatusKind};
    use crate::sanitize::{
        FILE_TIMEOUT_MESSAGE, FILE_UNAVAILABLE_TEXT, INVALID_CHARACTERS_CAVEAT,
        NULL_CHARACTERS_MESSAGE,
    };
    use crate::tester::CommandTester;
    use crate::CommandSpec;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn core_with(tester: CommandTester) -> RunnerCore {
        RunnerCore::new(
            Arc::new(Job::new(Arc::new(tester))),
            Arc::new(HarnessOptions::default()),
        )
    }

    fn core() -> RunnerCore {
        core_with(CommandTester::new("unit", CommandSpec::new("true")))
    }

    #[test]
    fn test_new_core_state() {
        let core = core();
        assert_eq!(core.phase(), RunPhase::Created);
        assert_eq!(core.exit_code(), None);
        assert_eq!(core.output(), "");
    }

    #[test]
    fn test_spawn_only_once() {
        let core = core();
        core.mark_spawned().unwrap();
        assert!(matches!(
            core.mark_spawned(),
            Err(RunnerError::InvalidState {
                operation: "spawn",
                state: RunPhase::Spawned
            })
        ));
    }

    #[test]
    fn test_finalize_requires_spawned() {
        let core = core();
        assert!(matches!(
            core.finalize(),
            Err(RunnerError::InvalidState {
                state: RunPhase::Created,
                ..
            })
        ));
    }

    #[test]
    fn test_finalize_only_once() {
        let core = core();
        core.mark_spawned().unwrap();
        core.set_exit_code(0).unwrap();
        core.finalize().unwrap();
        assert_eq!(core.phase(), RunPhase::Completed);
        assert!(matches!(
            core.finalize(),
            Err(RunnerError::InvalidState {
                operation: "finalize",
                state: RunPhase::Completed
            })
        ));
    }

    #[test]
    fn test_exit_code_set_once() {
        let core = core();
        core.mark_spawned().unwrap();
        core.set_exit_code(3).unwrap();
        assert!(matches!(
            core.set_exit_code(4),
            Err(RunnerError::ExitCodeAlreadySet { existing: 3 })
        ));
        assert_eq!(core.exit_code(), Some(3));
    }

    #[test]
    fn test_exit_code_rejected_before_spawn() {
        let core = core();
        assert!(matches!(
            core.set_exit_code(5),
            Err(RunnerError::InvalidState {
                operation: "set exit code",
                state: RunPhase::Created
            })
        ));
        assert_eq!(core.exit_code(), None);

        core.mark_spawned().unwrap();
        core.complete(0).unwrap();
        assert_eq!(core.exit_code(), Some(0));
        assert_eq!(core.phase(), RunPhase::Completed);
    }

    #[test]
    fn test_exit_code_rejected_after_completion() {
        let core = core();
        core.mark_spawned().unwrap();
        core.complete(0).unwrap();
        assert!(matches!(
            core.set_exit_code(1),
            Err(RunnerError::InvalidState {
                state: RunPhase::Completed,
                ..
            })
        ));
        assert_eq!(core.exit_code(), Some(0));
    }

    #[test]
    fn test_finalize_requires_exit_code() {
        let core = core();
        core.mark_spawned().unwrap();
        core.append_output("pending\0\n").unwrap();

        assert!(matches!(core.finalize(), Err(RunnerError::ExitCodeMissing)));
        assert_eq!(core.phase(), RunPhase::Spawned);
        assert_eq!(core.output(), "pending\0\n");

        core.set_exit_code(2).unwrap();
        core.finalize().unwrap();
        assert_eq!(core.phase(), RunPhase::Completed);
        assert_eq!(core.output(), "pendingNULL\n");
    }

    #[test]
    fn test_output_is_append_only_until_completed() {
        let core = core();
        core.mark_spawned().unwrap();
        core.append_output("one\n").unwrap();
        core.append_output("two\n").unwrap();
        core.complete(0).unwrap();
        assert_eq!(core.output(), "one\ntwo\n");
        assert!(core.append_output("late").is_err());
    }

    #[test]
    fn test_lossy_bytes_produce_caveat_at_finalize() {
        let core = core();
        core.mark_spawned().unwrap();
        core.append_output_bytes(b"bad \xff byte\n").unwrap();
        assert!(core.job().caveats().is_empty());

        core.complete(0).unwrap();
        assert_eq!(core.output(), "bad \u{FFFD} byte\n");
        assert_eq!(core.job().caveats(), vec![INVALID_CHARACTERS_CAVEAT]);
        assert!(!core.job().is_error());
    }

    #[test]
    fn test_valid_bytes_produce_no_caveat() {
        let core = core();
        core.mark_spawned().unwrap();
        core.append_output_bytes("résumé\n".as_bytes()).unwrap();
        core.complete(0).unwrap();
        assert!(core.job().caveats().is_empty());
    }

    #[test]
    fn test_nul_in_output_is_replaced_and_flagged() {
        let core = core();
        core.mark_spawned().unwrap();
        core.append_output("a\0b \\x00 c\n").unwrap();
        core.complete(0).unwrap();
        assert_eq!(core.output(), "aNULLb NULL c\n");
        assert_eq!(
            core.job().status(),
            JobStatus::new(StatusKind::Error, NULL_CHARACTERS_MESSAGE)
        );
    }

    #[test]
    fn test_missing_redirected_file_marks_file_timeout() {
        let temp = TempDir::new().unwrap();
        let core = core_with(
            CommandTester::new("par", CommandSpec::new("true"))
                .test_dir(temp.path())
                .redirect_output(true),
        );
        core.mark_spawned().unwrap();
        core.complete(0).unwrap();

        assert!(core.output().ends_with(FILE_UNAVAILABLE_TEXT));
        assert!(core.output().contains("par.processor.0:"));
        assert_eq!(
            core.job().status(),
            JobStatus::new(StatusKind::Error, FILE_TIMEOUT_MESSAGE)
        );
    }

    #[test]
    fn test_read_output_reports_to_job() {
        let core = core();
        let text = core.read_output(&mut Cursor::new(vec![0xc3, 0x28]));
        assert_eq!(text, "");
        assert!(core.job().is_error());
    }

    #[test]
    fn test_complete_before_spawn_leaves_exit_code_unset() {
        let core = core();
        assert!(core.complete(0).is_err());
        assert_eq!(core.exit_code(), None);
    }
}
