//! Local subprocess backend

mod platform;

use std::fs::File;
use std::process::{Child, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Instant;
use testrun_config::HarnessOptions;
use testrun_utils::logging::{log_run_complete, log_run_start, run_span};

use crate::command_spec::CommandSpec;
use crate::error::RunnerError;
use crate::job::{Job, StatusKind, StatusSink};
use crate::runner::{Runner, RunnerCore};
use crate::timer::Timer;
use crate::types::{RunPhase, Signal};

/// Status message recorded when the timer expires
pub const TIMEOUT_MESSAGE: &str = "TIMEOUT";

const RUNNER_NAME: &str = "local";

/// Runs a test's command as a child process of the harness.
///
/// Stdout and stderr are merged into an anonymous temporary file, which is
/// read back through the stream reader once the process exits. On timeout
/// the process group gets `SIGTERM`, then `SIGKILL` after
/// `[runner].kill_grace_ms`.
///
/// The child handle sits behind a mutex that `wait` holds only while polling
/// `try_wait`, so `kill` from a watchdog thread can never signal a process
/// that has already been reaped.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use testrun_config::HarnessOptions;
/// use testrun_runner::{CommandSpec, CommandTester, Job, LocalRunner, Runner, Timer};
///
/// let options = Arc::new(HarnessOptions::default());
/// let tester = CommandTester::new("echo", CommandSpec::new("echo").arg("hi"));
/// let job = Arc::new(Job::new(Arc::new(tester)));
///
/// let runner = LocalRunner::new(job, options.clone());
/// let timer = Timer::from_options(&options);
/// runner.spawn(&timer)?;
/// runner.wait(&timer)?;
/// assert_eq!(runner.exit_code(), Some(0));
/// assert_eq!(runner.output(), "hi\n");
/// # Ok::<(), testrun_runner::RunnerError>(())
/// ```
#[derive(Debug)]
pub struct LocalRunner {
    core: RunnerCore,
    command: CommandSpec,
    child: Mutex<Option<Child>>,
    capture: Mutex<Option<File>>,
    killed: AtomicBool,
    timed_out: AtomicBool,
}

impl LocalRunner {
    /// Create a runner for `job`'s command under `options`
    #[must_use]
    pub fn new(job: Arc<Job>, options: Arc<HarnessOptions>) -> Self {
        let command = job.tester().command(&options);
        Self {
            core: RunnerCore::new(job, options),
            command,
            child: Mutex::new(None),
            capture: Mutex::new(None),
            killed: AtomicBool::new(false),
            timed_out: AtomicBool::new(false),
        }
    }

    /// Whether [`Runner::kill`] reached a running process
    #[must_use]
    pub fn was_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    /// Whether the timer expired before the process exited
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.timed_out.load(Ordering::SeqCst)
    }

    /// PID of the running process, if any
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.lock_child().as_ref().map(Child::id)
    }

    fn lock_child(&self) -> MutexGuard<'_, Option<Child>> {
        self.child.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_capture(&self) -> MutexGuard<'_, Option<File>> {
        self.capture.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Escalate towards termination once the timer has expired
    fn enforce_deadline(&self, child: &mut Child, term_sent: &mut Option<Instant>) {
        match *term_sent {
            None => {
                tracing::warn!(
                    test = %self.core.job().name(),
                    pid = child.id(),
                    "Timer expired, terminating test process"
                );
                self.timed_out.store(true, Ordering::SeqCst);
                if let Err(err) = platform::signal(child, Signal::Term) {
                    tracing::debug!(error = %err, "SIGTERM delivery failed");
                }
                *term_sent = Some(Instant::now());
            }
            Some(sent) if sent.elapsed() >= self.core.options().runner.kill_grace() => {
                tracing::warn!(pid = child.id(), "Grace period elapsed, killing test process");
                if let Err(err) = platform::kill(child) {
                    tracing::debug!(error = %err, "SIGKILL delivery failed");
                }
                // Kill at most once per grace period
                *term_sent = Some(Instant::now());
            }
            Some(_) => {}
        }
    }

    fn collect_captured_output(&self) -> Result<(), RunnerError> {
        let captured = self.lock_capture().take();
        if let Some(mut file) = captured {
            let text = self.core.read_output(&mut file);
            self.core.append_output(&text)?;
        }
        Ok(())
    }
}

impl Runner for LocalRunner {
    fn name(&self) -> &'static str {
        RUNNER_NAME
    }

    fn core(&self) -> &RunnerCore {
        &self.core
    }

    fn spawn(&self, timer: &Timer) -> Result<(), RunnerError> {
        let phase = self.core.phase();
        if phase != RunPhase::Created {
            return Err(RunnerError::InvalidState {
                operation: "spawn",
                state: phase,
            });
        }

        let job = self.core.job();
        let _span = run_span(job.name(), RUNNER_NAME).entered();

        let capture = tempfile::tempfile()?;
        let mut command = self.command.to_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::from(capture.try_clone()?))
            .stderr(Stdio::from(capture.try_clone()?));
        platform::prepare(&mut command);

        tracing::debug!(command = %self.command, "Spawning test process");
        let child = command.spawn().map_err(|err| RunnerError::SpawnFailed {
            program: self.command.program.to_string_lossy().into_owned(),
            reason: err.to_string(),
        })?;
        let pid = child.id();

        *self.lock_capture() = Some(capture);
        *self.lock_child() = Some(child);
        self.core.mark_spawned()?;

        timer.start();
        log_run_start(job.name(), RUNNER_NAME, Some(pid));
        Ok(())
    }

    fn wait(&self, timer: &Timer) -> Result<(), RunnerError> {
        self.core.ensure_spawned("wait")?;

        let job = self.core.job();
        let _span = run_span(job.name(), RUNNER_NAME).entered();
        let poll_interval = self.core.options().runner.poll_interval();
        let mut term_sent = None;

        let status = loop {
            {
                let mut guard = self.lock_child();
                let Some(child) = guard.as_mut() else {
                    return Err(RunnerError::WaitFailed {
                        reason: "no child process to wait for".to_string(),
                    });
                };

                match child.try_wait() {
                    Ok(Some(status)) => {
                        guard.take();
                        break status;
                    }
                    Ok(None) => {}
                    Err(err) => {
                        return Err(RunnerError::WaitFailed {
                            reason: err.to_string(),
                        });
                    }
                }

                if timer.is_expired() {
                    self.enforce_deadline(child, &mut term_sent);
                }
            }
            thread::sleep(poll_interval);
        };

        timer.stop();
        let exit_code = platform::exit_code(status);
        let timed_out = self.timed_out();
        if timed_out {
            job.set_status(StatusKind::Timeout, TIMEOUT_MESSAGE);
        }

        self.collect_captured_output()?;
        log_run_complete(job.name(), exit_code, timer.elapsed(), timed_out);
        self.core.complete(exit_code)
    }

    fn kill(&self) {
        let mut guard = self.lock_child();
        let Some(child) = guard.as_mut() else {
            tracing::debug!("Kill requested with no running process");
            return;
        };

        self.killed.store(true, Ordering::SeqCst);
        tracing::info!(pid = child.id(), "Killing test process");
        if let Err(err) = platform::kill(child) {
            tracing::warn!(error = %err, "Failed to kill test process");
        }
    }

    fn send_signal(&self, signal: Signal) -> Result<(), RunnerError> {
        self.core.ensure_spawned("send_signal")?;

        let mut guard = self.lock_child();
        let Some(child) = guard.as_mut() else {
            return Err(RunnerError::SignalFailed {
                signal,
                reason: "process has already exited".to_string(),
            });
        };

        tracing::debug!(pid = child.id(), %signal, "Sending signal to test process");
        platform::signal(child, signal)
    }
}
