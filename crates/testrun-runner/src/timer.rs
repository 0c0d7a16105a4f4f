//! Deadline tracking for a single test execution

use chrono::{DateTime, Utc};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use testrun_config::HarnessOptions;

#[derive(Debug, Default, Clone, Copy)]
struct TimerState {
    started: Option<Instant>,
    started_at: Option<DateTime<Utc>>,
    stopped: Option<Instant>,
}

/// Tracks elapsed time against an optional limit.
///
/// Shared by reference between `spawn` and `wait`; the clock starts when the
/// backend calls [`Timer::start`] and freezes at [`Timer::stop`].
#[derive(Debug)]
pub struct Timer {
    timeout: Option<Duration>,
    state: Mutex<TimerState>,
}

impl Timer {
    #[must_use]
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            state: Mutex::new(TimerState::default()),
        }
    }

    /// Timer using `[runner].timeout_secs`
    #[must_use]
    pub fn from_options(options: &HarnessOptions) -> Self {
        Self::new(options.runner.timeout())
    }

    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Start (or restart) the clock
    pub fn start(&self) {
        let mut state = self.lock();
        state.started = Some(Instant::now());
        state.started_at = Some(Utc::now());
        state.stopped = None;
    }

    /// Freeze the clock. No effect if never started or already stopped.
    pub fn stop(&self) {
        let mut state = self.lock();
        if state.started.is_some() && state.stopped.is_none() {
            state.stopped = Some(Instant::now());
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        let state = self.lock();
        state.started.is_some() && state.stopped.is_none()
    }

    /// Wall-clock time the clock was started
    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.lock().started_at
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        let state = *self.lock();
        match state.started {
            Some(started) => state
                .stopped
                .unwrap_or_else(Instant::now)
                .saturating_duration_since(started),
            None => Duration::ZERO,
        }
    }

    /// Time left before the limit; `None` when unlimited
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.timeout
            .map(|limit| limit.saturating_sub(self.elapsed()))
    }

    /// Whether a started clock has reached its limit
    #[must_use]
    pub fn is_expired(&self) -> bool {
        let Some(limit) = self.timeout else {
            return false;
        };
        let started = self.lock().started.is_some();
        started && self.elapsed() >= limit
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(None)
    }
}
