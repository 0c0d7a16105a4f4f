//! Job status and the status sink used while finalizing output

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use strum::{Display, EnumString};

use crate::tester::Tester;

/// Outcome category of a job
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StatusKind {
    #[default]
    Pending,
    Running,
    Passed,
    Failed,
    Error,
    Timeout,
    Skipped,
}

/// Status kind plus the short message shown next to it in reports
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub kind: StatusKind,
    pub message: String,
}

impl JobStatus {
    #[must_use]
    pub fn new(kind: StatusKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Narrow capability for reporting problems found while producing output.
///
/// Finalization only ever needs these two operations, so it depends on this
/// trait instead of on [`Job`].
pub trait StatusSink {
    /// Replace the current status
    fn set_status(&self, kind: StatusKind, message: &str);

    /// Attach a non-fatal annotation to the result
    fn add_caveat(&self, caveat: &str);
}

#[derive(Debug, Default)]
struct JobState {
    status: JobStatus,
    caveats: Vec<String>,
}

/// One test's orchestration entity: its tester, status and caveats.
///
/// Shared between the harness and the runner through an `Arc`; all mutation
/// goes through an internal lock so a watchdog thread can observe it.
pub struct Job {
    tester: Arc<dyn Tester>,
    state: Mutex<JobState>,
}

impl Job {
    #[must_use]
    pub fn new(tester: Arc<dyn Tester>) -> Self {
        Self {
            tester,
            state: Mutex::new(JobState::default()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.tester.name()
    }

    #[must_use]
    pub fn tester(&self) -> &Arc<dyn Tester> {
        &self.tester
    }

    #[must_use]
    pub fn status(&self) -> JobStatus {
        self.lock().status.clone()
    }

    #[must_use]
    pub fn caveats(&self) -> Vec<String> {
        self.lock().caveats.clone()
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.lock().status.kind == StatusKind::Error
    }

    fn lock(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StatusSink for Job {
    fn set_status(&self, kind: StatusKind, message: &str) {
        tracing::debug!(test = %self.name(), status = %kind, detail = message, "Job status changed");
        self.lock().status = JobStatus::new(kind, message);
    }

    fn add_caveat(&self, caveat: &str) {
        let mut state = self.lock();
        if !state.caveats.iter().any(|c| c == caveat) {
            state.caveats.push(caveat.to_string());
        }
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Job")
            .field("name", &self.name())
            .field("status", &state.status)
            .field("caveats", &state.caveats)
            .finish()
    }
}
