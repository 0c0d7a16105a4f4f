use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default grace period between the terminate and kill signals, in milliseconds
pub const DEFAULT_KILL_GRACE_MS: u64 = 2_000;

/// Default interval between child status polls, in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Default width of the `#` rule printed around output section headers
pub const DEFAULT_HEADER_WIDTH: usize = 80;

/// Harness-wide options shared by every runner.
///
/// Loaded from `.testrun/config.toml` (see [`HarnessOptions::discover`]) or
/// built programmatically. Runners only ever read these values.
///
/// ```toml
/// verbose = true
///
/// [runner]
/// timeout_secs = 300
/// kill_grace_ms = 500
///
/// [tests]
/// processors = 4
/// output_dir = "build/test-output"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessOptions {
    /// Emit debug-level logging
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub runner: RunnerOptions,
    #[serde(default)]
    pub output: OutputOptions,
    #[serde(default)]
    pub tests: TestOptions,
}

/// `[runner]` section: process supervision
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerOptions {
    /// Wall-clock limit for a single test; unlimited when absent
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Time allowed between SIGTERM and SIGKILL once the timeout fires
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,
    /// How often `wait` checks the child for exit
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// `[output]` section: formatting of the combined output
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutputOptions {
    #[serde(default = "default_header_width")]
    pub header_width: usize,
}

/// `[tests]` section: defaults applied to every tester
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TestOptions {
    /// Processor count used when a tester does not set its own
    #[serde(default = "default_processors")]
    pub processors: u32,
    /// Directory redirected output files are written to
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_kill_grace_ms() -> u64 {
    DEFAULT_KILL_GRACE_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_header_width() -> usize {
    DEFAULT_HEADER_WIDTH
}

fn default_processors() -> u32 {
    1
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            kill_grace_ms: DEFAULT_KILL_GRACE_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl RunnerOptions {
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub const fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            header_width: DEFAULT_HEADER_WIDTH,
        }
    }
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            processors: 1,
            output_dir: None,
        }
    }
}
