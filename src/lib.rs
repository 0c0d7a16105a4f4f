//! testrun - runners that execute a test's command and finalize its output
//!
//! A test harness hands each test to a [`Runner`]. The runner starts the
//! test's command, waits for it under a [`Timer`], collects everything the
//! process printed, and finalizes that into one combined output string that
//! is always safe to embed in a JSON report.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use testrun::{CommandSpec, CommandTester, HarnessOptions, Job, LocalRunner, Runner, Timer};
//!
//! # fn main() -> anyhow::Result<()> {
//! let options = Arc::new(HarnessOptions::discover()?);
//! testrun::init_logging(&options).map_err(|e| anyhow::anyhow!(e))?;
//! let tester = CommandTester::new("mesh_refine", CommandSpec::new("./mesh_refine").arg("-i"))
//!     .redirect_output(true)
//!     .processors(4);
//! let job = Arc::new(Job::new(Arc::new(tester)));
//!
//! let runner = LocalRunner::new(job.clone(), options.clone());
//! let timer = Timer::from_options(&options);
//! runner.spawn(&timer)?;
//! runner.wait(&timer)?;
//!
//! println!("exit code: {:?}", runner.exit_code());
//! println!("status: {:?}", job.status());
//! print!("{}", runner.output());
//! # Ok(())
//! # }
//! ```
//!
//! # Crates
//!
//! - `testrun-runner` - the [`Runner`] trait, [`RunnerCore`] and [`LocalRunner`]
//! - `testrun-config` - [`HarnessOptions`] loading and validation
//! - `testrun-utils` - logging setup and output formatting helpers

pub use testrun_runner::{
    CommandSpec, CommandTester, Job, JobStatus, LocalRunner, RunPhase, Runner, RunnerCore,
    RunnerError, Signal, StatusKind, StatusSink, Tester, Timer, read_output,
};

pub use testrun_config::{ConfigError, HarnessOptions, OutputOptions, RunnerOptions, TestOptions};

pub use testrun_utils::logging::init_tracing;

/// Install the tracing subscriber at the verbosity `options` asks for
pub fn init_logging(
    options: &HarnessOptions,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing(options.verbose)
}

/// Output sanitization steps applied during finalize
pub mod sanitize {
    pub use testrun_runner::sanitize::*;
}

/// Harness configuration
pub mod config {
    pub use testrun_config::config::*;
}

/// Formatting helpers shared by runners
pub mod format {
    pub use testrun_utils::format::*;
}
