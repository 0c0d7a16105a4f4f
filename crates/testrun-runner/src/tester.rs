//! Tester: what to run for a test and which extra output files to collect

use std::path::PathBuf;
use testrun_config::HarnessOptions;

use crate::CommandSpec;

/// Test-specific execution parameters consumed by runners.
pub trait Tester: Send + Sync {
    /// Stable test name used in logs and file names
    fn name(&self) -> &str;

    /// The command that executes this test
    fn command(&self, options: &HarnessOptions) -> CommandSpec;

    /// Files the test process writes output to instead of its own streams.
    ///
    /// Order matters: finalization appends one section per file in exactly
    /// this order.
    fn redirected_output_files(&self, options: &HarnessOptions) -> Vec<PathBuf>;
}

/// A tester that runs a fixed command.
///
/// With `redirect_output` enabled, each rank of a parallel run is expected to
/// write `<test_dir>/<name>.processor.<rank>`.
#[derive(Debug, Clone)]
pub struct CommandTester {
    name: String,
    command: CommandSpec,
    test_dir: Option<PathBuf>,
    redirect_output: bool,
    processors: Option<u32>,
}

impl CommandTester {
    #[must_use]
    pub fn new(name: impl Into<String>, command: CommandSpec) -> Self {
        Self {
            name: name.into(),
            command,
            test_dir: None,
            redirect_output: false,
            processors: None,
        }
    }

    /// Directory holding redirected output; defaults to `[tests].output_dir`
    #[must_use]
    pub fn test_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.test_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub const fn redirect_output(mut self, enabled: bool) -> Self {
        self.redirect_output = enabled;
        self
    }

    /// Override `[tests].processors` for this test
    #[must_use]
    pub const fn processors(mut self, count: u32) -> Self {
        self.processors = Some(count);
        self
    }

    /// Processor count in effect under `options`, never less than one
    #[must_use]
    pub fn effective_processors(&self, options: &HarnessOptions) -> u32 {
        self.processors.unwrap_or(options.tests.processors).max(1)
    }

    fn output_dir(&self, options: &HarnessOptions) -> PathBuf {
        self.test_dir
            .clone()
            .or_else(|| options.tests.output_dir.clone())
            .or_else(|| self.command.cwd.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Tester for CommandTester {
    fn name(&self) -> &str {
        &self.name
    }

    fn command(&self, _options: &HarnessOptions) -> CommandSpec {
        self.command.clone()
    }

    fn redirected_output_files(&self, options: &HarnessOptions) -> Vec<PathBuf> {
        if !self.redirect_output {
            return Vec::new();
        }

        let dir = self.output_dir(options);
        (0..self.effective_processors(options))
            .map(|rank| dir.join(format!("{}.processor.{rank}", self.name)))
            .collect()
    }
}
