use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;

// ============================================================================
// CommandSpec - argv-style description of a test command
// ============================================================================

/// The command a tester wants executed for one test.
///
/// Arguments are discrete `OsString` elements and are never joined into a
/// shell string, so backends always hand them to the OS verbatim. A tester
/// that needs shell features must name the shell explicitly
/// (`CommandSpec::new("sh").args(["-c", script])`).
///
/// # Example
///
/// ```rust
/// use testrun_runner::CommandSpec;
///
/// let cmd = CommandSpec::new("mpiexec")
///     .args(["-n", "2", "./app-opt"])
///     .arg("-i")
///     .arg("simple_diffusion.i")
///     .cwd("tests/kernels")
///     .env("OMP_NUM_THREADS", "1");
///
/// assert_eq!(cmd.args.len(), 5);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// The program to execute
    pub program: OsString,
    /// Arguments as discrete elements
    pub args: Vec<OsString>,
    /// Working directory; inherits the harness's when absent
    pub cwd: Option<PathBuf>,
    /// Environment overrides layered on top of the inherited environment
    pub env: BTreeMap<OsString, OsString>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set an environment variable for the command. Later values win.
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn envs<I, K, V>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        self.env
            .extend(envs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Build a `std::process::Command` with argv-style argument passing.
    ///
    /// Stdio is left untouched; backends decide where streams go.
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd.envs(&self.env);
        cmd
    }
}

/// Lossy, space-joined rendering for logs only. Never executed.
impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
