//! Runner abstraction for executing a single test command
//!
//! A [`Runner`] runs one test's command somewhere (a local subprocess, a
//! batch-scheduler job, a container) and hands back an exit code plus one
//! combined output blob that is always safe to put in a report.
//!
//! # Output guarantees
//!
//! After `wait` returns, [`Runner::output`]:
//! - contains one labeled section per redirected output file, in the order
//!   the [`Tester`] declared them
//! - encodes as a JSON string
//! - contains no NUL characters
//!
//! Anything that had to be repaired to get there is reported on the
//! [`Job`]'s status or caveats instead of failing the call.
//!
//! # Security Model
//!
//! All process execution goes through [`CommandSpec`] to ensure argv-style
//! invocation. Arguments are never joined into a shell string.

pub mod command_spec;
pub mod error;
pub mod job;
pub mod local;
pub mod runner;
pub mod sanitize;
pub mod stream;
pub mod tester;
pub mod timer;
pub mod types;

pub use command_spec::CommandSpec;
pub use error::RunnerError;
pub use job::{Job, JobStatus, StatusKind, StatusSink};
pub use local::LocalRunner;
pub use runner::{Runner, RunnerCore};
pub use stream::read_output;
pub use tester::{CommandTester, Tester};
pub use timer::Timer;
pub use types::{RunPhase, Signal};
