//! Configuration for testrun runners.

pub mod config;
pub mod error;

pub use config::{HarnessOptions, OutputOptions, RunnerOptions, TestOptions};
pub use error::ConfigError;
