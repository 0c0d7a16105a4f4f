//! Logging infrastructure for testrun
//!
//! Structured logging through `tracing`, with span helpers shared by every
//! runner backend so their events carry the same fields.

use std::io::IsTerminal;
use std::time::Duration;
use tracing::{Level, info, span, warn};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Check if colored output should be used.
///
/// Returns true only if:
/// - stderr is a terminal (TTY)
/// - NO_COLOR environment variable is not set
fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Build the filter used by [`init_tracing`].
///
/// `RUST_LOG` wins when set; otherwise verbose mode enables debug events for
/// testrun crates.
#[must_use]
pub fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("testrun=debug,info")
            } else {
                EnvFilter::try_new("testrun=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the tracing subscriber for structured logging.
///
/// Verbose mode adds targets and span close events (with durations) to the
/// compact format. Fails if a global subscriber is already installed.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(use_color())
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .compact();

    if verbose {
        tracing_subscriber::registry()
            .with(default_filter(true))
            .with(
                layer
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(default_filter(false))
            .with(layer.with_target(false))
            .try_init()?;
    }

    Ok(())
}

/// Span covering one test execution on one backend
pub fn run_span(test: &str, runner: &str) -> tracing::Span {
    span!(Level::INFO, "test_run", test = %test, runner = %runner)
}

/// Log that a test process has been started
pub fn log_run_start(test: &str, runner: &str, pid: Option<u32>) {
    info!(test = %test, runner = %runner, pid = ?pid, "Started test execution");
}

/// Log that a test process has finished
pub fn log_run_complete(test: &str, exit_code: i32, elapsed: Duration, timed_out: bool) {
    if timed_out {
        warn!(
            test = %test,
            exit_code,
            elapsed_ms = %elapsed.as_millis(),
            "Test execution timed out"
        );
    } else {
        info!(
            test = %test,
            exit_code,
            elapsed_ms = %elapsed.as_millis(),
            "Test execution completed"
        );
    }
}
