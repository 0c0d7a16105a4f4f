//! Types used by the runner module

use strum::{Display, EnumString};

/// Lifecycle of one runner: `Created -> Spawned -> Completed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RunPhase {
    /// Constructed, nothing started yet
    Created,
    /// `spawn` succeeded; `wait`, `kill` and `send_signal` are meaningful
    Spawned,
    /// `wait` returned and the output has been finalized
    Completed,
}

/// Named signals a harness may ask a runner to deliver.
///
/// Parses from `"SIGTERM"`, `"TERM"` or `"term"`; displays as `"SIGTERM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Signal {
    #[strum(to_string = "SIGHUP", serialize = "HUP")]
    Hup,
    #[strum(to_string = "SIGINT", serialize = "INT")]
    Int,
    #[strum(to_string = "SIGQUIT", serialize = "QUIT")]
    Quit,
    #[strum(to_string = "SIGKILL", serialize = "KILL")]
    Kill,
    #[strum(to_string = "SIGUSR1", serialize = "USR1")]
    Usr1,
    #[strum(to_string = "SIGUSR2", serialize = "USR2")]
    Usr2,
    #[strum(to_string = "SIGTERM", serialize = "TERM")]
    Term,
}

#[cfg(unix)]
impl From<Signal> for nix::sys::signal::Signal {
    fn from(signal: Signal) -> Self {
        use nix::sys::signal::Signal as Nix;
        match signal {
            Signal::Hup => Nix::SIGHUP,
            Signal::Int => Nix::SIGINT,
            Signal::Quit => Nix::SIGQUIT,
            Signal::Kill => Nix::SIGKILL,
            Signal::Usr1 => Nix::SIGUSR1,
            Signal::Usr2 => Nix::SIGUSR2,
            Signal::Term => Nix::SIGTERM,
        }
    }
}
