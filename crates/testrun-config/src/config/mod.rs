//! Harness options: model, discovery, and validation
//!
//! Options come from a TOML file with `[runner]`, `[output]`, and `[tests]`
//! sections, or from built-in defaults when no file is found.

mod discovery;
mod model;
mod validation;

pub use discovery::{CONFIG_DIR, CONFIG_FILE, HOME_ENV};
pub use model::*;
