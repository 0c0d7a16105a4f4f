use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use super::HarnessOptions;

/// Directory holding the harness configuration file
pub const CONFIG_DIR: &str = ".testrun";

/// Configuration file name inside [`CONFIG_DIR`]
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable that points directly at a configuration directory
pub const HOME_ENV: &str = "TESTRUN_HOME";

impl HarnessOptions {
    /// Parse and validate options from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let options: Self = toml::from_str(content).context("Failed to parse harness options")?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from an explicit file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to load config file: {}", path.display()))
    }

    /// Discover options starting from the current working directory.
    ///
    /// Falls back to built-in defaults when no configuration file exists.
    pub fn discover() -> Result<Self> {
        let start_dir = env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir)
    }

    /// Discover options starting from a specific directory.
    ///
    /// `TESTRUN_HOME` takes precedence over the upward search.
    pub fn discover_from(start_dir: &Path) -> Result<Self> {
        let path = match env::var_os(HOME_ENV) {
            Some(home) => {
                let candidate = PathBuf::from(home).join(CONFIG_FILE);
                candidate.exists().then_some(candidate)
            }
            None => Self::discover_config_file_from(start_dir),
        };

        match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading harness options");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Search upward for `.testrun/config.toml`, stopping at a repository root
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current_dir = Some(start_dir);

        while let Some(dir) = current_dir {
            let config_path = dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            if dir.join(".git").exists() || dir.join(".hg").exists() || dir.join(".svn").exists() {
                break;
            }

            current_dir = dir.parent();
        }

        None
    }
}
