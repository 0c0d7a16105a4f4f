use crate::error::ConfigError;

use super::HarnessOptions;

impl HarnessOptions {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runner.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "runner.poll_interval_ms".to_string(),
                value: "must be greater than 0".to_string(),
            });
        }

        if self.runner.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "runner.timeout_secs".to_string(),
                value: "must be greater than 0 when set".to_string(),
            });
        }

        if self.output.header_width == 0 {
            return Err(ConfigError::InvalidValue {
                key: "output.header_width".to_string(),
                value: "must be greater than 0".to_string(),
            });
        }

        if self.tests.processors == 0 {
            return Err(ConfigError::InvalidValue {
                key: "tests.processors".to_string(),
                value: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}
