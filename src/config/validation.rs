//! Configuration validation logic
//!
//! Range and format checks for the sections that have no validation of their
//! own in `settings.rs`.

use crate::config::error::ConfigError;
use crate::config::settings::{FileSettings, LoggerSettings, PasswordConfig, Settings};

/// Valid log levels
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Largest parallelism accepted by argon2 (2^24 - 1)
const MAX_PARALLELISM: u32 = 0x00FF_FFFF;

impl PasswordConfig {
    /// Validate argon2 cost parameters
    ///
    /// # Validation Rules
    /// - Time cost must be at least 1
    /// - Parallelism must be between 1 and 2^24 - 1
    /// - Memory cost must be at least 8 KiB per lane
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_cost == 0 {
            return Err(ConfigError::validation(
                "password.time_cost",
                "Time cost must be at least 1 iteration.",
            ));
        }

        if self.parallelism == 0 || self.parallelism > MAX_PARALLELISM {
            return Err(ConfigError::validation(
                "password.parallelism",
                format!("Parallelism must be between 1 and {MAX_PARALLELISM}."),
            ));
        }

        if self.memory_cost < 8 * self.parallelism {
            return Err(ConfigError::validation(
                "password.memory_cost",
                format!(
                    "Memory cost ({} KiB) must be at least 8 KiB per lane ({} KiB).",
                    self.memory_cost,
                    8 * self.parallelism
                ),
            ));
        }

        Ok(())
    }
}

impl FileSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        self.parse_format().map(|_| ())
    }
}

impl LoggerSettings {
    /// Validate logger settings
    ///
    /// # Validation Rules
    /// - Log level must be one of: trace, debug, info, warn, error
    /// - If file logging is enabled, path must not be empty
    /// - Log format must be one of: full, compact, json
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::validation(
                "logger.level",
                format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        self.file.validate()
    }
}

impl Settings {
    /// Validate all configuration settings
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.jwt.validate()?;
        self.password.validate()?;
        self.logger.validate()?;
        Ok(())
    }
}
