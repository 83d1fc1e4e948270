//! Configuration loader for pledge-rs
//!
//! [`ConfigLoader`] resolves where configuration comes from and merges the
//! sources with the documented precedence.

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, Environment, File, FileFormat};

use crate::config::environment::Environment as AppEnvironment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

/// Environment variable for configuration directory
const CONFIG_DIR_ENV: &str = "PLEDGE_CONFIG_DIR";

/// Environment variable for a single configuration file
const CONFIG_FILE_ENV: &str = "PLEDGE_CONFIG_FILE";

const DEFAULT_CONFIG_DIR: &str = "config";

/// Environment variable prefix for configuration overrides
const ENV_PREFIX: &str = "PLEDGE";

/// Separator for nested configuration keys in environment variables
const ENV_SEPARATOR: &str = "__";

type ConfigBuilder = config::ConfigBuilder<DefaultState>;

/// Configuration loader that handles layered configuration loading
///
/// Sources, lowest priority first:
/// 1. `default.toml` (required)
/// 2. `{environment}.toml` (optional)
/// 3. `local.toml` (optional)
/// 4. `PLEDGE_*` environment variables
///
/// When `PLEDGE_CONFIG_FILE` is set, that single file replaces steps 1 to 3.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_dir: PathBuf,
    config_file: Option<PathBuf>,
    environment: AppEnvironment,
}

impl ConfigLoader {
    /// Create a loader from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MutualExclusivityError`] if both
    /// `PLEDGE_CONFIG_DIR` and `PLEDGE_CONFIG_FILE` are set.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create a loader reading its variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_dir = lookup(CONFIG_DIR_ENV);
        let config_file = lookup(CONFIG_FILE_ENV);

        if config_dir.is_some() && config_file.is_some() {
            return Err(ConfigError::mutual_exclusivity(format!(
                "{CONFIG_DIR_ENV} and {CONFIG_FILE_ENV} cannot both be set. \
                 Use {CONFIG_DIR_ENV} for layered configuration or \
                 {CONFIG_FILE_ENV} for a single configuration file."
            )));
        }

        let environment = lookup(AppEnvironment::ENV_VAR)
            .map(|value| value.parse::<AppEnvironment>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            config_dir: config_dir
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR)),
            config_file: config_file.map(PathBuf::from),
            environment,
        })
    }

    pub fn environment(&self) -> AppEnvironment {
        self.environment
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Load and validate the settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `default.toml` is not found (when using layered loading)
    /// - Configuration parsing fails
    /// - Configuration validation fails
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let config = self.build_config()?;
        let settings: Settings = config.try_deserialize().map_err(|e| {
            ConfigError::ParseError(format!("Failed to deserialize configuration: {}", e))
        })?;

        settings.validate()?;

        tracing::info!(
            environment = %self.environment,
            source = %self.source_description(),
            "configuration loaded"
        );

        Ok(settings)
    }

    fn source_description(&self) -> String {
        match &self.config_file {
            Some(file) => file.display().to_string(),
            None => self.config_dir.display().to_string(),
        }
    }

    fn build_config(&self) -> Result<Config, ConfigError> {
        let builder = match &self.config_file {
            Some(config_file) => add_file_source(Config::builder(), config_file, true)?,
            None => self.build_layered_config(Config::builder())?,
        };

        // Environment variables always win. Names are lowercased, so
        // PLEDGE_LOGGER__LEVEL maps to logger.level
        add_env_source(builder).build().map_err(ConfigError::from)
    }

    fn build_layered_config(&self, builder: ConfigBuilder) -> Result<ConfigBuilder, ConfigError> {
        let layers = [
            (self.config_dir.join("default.toml"), true),
            (
                self.config_dir
                    .join(format!("{}.toml", self.environment.as_str())),
                false,
            ),
            (self.config_dir.join("local.toml"), false),
        ];

        layers
            .iter()
            .try_fold(builder, |builder, (path, required)| {
                add_file_source(builder, path, *required)
            })
    }
}

fn add_file_source(
    builder: ConfigBuilder,
    path: &Path,
    required: bool,
) -> Result<ConfigBuilder, ConfigError> {
    if required && !path.exists() {
        return Err(ConfigError::file_not_found(format!(
            "Required configuration file not found: {}",
            path.display()
        )));
    }

    Ok(builder.add_source(
        File::new(path.to_str().unwrap_or_default(), FileFormat::Toml).required(required),
    ))
}

/// `PLEDGE_JWT__ACCESS_SECRET` maps to `jwt.access_secret`
fn add_env_source(builder: ConfigBuilder) -> ConfigBuilder {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator(ENV_SEPARATOR)
            .ignore_empty(true)
            .try_parsing(true),
    )
}
