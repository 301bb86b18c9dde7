//! Configuration loading for gympulse.
//!
//! Layered loading in the usual precedence order:
//! 1. `config/default.toml` (optional)
//! 2. `GYMPULSE_*` environment variables (highest priority)

mod settings;

pub use settings::{ChatConfig, LogConfig, ReminderConfig, Settings};

use config::{Config, Environment, File};

use crate::error::{AppError, AppResult};

/// Default configuration directory
const DEFAULT_CONFIG_DIR: &str = "config";

/// Environment variable prefix for configuration overrides
const ENV_PREFIX: &str = "GYMPULSE";

/// Separator for nested configuration keys in environment variables
const ENV_SEPARATOR: &str = "__";

impl Settings {
    /// Loads settings from `config/default.toml` plus environment overrides.
    ///
    /// Every field has a serde default, so a missing file yields a fully
    /// usable configuration.
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_DIR)
    }

    /// Loads settings from a specific configuration directory.
    pub fn load_from(config_dir: &str) -> AppResult<Self> {
        let builder = Config::builder()
            .add_source(File::with_name(&format!("{config_dir}/default")).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            );

        let settings = builder
            .build()
            .and_then(|c| c.try_deserialize::<Settings>())
            .map_err(|e| AppError::Validation {
                field: "config".to_string(),
                reason: e.to_string(),
            })?;

        Ok(settings)
    }
}
