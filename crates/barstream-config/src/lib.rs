//! Configuration management.
//!
//! Configuration is layered: a TOML file first, then `BARSTREAM__*`
//! environment variables (`__` separates sections from keys).

mod settings;

pub use settings::{
    AppConfig, AppSettings, BacktestSettings, CostSettings, EngineSettings, LoggingConfig,
    PlanSettings, Precision,
};

use barstream_core::error::ConfigurationError;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use std::path::Path;
use thiserror::Error;

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "BARSTREAM";

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] ConfigurationError),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Load configuration from file and environment, then validate it.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigLoadError> {
    finish(Config::builder().add_source(File::from(path).required(true)))
}

/// Same as [`load_config`] for TOML held in memory.
pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigLoadError> {
    finish(Config::builder().add_source(File::from_str(contents, FileFormat::Toml)))
}

fn finish(
    builder: ConfigBuilder<config::builder::DefaultState>,
) -> Result<AppConfig, ConfigLoadError> {
    let config: AppConfig = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// Render a configuration as TOML.
pub fn to_toml(config: &AppConfig) -> Result<String, ConfigLoadError> {
    Ok(toml::to_string_pretty(config)?)
}
