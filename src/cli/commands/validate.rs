//! Validate configuration command.

use std::path::Path;

use anyhow::Result;
use barstream_config::{to_toml, AppConfig};

/// `settings` was already loaded and validated by the time this runs.
pub fn run(config_path: Option<&Path>, settings: &AppConfig) -> Result<()> {
    match config_path {
        Some(path) => println!("Configuration is valid: {}", path.display()),
        None => println!("No configuration file given; built-in defaults are valid"),
    }
    println!();
    println!("App: {}", settings.app.name);
    println!("Environment: {}", settings.app.environment);
    println!("Log level: {}", settings.logging.level);
    println!("Precision: {}", settings.engine.precision);
    println!("Base timeframe: {}", settings.engine.base_timeframe);
    let aggregate: Vec<&str> = settings.engine.aggregate.iter().map(|t| t.label()).collect();
    println!("Aggregate: {}", aggregate.join(", "));
    println!("Plans: {}", settings.backtest.plans.len());
    println!();
    println!("Effective configuration:");
    println!("{}", to_toml(settings)?);

    Ok(())
}
