//! Barstream CLI application.

mod cli;

use anyhow::Result;
use barstream_monitor::{setup_logging, LogFormat};
use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = cli::load_settings(cli.config.as_deref())?;
    let level = cli
        .log_level
        .map(|level| level.as_str().to_string())
        .unwrap_or_else(|| settings.logging.level.clone());
    let format = LogFormat::from_json_flag(cli.json_logs || settings.logging.is_json());
    let log_file = cli
        .log_file
        .clone()
        .or_else(|| settings.logging.file.as_ref().map(Into::into));
    let _guard = setup_logging(&level, format, log_file.as_deref());

    match cli.command {
        Commands::Backtest(args) => cli::commands::backtest::run(args, &settings),
        Commands::Timeframes => cli::commands::timeframes::run(),
        Commands::Strategies => cli::commands::strategies::run(),
        Commands::ValidateConfig => cli::commands::validate::run(cli.config.as_deref(), &settings),
    }
}
