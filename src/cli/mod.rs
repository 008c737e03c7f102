//! CLI definitions.

pub mod commands;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use barstream_config::{load_config, AppConfig, Precision};
use barstream_core::types::Timeframe;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "barstream")]
#[command(author, version, about = "Multi-timeframe bar aggregation, indicators and backtesting")]
pub struct Cli {
    /// Configuration file path; built-in defaults when omitted
    #[arg(short, long, env = "BARSTREAM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level, overrides the configured one
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    /// Also write JSON logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a backtest over a CSV candle file
    Backtest(BacktestArgs),
    /// List supported timeframes
    Timeframes,
    /// List available strategies
    Strategies,
    /// Validate configuration
    ValidateConfig,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    /// Data file (CSV with timestamp,open,high,low,close[,volume])
    #[arg(short, long)]
    pub data: PathBuf,

    /// Timeframe of the candles in the data file
    #[arg(short, long)]
    pub timeframe: Option<Timeframe>,

    /// Strategy to backtest instead of the configured plans
    #[arg(short, long)]
    pub strategy: Option<String>,

    /// Timeframe the strategy trades on; defaults to the data timeframe
    #[arg(long, requires = "strategy")]
    pub target: Option<Timeframe>,

    /// Strategy parameters as JSON, e.g. '{"fast_period": 5}'
    #[arg(long, requires = "strategy")]
    pub params: Option<String>,

    /// Numeric precision (f64, decimal)
    #[arg(short, long)]
    pub precision: Option<Precision>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Save the JSON reports to a file
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Write the equity curve of each plan as CSV into this directory
    #[arg(long)]
    pub equity_dir: Option<PathBuf>,
}

/// Configuration from `path`, or the built-in defaults.
pub fn load_settings(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}
