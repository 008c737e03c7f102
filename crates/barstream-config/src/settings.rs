//! Configuration structures.

use std::fmt;
use std::str::FromStr;

use barstream_core::error::ConfigurationError;
use barstream_core::record::CostModelSpec;
use barstream_core::series::SeriesRetention;
use barstream_core::types::{Side, Timeframe};
use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub costs: CostSettings,
    #[serde(default)]
    pub backtest: BacktestSettings,
}

impl AppConfig {
    /// Eager checks run before any data is touched.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.logging.validate()?;
        self.engine.validate()?;
        self.costs.transaction.validate()?;
        self.costs.holding.validate()?;
        self.backtest.validate(&self.engine)
    }
}

/// General app settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "barstream".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `barstream_core=debug`
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        match self.format.to_ascii_lowercase().as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(ConfigurationError::InvalidParameter(format!(
                "unknown log format: {other}"
            ))),
        }
    }
}

/// Numeric representation of prices and indicator values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Precision {
    /// IEEE-754 doubles
    #[default]
    #[serde(rename = "f64", alias = "double")]
    Double,
    /// Arbitrary precision decimals
    #[serde(rename = "decimal")]
    Decimal,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Double => f.write_str("f64"),
            Precision::Decimal => f.write_str("decimal"),
        }
    }
}

impl FromStr for Precision {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "f64" | "double" => Ok(Precision::Double),
            "decimal" => Ok(Precision::Decimal),
            _ => Err(ConfigurationError::InvalidParameter(format!(
                "unknown precision: {s}"
            ))),
        }
    }
}

/// Pipeline wiring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub precision: Precision,
    /// Timeframe of the incoming candles
    pub base_timeframe: Timeframe,
    /// Timeframes aggregated from the base
    pub aggregate: Vec<Timeframe>,
    pub retention: SeriesRetention,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            precision: Precision::Double,
            base_timeframe: Timeframe::Minute1,
            aggregate: vec![Timeframe::Minute5, Timeframe::Minute15, Timeframe::Hour1],
            retention: SeriesRetention::CurrentOnly,
        }
    }
}

impl EngineSettings {
    fn validate(&self) -> Result<(), ConfigurationError> {
        for &target in &self.aggregate {
            if target == self.base_timeframe || !self.base_timeframe.divides(target) {
                return Err(ConfigurationError::InvalidAggregationRatio {
                    base: self.base_timeframe,
                    target,
                });
            }
        }
        Ok(())
    }

    /// Whether a strategy may be bound to `timeframe`.
    pub fn is_available(&self, timeframe: Timeframe) -> bool {
        timeframe == self.base_timeframe || self.aggregate.contains(&timeframe)
    }
}

/// Cost models applied to every trading record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CostSettings {
    pub transaction: CostModelSpec,
    pub holding: CostModelSpec,
}

/// A strategy preset bound to one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSettings {
    pub strategy: String,
    pub timeframe: Timeframe,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

/// Backtest settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub initial_capital: f64,
    pub trade_amount: f64,
    pub starting_side: Side,
    pub close_at_end: bool,
    pub flush_at_end: bool,
    pub plans: Vec<PlanSettings>,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            trade_amount: 1.0,
            starting_side: Side::Buy,
            close_at_end: true,
            flush_at_end: false,
            plans: vec![PlanSettings {
                strategy: "ma_crossover".to_string(),
                timeframe: Timeframe::Minute5,
                params: serde_json::Value::Null,
            }],
        }
    }
}

impl BacktestSettings {
    fn validate(&self, engine: &EngineSettings) -> Result<(), ConfigurationError> {
        positive("initial_capital", self.initial_capital)?;
        positive("trade_amount", self.trade_amount)?;
        for plan in &self.plans {
            if !engine.is_available(plan.timeframe) {
                return Err(ConfigurationError::MissingSeries(plan.timeframe));
            }
        }
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> Result<(), ConfigurationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigurationError::InvalidParameter(format!(
            "{name} must be positive, got {value}"
        )));
    }
    Ok(())
}
