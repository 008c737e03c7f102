//! Error types for the streaming engine.

use thiserror::Error;

use crate::types::Timeframe;

/// Top-level engine error.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Sequencing error: {0}")]
    Sequence(#[from] SequenceError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wiring and parameter errors. Raised eagerly, before any bar is processed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("cannot aggregate {base} into {target}: target duration is not a whole multiple")]
    InvalidAggregationRatio { base: Timeframe, target: Timeframe },

    #[error("aggregator for {0} has no target timeframes")]
    NoAggregationTargets(Timeframe),

    #[error("window size for {name} must be greater than 0")]
    NonPositiveWindow { name: String },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("unmapped timeframe: {0}")]
    UnmappedTimeframe(String),

    #[error("a series is already registered for timeframe {0}")]
    DuplicateSeries(Timeframe),

    #[error("no series registered for timeframe {0}")]
    MissingSeries(Timeframe),

    #[error("indicator {indicator} references unknown input #{input}")]
    UnknownIndicator { indicator: String, input: usize },

    #[error("indicator name already registered: {0}")]
    DuplicateIndicator(String),

    #[error("indicator dependency cycle involving: {0}")]
    DependencyCycle(String),
}

/// Violations of the temporal or timeframe contract of a bar stream.
///
/// The offending event is rejected and state is left untouched; callers
/// recover by resending a corrected event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("past candle for {timeframe}: end time {incoming} is not after current end time {current}")]
    PastCandle {
        timeframe: Timeframe,
        current: i64,
        incoming: i64,
    },

    #[error("bar tagged {actual} delivered to {expected} series")]
    WrongTimeframe { expected: Timeframe, actual: Timeframe },
}

/// Strategy construction errors.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Strategy not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Data source errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("No data available: {0}")]
    NoDataAvailable(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid timeframe: {0}")]
    InvalidTimeframe(String),
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
