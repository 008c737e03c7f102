//! Core types and building blocks for the bar streaming engine.
//!
//! This crate provides:
//! - Market data types (Bar, CandleEvent, Timeframe) and the `Num` abstraction
//! - Sliding-window primitives for streaming indicators
//! - Bar series, multi-timeframe aggregation and routing
//! - The runtime context shared by rules
//! - Positions, trades, cost models and the trading record

pub mod aggregation;
pub mod error;
pub mod num;
pub mod record;
pub mod router;
pub mod runtime;
pub mod series;
pub mod traits;
pub mod types;
pub mod window;

pub use aggregation::BarAggregator;
pub use error::{
    ConfigurationError, DataError, EngineError, EngineResult, SequenceError, StrategyError,
};
pub use num::{DecimalNum, Num};
pub use record::{CostModel, CostModelSpec, Position, Trade, TradingRecord};
pub use router::MultiTimeFrameRouter;
pub use runtime::{PositionSnapshot, RuntimeContext, RuntimeKey, RuntimeValue};
pub use series::{BarSeries, SeriesRetention};
pub use traits::*;
pub use types::*;
