//! CLI command implementations.

pub mod backtest;
pub mod strategies;
pub mod timeframes;
pub mod validate;
