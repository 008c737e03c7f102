//! Streaming technical indicators and the per-timeframe indicator context.
//!
//! Indicators are pushed one bar at a time and report when they have seen
//! enough history to be trusted:
//! - Price fields (Open, High, Low, Close, Volume, Typical, Median)
//! - Moving averages (SMA, EMA)
//! - Rolling extremes (Highest, Lowest)
//! - Volatility (Standard Deviation) and momentum (RSI)
//! - Structural helpers (Previous, Constant)
//!
//! [`IndicatorContext`] wires them into a dependency graph for one timeframe
//! and is registered as a listener on that timeframe's bar series.

pub mod context;
pub mod extremum;
pub mod momentum;
pub mod moving_average;
pub mod price;
pub mod transform;
pub mod volatility;

pub use context::{ContextObserver, IndicatorContext, IndicatorContextBuilder};
pub use extremum::{Highest, Lowest};
pub use momentum::Rsi;
pub use moving_average::{Ema, Sma};
pub use price::PriceIndicator;
pub use transform::{Constant, Previous};
pub use volatility::StdDev;
