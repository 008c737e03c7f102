//! Backtesting: a synchronous trading session per asset and a parallel
//! engine running strategy plans over candle history.

mod engine;
mod report;
mod session;
mod statistics;

pub use engine::{BacktestConfig, BacktestEngine, StrategyPlan};
pub use report::BacktestReport;
pub use session::{BindingId, TradeEvent, TradingSession};
pub use statistics::{BacktestStats, PositionSummary};
