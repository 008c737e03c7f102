//! Position state machine, trades, cost models and the trading ledger.

pub mod cost;
pub mod position;
pub mod trade;
pub mod trading_record;

pub use cost::{
    CostModel, CostModelSpec, FixedTransactionCostModel, LinearBorrowingCostModel,
    LinearTransactionCostModel, ZeroCostModel,
};
pub use position::Position;
pub use trade::Trade;
pub use trading_record::TradingRecord;
