//! Core data types for the streaming engine.

mod bar;
mod side;
mod timeframe;

pub use bar::{Bar, CandleEvent, PriceField};
pub use side::{OrderType, PositionStatus, Side};
pub use timeframe::Timeframe;
