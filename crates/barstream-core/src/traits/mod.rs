//! Core traits for the streaming engine.

mod indicator;
mod listener;

pub use indicator::{Indicator, IndicatorId, InputValues};
pub use listener::{BarListener, ListenerHandle};
