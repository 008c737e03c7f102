//! Trading rules and strategies.
//!
//! Rules are boolean predicates over the indicator context, the runtime
//! context and the trading record of one timeframe. They compose with
//! [`RuleExt`] and pair up into a [`Strategy`]:
//! - Indicator comparisons and crossings
//! - Threshold rules
//! - Stop loss / stop gain and holding time
//!
//! Presets (MA crossover, channel breakout, RSI reversion) are built by name
//! through the [`StrategyRegistry`].

pub mod combinators;
pub mod presets;
pub mod registry;
pub mod rule;
pub mod rules;
pub mod strategy;

pub use combinators::{And, Not, Or, RuleExt, Xor};
pub use presets::{ChannelBreakoutConfig, MaCrossoverConfig, RsiReversionConfig, StrategyConfig};
pub use registry::{StrategyInfo, StrategyRegistry};
pub use rule::{Rule, RuleContext};
pub use rules::{
    BooleanRule, CrossedDown, CrossedUp, HeldFor, OverIndicator, OverThreshold, StopGain,
    StopLoss, UnderIndicator, UnderThreshold,
};
pub use strategy::Strategy;
