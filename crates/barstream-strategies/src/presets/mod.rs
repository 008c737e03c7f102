//! Parameterised strategies that wire their own indicators.

mod channel_breakout;
mod ma_crossover;
mod rsi_reversion;

pub use channel_breakout::ChannelBreakoutConfig;
pub use ma_crossover::MaCrossoverConfig;
pub use rsi_reversion::RsiReversionConfig;

use barstream_core::error::{ConfigurationError, StrategyError};
use barstream_core::num::Num;
use barstream_core::traits::IndicatorId;
use barstream_indicators::{IndicatorContextBuilder, PriceIndicator};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::strategy::Strategy;

/// Configuration of a preset strategy.
pub trait StrategyConfig: Serialize + DeserializeOwned + Default {
    /// Registry key
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn validate(&self) -> Result<(), StrategyError>;

    /// Register the indicators the strategy reads and assemble its rules.
    fn build<N: Num>(
        &self,
        builder: &mut IndicatorContextBuilder<N>,
    ) -> Result<Strategy<N>, StrategyError>;
}

pub(crate) fn close<N: Num>(
    builder: &mut IndicatorContextBuilder<N>,
) -> Result<IndicatorId, ConfigurationError> {
    builder.get_or_add("close", || Ok(PriceIndicator::<N>::close()))
}

pub(crate) fn check_period(name: &str, period: usize) -> Result<(), StrategyError> {
    if period == 0 {
        return Err(StrategyError::InvalidConfig(format!(
            "{name} must be greater than 0"
        )));
    }
    Ok(())
}

pub(crate) fn check_percentage(name: &str, value: Option<f64>) -> Result<(), StrategyError> {
    match value {
        Some(v) if !v.is_finite() || v <= 0.0 => Err(StrategyError::InvalidConfig(format!(
            "{name} must be a positive percentage"
        ))),
        _ => Ok(()),
    }
}
