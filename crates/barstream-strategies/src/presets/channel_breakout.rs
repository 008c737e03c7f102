//! Donchian channel breakout.
//!
//! Enters when the close breaks above the highest high of the previous
//! `entry_period` bars and exits when it breaks below the lowest low of the
//! previous `exit_period` bars.

use barstream_core::error::StrategyError;
use barstream_core::num::Num;
use barstream_indicators::{Highest, IndicatorContextBuilder, Lowest, Previous, PriceIndicator};
use serde::{Deserialize, Serialize};

use super::{check_period, close, StrategyConfig};
use crate::rules::{OverIndicator, UnderIndicator};
use crate::strategy::Strategy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelBreakoutConfig {
    /// Lookback of the upper channel
    pub entry_period: usize,
    /// Lookback of the lower channel
    pub exit_period: usize,
}

impl Default for ChannelBreakoutConfig {
    fn default() -> Self {
        Self {
            entry_period: 20,
            exit_period: 10,
        }
    }
}

impl StrategyConfig for ChannelBreakoutConfig {
    const NAME: &'static str = "channel_breakout";
    const DESCRIPTION: &'static str =
        "Enters on a close above the prior N-bar high, exits below the prior M-bar low";

    fn validate(&self) -> Result<(), StrategyError> {
        check_period("entry_period", self.entry_period)?;
        check_period("exit_period", self.exit_period)
    }

    fn build<N: Num>(
        &self,
        builder: &mut IndicatorContextBuilder<N>,
    ) -> Result<Strategy<N>, StrategyError> {
        self.validate()?;
        let close = close(builder)?;
        let high = builder.get_or_add("high", || Ok(PriceIndicator::<N>::high()))?;
        let low = builder.get_or_add("low", || Ok(PriceIndicator::<N>::low()))?;

        let entry_period = self.entry_period;
        let upper = builder.get_or_add(&format!("highest(high,{entry_period})"), || {
            Highest::new(high, entry_period)
        })?;
        let upper = builder.get_or_add(&format!("highest(high,{entry_period})[-1]"), || {
            Previous::new(upper, 1)
        })?;

        let exit_period = self.exit_period;
        let lower = builder.get_or_add(&format!("lowest(low,{exit_period})"), || {
            Lowest::new(low, exit_period)
        })?;
        let lower = builder.get_or_add(&format!("lowest(low,{exit_period})[-1]"), || {
            Previous::new(lower, 1)
        })?;

        Ok(Strategy::new(
            Self::NAME,
            OverIndicator::new(close, upper),
            UnderIndicator::new(close, lower),
        ))
    }
}
