//! Moving average crossover.
//!
//! Enters when the fast MA crosses above the slow MA and exits when it
//! crosses back below, or on an optional stop loss.

use barstream_core::error::{ConfigurationError, StrategyError};
use barstream_core::num::Num;
use barstream_core::traits::IndicatorId;
use barstream_indicators::{Ema, IndicatorContextBuilder, Sma};
use serde::{Deserialize, Serialize};

use super::{check_percentage, check_period, close, StrategyConfig};
use crate::combinators::RuleExt;
use crate::rule::Rule;
use crate::rules::{CrossedDown, CrossedUp, StopLoss};
use crate::strategy::Strategy;

/// Configuration for the MA crossover preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaCrossoverConfig {
    /// Fast moving average period
    pub fast_period: usize,
    /// Slow moving average period
    pub slow_period: usize,
    /// Use EMA instead of SMA
    pub use_ema: bool,
    /// Exit once the position has lost this many percent
    pub stop_loss_pct: Option<f64>,
}

impl Default for MaCrossoverConfig {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            use_ema: true,
            stop_loss_pct: None,
        }
    }
}

impl StrategyConfig for MaCrossoverConfig {
    const NAME: &'static str = "ma_crossover";
    const DESCRIPTION: &'static str =
        "Enters on fast/slow moving average cross-up, exits on cross-down";

    fn validate(&self) -> Result<(), StrategyError> {
        check_period("fast_period", self.fast_period)?;
        check_period("slow_period", self.slow_period)?;
        if self.fast_period >= self.slow_period {
            return Err(StrategyError::InvalidConfig(
                "Fast period must be less than slow period".into(),
            ));
        }
        check_percentage("stop_loss_pct", self.stop_loss_pct)
    }

    fn build<N: Num>(
        &self,
        builder: &mut IndicatorContextBuilder<N>,
    ) -> Result<Strategy<N>, StrategyError> {
        self.validate()?;
        let close = close(builder)?;
        let fast = moving_average(builder, close, self.fast_period, self.use_ema)?;
        let slow = moving_average(builder, close, self.slow_period, self.use_ema)?;

        let entry = CrossedUp::register(builder, fast, slow)?;
        let cross_down = CrossedDown::register(builder, fast, slow)?;
        let exit: Box<dyn Rule<N>> = match self.stop_loss_pct {
            Some(pct) => Box::new(cross_down.or(StopLoss::new(N::from_f64(pct)))),
            None => Box::new(cross_down),
        };
        Ok(Strategy::new(Self::NAME, entry, exit))
    }
}

fn moving_average<N: Num>(
    builder: &mut IndicatorContextBuilder<N>,
    input: IndicatorId,
    period: usize,
    use_ema: bool,
) -> Result<IndicatorId, ConfigurationError> {
    if use_ema {
        builder.get_or_add(&format!("ema({period})"), || Ema::new(input, period))
    } else {
        builder.get_or_add(&format!("sma({period})"), || Sma::new(input, period))
    }
}
