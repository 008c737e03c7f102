//! RSI mean reversion: buy oversold, sell overbought.

use barstream_core::error::StrategyError;
use barstream_core::num::Num;
use barstream_indicators::{IndicatorContextBuilder, Rsi};
use serde::{Deserialize, Serialize};

use super::{check_period, close, StrategyConfig};
use crate::combinators::RuleExt;
use crate::rule::Rule;
use crate::rules::{HeldFor, OverThreshold, UnderThreshold};
use crate::strategy::Strategy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiReversionConfig {
    /// RSI period
    pub period: usize,
    /// Enter below this level
    pub oversold: f64,
    /// Exit above this level
    pub overbought: f64,
    /// Force an exit after this many bars in position
    pub max_hold_bars: Option<u64>,
}

impl Default for RsiReversionConfig {
    fn default() -> Self {
        Self {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
            max_hold_bars: None,
        }
    }
}

impl StrategyConfig for RsiReversionConfig {
    const NAME: &'static str = "rsi_reversion";
    const DESCRIPTION: &'static str = "Enters when RSI is oversold, exits when it is overbought";

    fn validate(&self) -> Result<(), StrategyError> {
        check_period("period", self.period)?;
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !in_range(self.oversold) || !in_range(self.overbought) {
            return Err(StrategyError::InvalidConfig(
                "RSI levels must be within 0..=100".into(),
            ));
        }
        if self.oversold >= self.overbought {
            return Err(StrategyError::InvalidConfig(
                "Oversold level must be below overbought level".into(),
            ));
        }
        if self.max_hold_bars == Some(0) {
            return Err(StrategyError::InvalidConfig(
                "max_hold_bars must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    fn build<N: Num>(
        &self,
        builder: &mut IndicatorContextBuilder<N>,
    ) -> Result<Strategy<N>, StrategyError> {
        self.validate()?;
        let close = close(builder)?;
        let period = self.period;
        let rsi = builder.get_or_add(&format!("rsi({period})"), || Rsi::new(close, period))?;

        let entry = UnderThreshold::new(rsi, N::from_f64(self.oversold));
        let overbought = OverThreshold::new(rsi, N::from_f64(self.overbought));
        let exit: Box<dyn Rule<N>> = match self.max_hold_bars {
            Some(bars) => Box::new(overbought.or(HeldFor::new(bars))),
            None => Box::new(overbought),
        };
        Ok(Strategy::new(Self::NAME, entry, exit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::Fixture;
    use barstream_core::types::{Side, Timeframe};
    use barstream_indicators::IndicatorContext;

    fn config() -> RsiReversionConfig {
        RsiReversionConfig {
            period: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_oversold_then_overbought() {
        let mut builder = IndicatorContext::builder("rsi", Timeframe::Minute1);
        let strategy = config().build::<f64>(&mut builder).unwrap();
        let mut fixture = Fixture::new(builder.build().unwrap());

        // RSI(2): -, -, 0, 0, 50, 75, 87.5
        let mut entries = Vec::new();
        let mut exits = Vec::new();
        for (i, close) in [10.0, 9.0, 8.0, 7.0, 8.0, 9.0, 10.0].into_iter().enumerate() {
            fixture.push_close(close);
            if strategy.should_enter(&fixture.ctx()) {
                entries.push(i);
            }
            if strategy.should_exit(&fixture.ctx()) {
                exits.push(i);
            }
        }
        assert_eq!(entries, vec![2, 3]);
        assert_eq!(exits, vec![5, 6]);
    }

    #[test]
    fn test_max_hold_forces_exit() {
        let config = RsiReversionConfig {
            max_hold_bars: Some(1),
            ..config()
        };
        let mut builder = IndicatorContext::builder("rsi", Timeframe::Minute1);
        let strategy = config.build::<f64>(&mut builder).unwrap();
        let mut fixture = Fixture::new(builder.build().unwrap());

        for close in [10.0, 9.0, 8.0] {
            fixture.push_close(close);
        }
        fixture.open(Side::Buy, 8.0);
        assert!(!strategy.should_exit(&fixture.ctx()));
        fixture.push_close(7.0);
        assert!(strategy.should_exit(&fixture.ctx()));
    }

    #[test]
    fn test_level_validation() {
        let inverted = RsiReversionConfig {
            oversold: 80.0,
            overbought: 20.0,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let out_of_range = RsiReversionConfig {
            overbought: 120.0,
            ..Default::default()
        };
        assert!(out_of_range.validate().is_err());
    }
}
