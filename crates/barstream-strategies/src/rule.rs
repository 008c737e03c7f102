//! Boolean trading rules evaluated against the live pipeline state.

use barstream_core::num::Num;
use barstream_core::record::TradingRecord;
use barstream_core::runtime::RuntimeContext;
use barstream_core::traits::IndicatorId;
use barstream_indicators::IndicatorContext;

/// Everything a rule can look at when the current bar is evaluated.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a, N: Num> {
    /// Indicator values of the strategy's timeframe
    pub indicators: &'a IndicatorContext<N>,
    /// Latest bar, time and position summary
    pub runtime: &'a RuntimeContext<N>,
    pub record: &'a TradingRecord<N>,
}

impl<'a, N: Num> RuleContext<'a, N> {
    pub fn new(
        indicators: &'a IndicatorContext<N>,
        runtime: &'a RuntimeContext<N>,
        record: &'a TradingRecord<N>,
    ) -> Self {
        Self {
            indicators,
            runtime,
            record,
        }
    }

    #[inline]
    pub fn value(&self, id: IndicatorId) -> N {
        self.indicators.value(id)
    }
}

/// A boolean predicate over the current pipeline state.
pub trait Rule<N: Num>: Send {
    fn is_satisfied(&self, ctx: &RuleContext<'_, N>) -> bool;

    /// Indicators this rule reads; a strategy is only stable once all of
    /// them are.
    fn dependencies(&self) -> Vec<IndicatorId> {
        Vec::new()
    }
}

impl<N: Num, R: Rule<N> + ?Sized> Rule<N> for Box<R> {
    fn is_satisfied(&self, ctx: &RuleContext<'_, N>) -> bool {
        (**self).is_satisfied(ctx)
    }

    fn dependencies(&self) -> Vec<IndicatorId> {
        (**self).dependencies()
    }
}
