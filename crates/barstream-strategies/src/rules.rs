//! Basic rules over indicator values and the current position.

use barstream_core::error::ConfigurationError;
use barstream_core::num::Num;
use barstream_core::traits::IndicatorId;
use barstream_core::types::{PositionStatus, Side};
use barstream_indicators::{IndicatorContextBuilder, Previous};

use crate::rule::{Rule, RuleContext};

/// Always the same answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BooleanRule(bool);

impl BooleanRule {
    pub const TRUE: BooleanRule = BooleanRule(true);
    pub const FALSE: BooleanRule = BooleanRule(false);

    pub fn new(value: bool) -> Self {
        Self(value)
    }
}

impl<N: Num> Rule<N> for BooleanRule {
    fn is_satisfied(&self, _ctx: &RuleContext<'_, N>) -> bool {
        self.0
    }
}

/// `first > second`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverIndicator {
    first: IndicatorId,
    second: IndicatorId,
}

impl OverIndicator {
    pub fn new(first: IndicatorId, second: IndicatorId) -> Self {
        Self { first, second }
    }
}

impl<N: Num> Rule<N> for OverIndicator {
    fn is_satisfied(&self, ctx: &RuleContext<'_, N>) -> bool {
        ctx.value(self.first) > ctx.value(self.second)
    }

    fn dependencies(&self) -> Vec<IndicatorId> {
        vec![self.first, self.second]
    }
}

/// `first < second`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnderIndicator {
    first: IndicatorId,
    second: IndicatorId,
}

impl UnderIndicator {
    pub fn new(first: IndicatorId, second: IndicatorId) -> Self {
        Self { first, second }
    }
}

impl<N: Num> Rule<N> for UnderIndicator {
    fn is_satisfied(&self, ctx: &RuleContext<'_, N>) -> bool {
        ctx.value(self.first) < ctx.value(self.second)
    }

    fn dependencies(&self) -> Vec<IndicatorId> {
        vec![self.first, self.second]
    }
}

/// `indicator > threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverThreshold<N> {
    indicator: IndicatorId,
    threshold: N,
}

impl<N: Num> OverThreshold<N> {
    pub fn new(indicator: IndicatorId, threshold: N) -> Self {
        Self {
            indicator,
            threshold,
        }
    }
}

impl<N: Num> Rule<N> for OverThreshold<N> {
    fn is_satisfied(&self, ctx: &RuleContext<'_, N>) -> bool {
        ctx.value(self.indicator) > self.threshold
    }

    fn dependencies(&self) -> Vec<IndicatorId> {
        vec![self.indicator]
    }
}

/// `indicator < threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnderThreshold<N> {
    indicator: IndicatorId,
    threshold: N,
}

impl<N: Num> UnderThreshold<N> {
    pub fn new(indicator: IndicatorId, threshold: N) -> Self {
        Self {
            indicator,
            threshold,
        }
    }
}

impl<N: Num> Rule<N> for UnderThreshold<N> {
    fn is_satisfied(&self, ctx: &RuleContext<'_, N>) -> bool {
        ctx.value(self.indicator) < self.threshold
    }

    fn dependencies(&self) -> Vec<IndicatorId> {
        vec![self.indicator]
    }
}

/// Pair of an indicator and its value one bar earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Crossing {
    first: IndicatorId,
    second: IndicatorId,
    first_prev: IndicatorId,
    second_prev: IndicatorId,
}

impl Crossing {
    fn register<N: Num>(
        builder: &mut IndicatorContextBuilder<N>,
        first: IndicatorId,
        second: IndicatorId,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            first,
            second,
            first_prev: previous(builder, first)?,
            second_prev: previous(builder, second)?,
        })
    }

    fn dependencies(&self) -> Vec<IndicatorId> {
        vec![self.first, self.second, self.first_prev, self.second_prev]
    }
}

/// Register (or reuse) the one-bar-delayed copy of `id`.
fn previous<N: Num>(
    builder: &mut IndicatorContextBuilder<N>,
    id: IndicatorId,
) -> Result<IndicatorId, ConfigurationError> {
    let name = match builder.name_of(id) {
        Some(name) => format!("{name}[-1]"),
        None => format!("{id}[-1]"),
    };
    builder.get_or_add(&name, || Previous::new(id, 1))
}

/// `first` crossed above `second` on this bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossedUp(Crossing);

impl CrossedUp {
    /// Wire the rule, registering the delayed inputs it needs.
    pub fn register<N: Num>(
        builder: &mut IndicatorContextBuilder<N>,
        first: IndicatorId,
        second: IndicatorId,
    ) -> Result<Self, ConfigurationError> {
        Crossing::register(builder, first, second).map(Self)
    }
}

impl<N: Num> Rule<N> for CrossedUp {
    fn is_satisfied(&self, ctx: &RuleContext<'_, N>) -> bool {
        let c = &self.0;
        ctx.value(c.first_prev) <= ctx.value(c.second_prev) && ctx.value(c.first) > ctx.value(c.second)
    }

    fn dependencies(&self) -> Vec<IndicatorId> {
        self.0.dependencies()
    }
}

/// `first` crossed below `second` on this bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossedDown(Crossing);

impl CrossedDown {
    pub fn register<N: Num>(
        builder: &mut IndicatorContextBuilder<N>,
        first: IndicatorId,
        second: IndicatorId,
    ) -> Result<Self, ConfigurationError> {
        Crossing::register(builder, first, second).map(Self)
    }
}

impl<N: Num> Rule<N> for CrossedDown {
    fn is_satisfied(&self, ctx: &RuleContext<'_, N>) -> bool {
        let c = &self.0;
        ctx.value(c.first_prev) >= ctx.value(c.second_prev) && ctx.value(c.first) < ctx.value(c.second)
    }

    fn dependencies(&self) -> Vec<IndicatorId> {
        self.0.dependencies()
    }
}

/// Entry price and current price of an open position.
fn open_prices<N: Num>(ctx: &RuleContext<'_, N>) -> Option<(Side, N, N)> {
    let position = ctx.runtime.position();
    if position.status != PositionStatus::Opened {
        return None;
    }
    let entry = position.entry_price?;
    let price = ctx.runtime.price();
    if price.is_nan() {
        return None;
    }
    Some((position.side, entry, price))
}

fn percent_factor<N: Num>(percentage: N) -> N {
    percentage / N::from_i64(100)
}

/// Satisfied when an open position has lost at least `percentage` percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopLoss<N> {
    percentage: N,
}

impl<N: Num> StopLoss<N> {
    pub fn new(percentage: N) -> Self {
        Self { percentage }
    }
}

impl<N: Num> Rule<N> for StopLoss<N> {
    fn is_satisfied(&self, ctx: &RuleContext<'_, N>) -> bool {
        let Some((side, entry, price)) = open_prices(ctx) else {
            return false;
        };
        let factor = percent_factor(self.percentage);
        match side {
            Side::Buy => price <= entry * (N::one() - factor),
            Side::Sell => price >= entry * (N::one() + factor),
        }
    }
}

/// Satisfied when an open position has gained at least `percentage` percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopGain<N> {
    percentage: N,
}

impl<N: Num> StopGain<N> {
    pub fn new(percentage: N) -> Self {
        Self { percentage }
    }
}

impl<N: Num> Rule<N> for StopGain<N> {
    fn is_satisfied(&self, ctx: &RuleContext<'_, N>) -> bool {
        let Some((side, entry, price)) = open_prices(ctx) else {
            return false;
        };
        let factor = percent_factor(self.percentage);
        match side {
            Side::Buy => price >= entry * (N::one() + factor),
            Side::Sell => price <= entry * (N::one() - factor),
        }
    }
}

/// Satisfied once the open position has been held for `bars` bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeldFor {
    bars: u64,
}

impl HeldFor {
    pub fn new(bars: u64) -> Self {
        Self { bars }
    }
}

impl<N: Num> Rule<N> for HeldFor {
    fn is_satisfied(&self, ctx: &RuleContext<'_, N>) -> bool {
        ctx.runtime
            .bars_in_position()
            .is_some_and(|held| held >= self.bars)
    }
}

crate::impl_rule_ext!(
    BooleanRule,
    OverIndicator,
    UnderIndicator,
    OverThreshold<N>,
    UnderThreshold<N>,
    CrossedUp,
    CrossedDown,
    StopLoss<N>,
    StopGain<N>,
    HeldFor,
);
