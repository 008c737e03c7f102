//! Entry/exit rule pair evaluated against a single timeframe.

use std::fmt;

use barstream_core::num::Num;
use barstream_core::traits::IndicatorId;
use tracing::trace;

use crate::rule::{Rule, RuleContext};

/// A trading strategy: an entry rule, an exit rule and a warm-up.
///
/// Neither rule is consulted before every indicator either rule depends on
/// is stable, and before `unstable_bars` bars have been seen.
pub struct Strategy<N: Num> {
    name: String,
    entry: Box<dyn Rule<N>>,
    exit: Box<dyn Rule<N>>,
    unstable_bars: u64,
    dependencies: Vec<IndicatorId>,
}

impl<N: Num> Strategy<N> {
    pub fn new(
        name: impl Into<String>,
        entry: impl Rule<N> + 'static,
        exit: impl Rule<N> + 'static,
    ) -> Self {
        let mut dependencies = entry.dependencies();
        for id in exit.dependencies() {
            if !dependencies.contains(&id) {
                dependencies.push(id);
            }
        }
        Self {
            name: name.into(),
            entry: Box::new(entry),
            exit: Box::new(exit),
            unstable_bars: 0,
            dependencies,
        }
    }

    /// Require `bars` bars before any signal, on top of indicator stability.
    pub fn with_unstable_bars(mut self, bars: u64) -> Self {
        self.unstable_bars = bars;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unstable_bars(&self) -> u64 {
        self.unstable_bars
    }

    pub fn dependencies(&self) -> &[IndicatorId] {
        &self.dependencies
    }

    pub fn is_stable(&self, ctx: &RuleContext<'_, N>) -> bool {
        ctx.indicators.bars_seen() >= self.unstable_bars
            && self
                .dependencies
                .iter()
                .all(|&id| ctx.indicators.is_stable(id))
    }

    pub fn should_enter(&self, ctx: &RuleContext<'_, N>) -> bool {
        if !self.is_stable(ctx) {
            return false;
        }
        let satisfied = self.entry.is_satisfied(ctx);
        if satisfied {
            trace!(strategy = %self.name, bar = ctx.indicators.bars_seen(), "entry rule satisfied");
        }
        satisfied
    }

    pub fn should_exit(&self, ctx: &RuleContext<'_, N>) -> bool {
        if !self.is_stable(ctx) {
            return false;
        }
        let satisfied = self.exit.is_satisfied(ctx);
        if satisfied {
            trace!(strategy = %self.name, bar = ctx.indicators.bars_seen(), "exit rule satisfied");
        }
        satisfied
    }
}

impl<N: Num> fmt::Debug for Strategy<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy")
            .field("name", &self.name)
            .field("unstable_bars", &self.unstable_bars)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}
