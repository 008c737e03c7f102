//! Tracing observer for indicator contexts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use barstream_core::num::Num;
use barstream_core::traits::IndicatorId;
use barstream_core::types::Bar;
use barstream_indicators::{ContextObserver, IndicatorContext};
use tracing::{debug, info, trace};

/// Counters shared between a [`ContextMonitor`] and its owner.
#[derive(Debug, Default)]
pub struct MonitorStats {
    updates: AtomicU64,
    changes: AtomicU64,
    stable_at: AtomicU64,
}

impl MonitorStats {
    /// Bars the context processed.
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    /// Indicator value changes summed over all bars.
    pub fn changes(&self) -> u64 {
        self.changes.load(Ordering::Relaxed)
    }

    /// Bar count at which every indicator was stable, if reached.
    pub fn stable_at(&self) -> Option<u64> {
        match self.stable_at.load(Ordering::Relaxed) {
            0 => None,
            bars => Some(bars),
        }
    }
}

/// Logs indicator activity of one context.
///
/// Every `sample_every` bars the full indicator snapshot is written at debug
/// level; individual updates go to trace.
#[derive(Debug)]
pub struct ContextMonitor {
    stats: Arc<MonitorStats>,
    sample_every: u64,
}

impl ContextMonitor {
    pub fn new(sample_every: u64) -> Self {
        Self {
            stats: Arc::new(MonitorStats::default()),
            sample_every,
        }
    }

    /// Handle to the counters; stays valid after the monitor moved into a context.
    pub fn stats(&self) -> Arc<MonitorStats> {
        Arc::clone(&self.stats)
    }
}

impl Default for ContextMonitor {
    fn default() -> Self {
        Self::new(100)
    }
}

impl<N: Num> ContextObserver<N> for ContextMonitor {
    fn on_update(&mut self, context: &IndicatorContext<N>, bar: &Bar<N>, changed: &[IndicatorId]) {
        let updates = self.stats.updates.fetch_add(1, Ordering::Relaxed) + 1;
        self.stats
            .changes
            .fetch_add(changed.len() as u64, Ordering::Relaxed);

        trace!(
            context = context.name(),
            end_time = bar.end_time,
            close = %bar.close,
            changed = changed.len(),
            "indicators updated"
        );

        if self.sample_every > 0 && updates % self.sample_every == 0 {
            let values: Vec<String> = context
                .snapshot()
                .into_iter()
                .map(|(name, value, stable)| {
                    if stable {
                        format!("{name}={value}")
                    } else {
                        format!("{name}=~{value}")
                    }
                })
                .collect();
            debug!(
                context = context.name(),
                timeframe = %context.timeframe(),
                bars = context.bars_seen(),
                values = %values.join(" "),
                "indicator snapshot"
            );
        }
    }

    fn on_stable(&mut self, context: &IndicatorContext<N>, bar: &Bar<N>) {
        self.stats
            .stable_at
            .store(context.bars_seen(), Ordering::Relaxed);
        info!(
            context = context.name(),
            timeframe = %context.timeframe(),
            bars = context.bars_seen(),
            end_time = bar.end_time,
            "warm-up complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barstream_core::types::Timeframe;
    use barstream_indicators::{PriceIndicator, Sma};

    fn bar(i: i64, close: f64) -> Bar<f64> {
        Bar::new(Timeframe::Minute1, i * 60_000, close, close, close, close, 1.0)
    }

    #[test]
    fn test_monitor_counts() {
        let monitor = ContextMonitor::new(2);
        let stats = monitor.stats();

        let mut builder = IndicatorContext::builder("monitored", Timeframe::Minute1);
        let close = builder.add("close", PriceIndicator::close()).unwrap();
        builder.add("sma", Sma::new(close, 3).unwrap()).unwrap();
        builder.observe(monitor);
        let mut context = builder.build().unwrap();

        context.update(&bar(0, 1.0));
        context.update(&bar(1, 2.0));
        assert_eq!(stats.updates(), 2);
        assert_eq!(stats.stable_at(), None);

        context.update(&bar(2, 3.0));
        context.update(&bar(3, 3.0));
        assert_eq!(stats.updates(), 4);
        assert_eq!(stats.stable_at(), Some(3));
        // close: 1, 1, 1, 0; sma: 0, 0, 1, 1
        assert_eq!(stats.changes(), 5);
    }
}
