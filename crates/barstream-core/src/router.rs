//! Dispatch of incoming bars to per-timeframe series.

use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

use crate::aggregation::BarAggregator;
use crate::error::{ConfigurationError, SequenceError};
use crate::num::Num;
use crate::series::BarSeries;
use crate::types::{Bar, CandleEvent, Timeframe};

/// Routes bars of one asset to the series registered for their timeframe.
///
/// Bars for a timeframe with no registered series are dropped. When an
/// aggregator is attached, every bar of its source timeframe is delivered
/// first and then folded; completed aggregates are routed in turn. An
/// aggregate its series refuses is logged and counted, never allowed to undo
/// the base delivery.
#[derive(Debug)]
pub struct MultiTimeFrameRouter<N: Num> {
    series: BTreeMap<Timeframe, BarSeries<N>>,
    aggregator: Option<BarAggregator<N>>,
    rejected_aggregates: u64,
}

impl<N: Num> Default for MultiTimeFrameRouter<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Num> MultiTimeFrameRouter<N> {
    pub fn new() -> Self {
        Self {
            series: BTreeMap::new(),
            aggregator: None,
            rejected_aggregates: 0,
        }
    }

    /// Attach an upstream aggregator for derived timeframes.
    pub fn with_aggregator(mut self, aggregator: BarAggregator<N>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn set_aggregator(&mut self, aggregator: BarAggregator<N>) {
        self.aggregator = Some(aggregator);
    }

    pub fn aggregator(&self) -> Option<&BarAggregator<N>> {
        self.aggregator.as_ref()
    }

    /// Register the series for its timeframe. One series per timeframe.
    pub fn register(&mut self, series: BarSeries<N>) -> Result<(), ConfigurationError> {
        let timeframe = series.timeframe();
        if self.series.contains_key(&timeframe) {
            return Err(ConfigurationError::DuplicateSeries(timeframe));
        }
        debug!(%timeframe, series = series.name(), "series registered");
        self.series.insert(timeframe, series);
        Ok(())
    }

    pub fn series(&self, timeframe: Timeframe) -> Option<&BarSeries<N>> {
        self.series.get(&timeframe)
    }

    pub fn series_mut(&mut self, timeframe: Timeframe) -> Option<&mut BarSeries<N>> {
        self.series.get_mut(&timeframe)
    }

    /// Aggregates refused by their series since construction.
    pub fn rejected_aggregates(&self) -> u64 {
        self.rejected_aggregates
    }

    /// Registered timeframes, ascending.
    pub fn timeframes(&self) -> impl Iterator<Item = Timeframe> + '_ {
        self.series.keys().copied()
    }

    /// Route a bar, then any aggregates it completes.
    ///
    /// Returns the timeframes that received a bar, in delivery order. Only a
    /// rejected base bar is an error.
    pub fn route_bar(&mut self, bar: Bar<N>) -> Result<Vec<Timeframe>, SequenceError> {
        let mut delivered = Vec::new();
        self.deliver(bar, &mut delivered)?;

        if let Some(aggregator) = self.aggregator.as_mut() {
            if bar.timeframe == aggregator.source() {
                for completed in aggregator.on_bar(&bar)? {
                    self.rejected_aggregates +=
                        Self::deliver_aggregate(&mut self.series, completed, &mut delivered);
                }
            }
        }
        Ok(delivered)
    }

    /// Convert and route a raw event.
    pub fn route_candle(&mut self, event: &CandleEvent) -> Result<Vec<Timeframe>, SequenceError> {
        self.route_bar(Bar::from_candle(event))
    }

    /// Drain partial aggregates into their series, e.g. at the end of a stream.
    pub fn flush(&mut self) -> Result<Vec<Timeframe>, SequenceError> {
        let mut delivered = Vec::new();
        if let Some(aggregator) = self.aggregator.as_mut() {
            for partial in aggregator.flush() {
                self.rejected_aggregates +=
                    Self::deliver_aggregate(&mut self.series, partial, &mut delivered);
            }
        }
        Ok(delivered)
    }

    fn deliver(&mut self, bar: Bar<N>, delivered: &mut Vec<Timeframe>) -> Result<(), SequenceError> {
        Self::deliver_to(&mut self.series, bar, delivered)
    }

    /// Returns 1 when the target series refused the aggregate.
    fn deliver_aggregate(
        series: &mut BTreeMap<Timeframe, BarSeries<N>>,
        bar: Bar<N>,
        delivered: &mut Vec<Timeframe>,
    ) -> u64 {
        match Self::deliver_to(series, bar, delivered) {
            Ok(()) => 0,
            Err(error) => {
                warn!(timeframe = %bar.timeframe, begin = bar.begin_time, %error, "aggregate rejected");
                1
            }
        }
    }

    fn deliver_to(
        series: &mut BTreeMap<Timeframe, BarSeries<N>>,
        bar: Bar<N>,
        delivered: &mut Vec<Timeframe>,
    ) -> Result<(), SequenceError> {
        match series.get_mut(&bar.timeframe) {
            Some(target) => {
                target.add_bar(bar)?;
                delivered.push(bar.timeframe);
            }
            None => {
                trace!(timeframe = %bar.timeframe, begin = bar.begin_time, "no series for timeframe, bar dropped");
            }
        }
        Ok(())
    }
}
