//! Per-timeframe bar series with ordered listener fan-out.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::trace;

use crate::error::SequenceError;
use crate::num::Num;
use crate::traits::{BarListener, ListenerHandle};
use crate::types::{Bar, CandleEvent, Timeframe};

/// How many bars a series keeps.
///
/// Long-running streams keep only the current bar; backtests that want to
/// look back pick a bounded or unbounded history. The series type is the same
/// either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "mode", content = "bars")]
pub enum SeriesRetention {
    #[default]
    CurrentOnly,
    Bounded(usize),
    Unbounded,
}

impl SeriesRetention {
    fn capacity(&self) -> usize {
        match self {
            SeriesRetention::CurrentOnly => 1,
            SeriesRetention::Bounded(n) => (*n).max(1),
            SeriesRetention::Unbounded => 0,
        }
    }
}

/// Mutable cursor over one timeframe's bars.
///
/// End times strictly increase across successive adds. Every accepted bar is
/// broadcast to the registered listeners in registration order.
pub struct BarSeries<N: Num> {
    name: String,
    timeframe: Timeframe,
    /// Retained bars, newest at the back
    bars: VecDeque<Bar<N>>,
    /// Maximum retained bars (0 = unlimited)
    capacity: usize,
    /// Bars accepted since creation
    bar_count: u64,
    listeners: Vec<Box<dyn BarListener<N>>>,
}

impl<N: Num> BarSeries<N> {
    /// Create a series that keeps only its current bar.
    pub fn new(name: impl Into<String>, timeframe: Timeframe) -> Self {
        Self::with_retention(name, timeframe, SeriesRetention::CurrentOnly)
    }

    pub fn with_retention(
        name: impl Into<String>,
        timeframe: Timeframe,
        retention: SeriesRetention,
    ) -> Self {
        let capacity = retention.capacity();
        Self {
            name: name.into(),
            timeframe,
            bars: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            bar_count: 0,
            listeners: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Register a listener; it is notified after all earlier registrations.
    pub fn add_listener<L: BarListener<N>>(&mut self, listener: L) -> ListenerHandle<L> {
        self.listeners.push(Box::new(listener));
        ListenerHandle::new(self.listeners.len() - 1)
    }

    /// Typed access to a registered listener.
    pub fn listener<L: BarListener<N>>(&self, handle: ListenerHandle<L>) -> Option<&L> {
        self.listeners
            .get(handle.index())
            .and_then(|l| l.as_any().downcast_ref::<L>())
    }

    pub fn listener_mut<L: BarListener<N>>(&mut self, handle: ListenerHandle<L>) -> Option<&mut L> {
        self.listeners
            .get_mut(handle.index())
            .and_then(|l| l.as_any_mut().downcast_mut::<L>())
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Accept a bar and broadcast it.
    ///
    /// Rejects bars tagged for another timeframe and bars whose end time is
    /// not after the current bar's end time. A rejected bar leaves the series
    /// untouched.
    pub fn add_bar(&mut self, bar: Bar<N>) -> Result<(), SequenceError> {
        if bar.timeframe != self.timeframe {
            return Err(SequenceError::WrongTimeframe {
                expected: self.timeframe,
                actual: bar.timeframe,
            });
        }
        if let Some(current) = self.bars.back() {
            if bar.end_time <= current.end_time {
                return Err(SequenceError::PastCandle {
                    timeframe: self.timeframe,
                    current: current.end_time,
                    incoming: bar.end_time,
                });
            }
        }

        if self.capacity > 0 && self.bars.len() >= self.capacity {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
        self.bar_count += 1;
        trace!(series = %self.name, timeframe = %self.timeframe, end = bar.end_time, "bar added");

        for listener in self.listeners.iter_mut() {
            listener.on_bar(&bar);
        }
        Ok(())
    }

    /// Build a bar from a raw event and add it.
    pub fn add_candle(&mut self, event: &CandleEvent) -> Result<(), SequenceError> {
        self.add_bar(Bar::from_candle(event))
    }

    /// The latest accepted bar.
    pub fn current(&self) -> Option<&Bar<N>> {
        self.bars.back()
    }

    /// Retained bar by age (`0` = current).
    pub fn get_back(&self, offset: usize) -> Option<&Bar<N>> {
        self.bars
            .len()
            .checked_sub(offset + 1)
            .and_then(|i| self.bars.get(i))
    }

    /// Number of retained bars.
    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Bars accepted since creation, including ones no longer retained.
    pub fn bar_count(&self) -> u64 {
        self.bar_count
    }

    /// Retained bars, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Bar<N>> {
        self.bars.iter()
    }
}

impl<N: Num> std::fmt::Debug for BarSeries<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarSeries")
            .field("name", &self.name)
            .field("timeframe", &self.timeframe)
            .field("retained", &self.bars.len())
            .field("bar_count", &self.bar_count)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
