//! OHLCV (Open, High, Low, Close, Volume) data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Timeframe;
use crate::num::Num;

/// Raw market event produced by external loaders.
///
/// Prices arrive as `f64`; they are converted into the pipeline's numeric
/// type when the event becomes a [`Bar`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandleEvent {
    pub timeframe: Timeframe,
    /// Unix timestamp in milliseconds, inclusive
    pub begin_time: i64,
    /// Unix timestamp in milliseconds, exclusive
    pub end_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl CandleEvent {
    /// Create an event spanning exactly one `timeframe` from `begin_time`.
    pub fn new(
        timeframe: Timeframe,
        begin_time: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timeframe,
            begin_time,
            end_time: begin_time + timeframe.duration_millis(),
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Which value of a bar to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
    /// (high + low + close) / 3
    Typical,
    /// (high + low) / 2
    Median,
}

/// Immutable OHLCV summary over `[begin_time, end_time)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar<N = f64> {
    pub timeframe: Timeframe,
    /// Unix timestamp in milliseconds, inclusive
    pub begin_time: i64,
    /// Unix timestamp in milliseconds, exclusive
    pub end_time: i64,
    pub open: N,
    pub high: N,
    pub low: N,
    pub close: N,
    pub volume: N,
}

impl<N: Num> Bar<N> {
    /// Create a bar spanning exactly one `timeframe` from `begin_time`.
    pub fn new(
        timeframe: Timeframe,
        begin_time: i64,
        open: N,
        high: N,
        low: N,
        close: N,
        volume: N,
    ) -> Self {
        Self {
            timeframe,
            begin_time,
            end_time: begin_time + timeframe.duration_millis(),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Build a bar from a raw event, converting prices into `N`.
    pub fn from_candle(event: &CandleEvent) -> Self {
        Self {
            timeframe: event.timeframe,
            begin_time: event.begin_time,
            end_time: event.end_time,
            open: N::from_f64(event.open),
            high: N::from_f64(event.high),
            low: N::from_f64(event.low),
            close: N::from_f64(event.close),
            volume: N::from_f64(event.volume),
        }
    }

    /// Read one field of the bar.
    pub fn price(&self, field: PriceField) -> N {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
            PriceField::Volume => self.volume,
            PriceField::Typical => self.typical_price(),
            PriceField::Median => (self.high + self.low) / N::from_i64(2),
        }
    }

    /// Calculate the typical price (HLC average).
    #[inline]
    pub fn typical_price(&self) -> N {
        (self.high + self.low + self.close) / N::from_i64(3)
    }

    /// Calculate the bar's range (high - low).
    #[inline]
    pub fn range(&self) -> N {
        self.high - self.low
    }

    /// Check if the bar is bullish (close > open).
    #[inline]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Check if the bar is bearish (close < open).
    #[inline]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Get the begin time as a DateTime.
    pub fn begin_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.begin_time)
    }

    /// Get the end time as a DateTime.
    pub fn end_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.end_time)
    }
}
