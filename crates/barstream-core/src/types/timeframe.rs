//! Timeframe definitions and the static duration table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigurationError;

const MINUTE_MS: i64 = 60_000;

/// Named duration bucket for bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Timeframe {
    /// 1 minute bars
    #[serde(rename = "1m")]
    #[default]
    Minute1,
    /// 5 minute bars
    #[serde(rename = "5m")]
    Minute5,
    /// 15 minute bars
    #[serde(rename = "15m")]
    Minute15,
    /// 30 minute bars
    #[serde(rename = "30m")]
    Minute30,
    /// 1 hour bars
    #[serde(rename = "1h")]
    Hour1,
    /// 4 hour bars
    #[serde(rename = "4h")]
    Hour4,
    /// Daily bars
    #[serde(rename = "1d")]
    Daily,
    /// Weekly bars
    #[serde(rename = "1w")]
    Weekly,
    /// Monthly bars
    #[serde(rename = "1M")]
    Monthly,
}

impl Timeframe {
    /// Duration of the timeframe in milliseconds.
    pub const fn duration_millis(&self) -> i64 {
        match self {
            Timeframe::Minute1 => MINUTE_MS,
            Timeframe::Minute5 => 5 * MINUTE_MS,
            Timeframe::Minute15 => 15 * MINUTE_MS,
            Timeframe::Minute30 => 30 * MINUTE_MS,
            Timeframe::Hour1 => 60 * MINUTE_MS,
            Timeframe::Hour4 => 240 * MINUTE_MS,
            Timeframe::Daily => 1_440 * MINUTE_MS,
            Timeframe::Weekly => 7 * 1_440 * MINUTE_MS,
            // Fixed 30-day month; calendar months are not modelled.
            Timeframe::Monthly => 30 * 1_440 * MINUTE_MS,
        }
    }

    /// Duration of the timeframe in seconds.
    pub const fn as_secs(&self) -> i64 {
        self.duration_millis() / 1000
    }

    /// Start of the bucket containing `timestamp` (epoch millis).
    #[inline]
    pub fn bucket_start(&self, timestamp: i64) -> i64 {
        timestamp - timestamp.rem_euclid(self.duration_millis())
    }

    /// Whether bars of `self` can be folded into bars of `target`.
    pub fn divides(&self, target: Timeframe) -> bool {
        let source = self.duration_millis();
        let target = target.duration_millis();
        target >= source && target % source == 0
    }

    /// Get all available timeframes, shortest first.
    pub fn all() -> &'static [Timeframe] {
        &[
            Timeframe::Minute1,
            Timeframe::Minute5,
            Timeframe::Minute15,
            Timeframe::Minute30,
            Timeframe::Hour1,
            Timeframe::Hour4,
            Timeframe::Daily,
            Timeframe::Weekly,
            Timeframe::Monthly,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Minute30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1w",
            Timeframe::Monthly => "1M",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "1M" (month) and "1m" (minute) differ only by case.
        if s == "1M" {
            return Ok(Timeframe::Monthly);
        }
        match s.to_lowercase().as_str() {
            "1m" | "1min" | "minute" => Ok(Timeframe::Minute1),
            "5m" | "5min" => Ok(Timeframe::Minute5),
            "15m" | "15min" => Ok(Timeframe::Minute15),
            "30m" | "30min" => Ok(Timeframe::Minute30),
            "1h" | "1hour" | "hour" => Ok(Timeframe::Hour1),
            "4h" | "4hour" => Ok(Timeframe::Hour4),
            "1d" | "day" | "daily" => Ok(Timeframe::Daily),
            "1w" | "week" | "weekly" => Ok(Timeframe::Weekly),
            "1mo" | "month" | "monthly" => Ok(Timeframe::Monthly),
            _ => Err(ConfigurationError::UnmappedTimeframe(s.to_string())),
        }
    }
}
