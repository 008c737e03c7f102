//! Candle sources feeding the streaming engine.

mod csv_source;

pub use csv_source::CsvCandleSource;

use std::path::Path;

use barstream_core::error::DataError;
use barstream_core::types::{CandleEvent, Timeframe};

/// Load candles of `timeframe` from a CSV file.
pub fn load_csv(path: impl AsRef<Path>, timeframe: Timeframe) -> Result<Vec<CandleEvent>, DataError> {
    CsvCandleSource::new(path, timeframe)?.load_all()
}
