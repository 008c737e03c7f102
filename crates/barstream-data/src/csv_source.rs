//! CSV candle source.

use std::io::Read;
use std::path::{Path, PathBuf};

use barstream_core::error::DataError;
use barstream_core::types::{CandleEvent, Timeframe};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::{debug, warn};

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "timestamp", alias = "Timestamp", alias = "time")]
    date: String,
    #[serde(alias = "Open", alias = "open")]
    open: f64,
    #[serde(alias = "High", alias = "high")]
    high: f64,
    #[serde(alias = "Low", alias = "low")]
    low: f64,
    #[serde(alias = "Close", alias = "close", alias = "Adj Close")]
    close: f64,
    #[serde(alias = "Volume", alias = "volume", default)]
    volume: f64,
}

/// Historical candles of a single timeframe stored as CSV.
///
/// The date column is the candle's begin time; the end time is derived from
/// the timeframe.
#[derive(Debug, Clone)]
pub struct CsvCandleSource {
    path: PathBuf,
    timeframe: Timeframe,
}

impl CsvCandleSource {
    pub fn new(path: impl AsRef<Path>, timeframe: Timeframe) -> Result<Self, DataError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataError::NoDataAvailable(path.display().to_string()));
        }
        Ok(Self {
            path: path.to_path_buf(),
            timeframe,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Load every candle, sorted by begin time.
    pub fn load_all(&self) -> Result<Vec<CandleEvent>, DataError> {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| DataError::ParseError(e.to_string()))?;
        let candles = read_candles(reader, self.timeframe)?;
        debug!(path = %self.path.display(), timeframe = %self.timeframe, candles = candles.len(), "candles loaded");
        Ok(candles)
    }

    /// Parse candles from any reader, e.g. an in-memory buffer.
    pub fn from_reader<R: Read>(reader: R, timeframe: Timeframe) -> Result<Vec<CandleEvent>, DataError> {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        read_candles(reader, timeframe)
    }
}

fn read_candles<R: Read>(
    mut reader: csv::Reader<R>,
    timeframe: Timeframe,
) -> Result<Vec<CandleEvent>, DataError> {
    let mut candles = Vec::new();
    for result in reader.deserialize() {
        let record: CsvRecord = result.map_err(|e| DataError::ParseError(e.to_string()))?;
        let begin = parse_timestamp(&record.date)?;
        if begin != timeframe.bucket_start(begin) {
            warn!(%timeframe, begin, "candle is not aligned to its timeframe");
        }
        candles.push(CandleEvent::new(
            timeframe,
            begin,
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
        ));
    }

    if candles.is_empty() {
        return Err(DataError::NoDataAvailable("no rows in CSV input".into()));
    }

    // Sort by begin time
    candles.sort_by_key(|c| c.begin_time);
    Ok(candles)
}

/// Parse various timestamp formats into epoch milliseconds (UTC).
fn parse_timestamp(date_str: &str) -> Result<i64, DataError> {
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];
    const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(date_str, format) {
            return Ok(d.and_time(NaiveTime::MIN).and_utc().timestamp_millis());
        }
    }

    // Unix timestamp; milliseconds if > 10 digits
    if let Ok(ts) = date_str.parse::<i64>() {
        return Ok(if ts > 10_000_000_000 { ts } else { ts * 1000 });
    }

    Err(DataError::ParseError(format!(
        "Could not parse date: {}",
        date_str
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("2024-01-15").unwrap(), 1_705_276_800_000);
        assert_eq!(parse_timestamp("2024-01-15 10:30:00").unwrap(), 1_705_314_600_000);
        assert_eq!(parse_timestamp("2024-01-15T10:30:00").unwrap(), 1_705_314_600_000);
        assert_eq!(parse_timestamp("1705312800000").unwrap(), 1_705_312_800_000); // Unix ms
        assert_eq!(parse_timestamp("1705312800").unwrap(), 1_705_312_800_000); // Unix sec
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_from_reader_sorts_and_derives_end_time() {
        let data = "\
timestamp,open,high,low,close,volume
120000,2,3,1,2.5,10
60000,1,2,0.5,1.5,20
";
        let candles = CsvCandleSource::from_reader(data.as_bytes(), Timeframe::Minute1).unwrap();
        assert_eq!(candles.len(), 2);
        // Small integers are read as seconds
        assert_eq!(candles[0].begin_time, 60_000_000);
        assert_eq!(candles[0].end_time, 60_000_000 + 60_000);
        assert_eq!(candles[1].close, 2.5);
    }

    #[test]
    fn test_capitalised_headers_and_missing_volume() {
        let data = "\
Date,Open,High,Low,Close
2024-01-15,100,110,95,105
";
        let candles = CsvCandleSource::from_reader(data.as_bytes(), Timeframe::Daily).unwrap();
        assert_eq!(candles[0].volume, 0.0);
        assert_eq!(candles[0].timeframe, Timeframe::Daily);
        assert_eq!(candles[0].end_time - candles[0].begin_time, 86_400_000);
    }

    #[test]
    fn test_bad_rows() {
        let data = "timestamp,open,high,low,close\n2024-01-15,abc,1,1,1\n";
        assert!(matches!(
            CsvCandleSource::from_reader(data.as_bytes(), Timeframe::Daily),
            Err(DataError::ParseError(_))
        ));

        let empty = "timestamp,open,high,low,close\n";
        assert!(matches!(
            CsvCandleSource::from_reader(empty.as_bytes(), Timeframe::Daily),
            Err(DataError::NoDataAvailable(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            CsvCandleSource::new("/definitely/not/here.csv", Timeframe::Minute1),
            Err(DataError::NoDataAvailable(_))
        ));
    }
}
