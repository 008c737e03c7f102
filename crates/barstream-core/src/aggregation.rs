//! Folding base-timeframe bars into coarser timeframes.

use tracing::{debug, trace};

use crate::error::{ConfigurationError, SequenceError};
use crate::num::Num;
use crate::types::{Bar, Timeframe};

/// Open bucket for one target timeframe.
#[derive(Debug, Clone, Copy)]
struct Accumulator<N> {
    bucket_start: i64,
    open: N,
    high: N,
    low: N,
    close: N,
    volume: N,
}

impl<N: Num> Accumulator<N> {
    fn seed(bucket_start: i64, bar: &Bar<N>) -> Self {
        Self {
            bucket_start,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }

    fn fold(&mut self, bar: &Bar<N>) {
        self.high = self.high.max(bar.high);
        self.low = self.low.min(bar.low);
        self.close = bar.close;
        self.volume = self.volume + bar.volume;
    }

    fn to_bar(&self, timeframe: Timeframe) -> Bar<N> {
        Bar::new(
            timeframe,
            self.bucket_start,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
        )
    }
}

#[derive(Debug, Clone)]
struct Target<N> {
    timeframe: Timeframe,
    open: Option<Accumulator<N>>,
}

/// Folds one asset's base bars into one or more coarser timeframes.
///
/// Buckets are aligned on `t - (t mod duration)` of each bar's begin time.
/// A bucket is emitted as soon as an incoming bar covers its end, or when a
/// bar from a later bucket arrives first (gaps in the base stream). Bars are
/// expected in non-decreasing time order; out-of-order and duplicate bars are
/// folded as they come.
#[derive(Debug, Clone)]
pub struct BarAggregator<N> {
    source: Timeframe,
    targets: Vec<Target<N>>,
}

impl<N: Num> BarAggregator<N> {
    /// Fails if `targets` is empty or any target is not a whole multiple of `source`.
    pub fn new(source: Timeframe, targets: &[Timeframe]) -> Result<Self, ConfigurationError> {
        if targets.is_empty() {
            return Err(ConfigurationError::NoAggregationTargets(source));
        }
        let mut validated: Vec<Target<N>> = Vec::with_capacity(targets.len());
        for &target in targets {
            if !source.divides(target) {
                return Err(ConfigurationError::InvalidAggregationRatio {
                    base: source,
                    target,
                });
            }
            if validated.iter().any(|t| t.timeframe == target) {
                continue;
            }
            validated.push(Target {
                timeframe: target,
                open: None,
            });
        }
        Ok(Self {
            source,
            targets: validated,
        })
    }

    pub fn source(&self) -> Timeframe {
        self.source
    }

    pub fn targets(&self) -> impl Iterator<Item = Timeframe> + '_ {
        self.targets.iter().map(|t| t.timeframe)
    }

    /// Fold one base bar; returns the bars completed by it, in target order.
    pub fn on_bar(&mut self, bar: &Bar<N>) -> Result<Vec<Bar<N>>, SequenceError> {
        if bar.timeframe != self.source {
            return Err(SequenceError::WrongTimeframe {
                expected: self.source,
                actual: bar.timeframe,
            });
        }

        let mut completed = Vec::new();
        for target in self.targets.iter_mut() {
            let timeframe = target.timeframe;
            let bucket_start = timeframe.bucket_start(bar.begin_time);

            match target.open.as_mut() {
                Some(acc) if acc.bucket_start == bucket_start => {
                    acc.fold(bar);
                    trace!(%timeframe, bucket_start, "folded bar");
                }
                Some(acc) => {
                    debug!(%timeframe, bucket_start = acc.bucket_start, "emitting bucket left open by a gap");
                    completed.push(acc.to_bar(timeframe));
                    target.open = Some(Accumulator::seed(bucket_start, bar));
                }
                None => {
                    target.open = Some(Accumulator::seed(bucket_start, bar));
                }
            }

            if bar.end_time >= bucket_start + timeframe.duration_millis() {
                if let Some(acc) = target.open.take() {
                    debug!(%timeframe, bucket_start = acc.bucket_start, "bucket complete");
                    completed.push(acc.to_bar(timeframe));
                }
            }
        }
        Ok(completed)
    }

    /// Emit and clear every open bucket, e.g. at the end of a stream.
    pub fn flush(&mut self) -> Vec<Bar<N>> {
        self.targets
            .iter_mut()
            .filter_map(|t| t.open.take().map(|acc| acc.to_bar(t.timeframe)))
            .collect()
    }

    /// Snapshot of the open bucket for `timeframe`, if any.
    pub fn pending(&self, timeframe: Timeframe) -> Option<Bar<N>> {
        self.targets
            .iter()
            .find(|t| t.timeframe == timeframe)
            .and_then(|t| t.open.map(|acc| acc.to_bar(timeframe)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::DecimalNum;
    use rust_decimal_macros::dec;

    const MIN: i64 = 60_000;

    fn minute_bar(i: i64) -> Bar<f64> {
        let base = i as f64;
        Bar::new(
            Timeframe::Minute1,
            i * MIN,
            100.0 + base,
            110.0 + base,
            90.0 + base,
            105.0 + base,
            1000.0 + 10.0 * base,
        )
    }

    #[test]
    fn test_five_minutes_into_one() {
        let mut agg = BarAggregator::new(Timeframe::Minute1, &[Timeframe::Minute5]).unwrap();
        let mut emitted = Vec::new();
        for i in 0..5 {
            emitted.extend(agg.on_bar(&minute_bar(i)).unwrap());
        }

        assert_eq!(emitted.len(), 1);
        let bar = emitted[0];
        assert_eq!(bar.timeframe, Timeframe::Minute5);
        assert_eq!(bar.begin_time, 0);
        assert_eq!(bar.end_time, 5 * MIN);
        assert_eq!(bar.open, 100.0);
        assert_eq!(bar.high, 114.0);
        assert_eq!(bar.low, 90.0);
        assert_eq!(bar.close, 109.0);
        assert_eq!(bar.volume, 5100.0);
        assert!(agg.pending(Timeframe::Minute5).is_none());
    }

    #[test]
    fn test_emits_floor_n_over_k() {
        for n in 0..40 {
            let mut agg =
                BarAggregator::new(Timeframe::Minute1, &[Timeframe::Minute5, Timeframe::Minute15])
                    .unwrap();
            let mut fives = 0;
            let mut fifteens = 0;
            for i in 0..n {
                for bar in agg.on_bar(&minute_bar(i)).unwrap() {
                    match bar.timeframe {
                        Timeframe::Minute5 => fives += 1,
                        Timeframe::Minute15 => fifteens += 1,
                        other => panic!("unexpected {other}"),
                    }
                }
            }
            assert_eq!(fives, n / 5, "n = {n}");
            assert_eq!(fifteens, n / 15, "n = {n}");
        }
    }

    #[test]
    fn test_constituent_folding_matches_reduction() {
        let mut agg = BarAggregator::new(Timeframe::Minute1, &[Timeframe::Minute15]).unwrap();
        let closes = [3.0, 7.0, 1.0, 9.0, 4.0, 4.0, 2.0, 8.0, 6.0, 5.0, 1.5, 7.5, 3.5, 2.5, 6.5];
        let bars: Vec<Bar<f64>> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(Timeframe::Minute1, i as i64 * MIN, c, c + 1.0, c - 1.0, c, c * 10.0))
            .collect();

        let mut out = Vec::new();
        for bar in &bars {
            out.extend(agg.on_bar(bar).unwrap());
        }
        assert_eq!(out.len(), 1);
        let agg_bar = out[0];
        assert_eq!(agg_bar.open, bars[0].open);
        assert_eq!(agg_bar.close, bars[14].close);
        assert_eq!(agg_bar.high, bars.iter().map(|b| b.high).fold(f64::MIN, f64::max));
        assert_eq!(agg_bar.low, bars.iter().map(|b| b.low).fold(f64::MAX, f64::min));
        assert_eq!(agg_bar.volume, bars.iter().map(|b| b.volume).sum::<f64>());
    }

    #[test]
    fn test_gap_emits_partial_bucket() {
        let mut agg = BarAggregator::new(Timeframe::Minute1, &[Timeframe::Minute5]).unwrap();
        assert!(agg.on_bar(&minute_bar(0)).unwrap().is_empty());
        assert!(agg.on_bar(&minute_bar(1)).unwrap().is_empty());
        // Minutes 2..=6 missing; minute 7 belongs to the next bucket.
        let out = agg.on_bar(&minute_bar(7)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].begin_time, 0);
        assert_eq!(out[0].close, 106.0);
        assert_eq!(agg.pending(Timeframe::Minute5).unwrap().begin_time, 5 * MIN);
    }

    #[test]
    fn test_unaligned_start() {
        let mut agg = BarAggregator::new(Timeframe::Minute1, &[Timeframe::Minute5]).unwrap();
        let mut out = Vec::new();
        for i in 3..10 {
            out.extend(agg.on_bar(&minute_bar(i)).unwrap());
        }
        // [3, 4] closes the first bucket, [5..9] closes the second.
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].open, 103.0);
        assert_eq!(out[0].volume, 1030.0 + 1040.0);
        assert_eq!(out[1].begin_time, 5 * MIN);
    }

    #[test]
    fn test_out_of_order_bar_folds_as_is() {
        let mut agg = BarAggregator::new(Timeframe::Minute1, &[Timeframe::Minute5]).unwrap();
        agg.on_bar(&minute_bar(2)).unwrap();
        agg.on_bar(&minute_bar(1)).unwrap();
        agg.on_bar(&minute_bar(1)).unwrap();

        let pending = agg.pending(Timeframe::Minute5).unwrap();
        assert_eq!(pending.open, 102.0);
        assert_eq!(pending.close, 106.0);
        assert_eq!(pending.volume, 1020.0 + 1010.0 + 1010.0);
    }

    #[test]
    fn test_invalid_ratio_fails_fast() {
        let err = BarAggregator::<f64>::new(Timeframe::Minute5, &[Timeframe::Minute1]).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::InvalidAggregationRatio {
                base: Timeframe::Minute5,
                target: Timeframe::Minute1,
            }
        );
        assert!(BarAggregator::<f64>::new(Timeframe::Weekly, &[Timeframe::Monthly]).is_err());
        assert!(BarAggregator::<f64>::new(Timeframe::Minute1, &[]).is_err());
    }

    #[test]
    fn test_wrong_source_timeframe() {
        let mut agg = BarAggregator::new(Timeframe::Minute5, &[Timeframe::Hour1]).unwrap();
        assert!(matches!(
            agg.on_bar(&minute_bar(0)),
            Err(SequenceError::WrongTimeframe { .. })
        ));
    }

    #[test]
    fn test_flush_drains_partial() {
        let mut agg = BarAggregator::new(Timeframe::Minute1, &[Timeframe::Hour1]).unwrap();
        for i in 0..3 {
            agg.on_bar(&minute_bar(i)).unwrap();
        }
        let flushed = agg.flush();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].volume, 1000.0 + 1010.0 + 1020.0);
        assert!(agg.flush().is_empty());
    }

    #[test]
    fn test_decimal_aggregation() {
        let mut agg = BarAggregator::new(Timeframe::Minute1, &[Timeframe::Minute5]).unwrap();
        let mut out = Vec::new();
        for i in 0..5 {
            let bar: Bar<DecimalNum> = Bar::new(
                Timeframe::Minute1,
                i * MIN,
                DecimalNum::from(dec!(0.1)),
                DecimalNum::from(dec!(0.3)),
                DecimalNum::from(dec!(0.05)),
                DecimalNum::from(dec!(0.2)),
                DecimalNum::from(dec!(0.1)),
            );
            out.extend(agg.on_bar(&bar).unwrap());
        }
        assert_eq!(out[0].volume.decimal(), Some(dec!(0.5)));
    }
}
