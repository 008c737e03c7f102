//! Momentum indicators.

use barstream_core::error::ConfigurationError;
use barstream_core::num::Num;
use barstream_core::traits::{Indicator, IndicatorId, InputValues};
use barstream_core::types::Bar;

/// Relative Strength Index (RSI).
///
/// Measures the speed and magnitude of recent price changes
/// to evaluate overbought or oversold conditions. Gains and losses are
/// smoothed with Wilder's method, seeded by the plain average of the first
/// N changes. Reads 100 when there are no losses.
#[derive(Debug, Clone)]
pub struct Rsi<N> {
    inputs: [IndicatorId; 1],
    period: usize,
    previous: N,
    changes: usize,
    avg_gain: N,
    avg_loss: N,
}

impl<N: Num> Rsi<N> {
    /// Common periods are 14 (default) or 9.
    pub fn new(input: IndicatorId, period: usize) -> Result<Self, ConfigurationError> {
        if period == 0 {
            return Err(ConfigurationError::NonPositiveWindow {
                name: "RSI".to_string(),
            });
        }
        Ok(Self {
            inputs: [input],
            period,
            previous: N::nan(),
            changes: 0,
            avg_gain: N::zero(),
            avg_loss: N::zero(),
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl<N: Num> Indicator<N> for Rsi<N> {
    fn name(&self) -> &str {
        "RSI"
    }

    fn inputs(&self) -> &[IndicatorId] {
        &self.inputs
    }

    fn on_bar(&mut self, _bar: &Bar<N>, inputs: &InputValues<'_, N>) {
        let value = inputs.value(self.inputs[0]);
        if value.is_nan() {
            return;
        }
        if self.previous.is_nan() {
            self.previous = value;
            return;
        }

        let change = value - self.previous;
        self.previous = value;
        let (gain, loss) = if change > N::zero() {
            (change, N::zero())
        } else {
            (N::zero(), -change)
        };

        self.changes += 1;
        let period = N::from_usize(self.period);
        if self.changes <= self.period {
            // Plain sums until the seed average is available
            self.avg_gain = self.avg_gain + gain;
            self.avg_loss = self.avg_loss + loss;
            if self.changes == self.period {
                self.avg_gain = self.avg_gain / period;
                self.avg_loss = self.avg_loss / period;
            }
        } else {
            // Wilder's smoothing: avg = (prev_avg * (period-1) + value) / period
            let keep = period - N::one();
            self.avg_gain = (self.avg_gain * keep + gain) / period;
            self.avg_loss = (self.avg_loss * keep + loss) / period;
        }
    }

    fn value(&self) -> N {
        if !self.is_stable() {
            return N::nan();
        }
        let hundred = N::from_i64(100);
        if self.avg_loss.is_zero() {
            return hundred;
        }
        let rs = self.avg_gain / self.avg_loss;
        hundred - hundred / (N::one() + rs)
    }

    fn is_stable(&self) -> bool {
        self.changes >= self.period
    }

    fn lag(&self) -> usize {
        self.period + 1
    }

    fn reset(&mut self) {
        self.previous = N::nan();
        self.changes = 0;
        self.avg_gain = N::zero();
        self.avg_loss = N::zero();
    }
}
