//! Moving average indicators.

use barstream_core::error::ConfigurationError;
use barstream_core::num::Num;
use barstream_core::traits::{Indicator, IndicatorId, InputValues};
use barstream_core::types::Bar;
use barstream_core::window::RingBuffer;

fn check_period(name: &str, period: usize) -> Result<(), ConfigurationError> {
    if period == 0 {
        return Err(ConfigurationError::NonPositiveWindow {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Simple Moving Average (SMA).
///
/// Arithmetic mean of the last N valid input values, kept as a running sum
/// over a ring buffer.
#[derive(Debug, Clone)]
pub struct Sma<N> {
    inputs: [IndicatorId; 1],
    period: usize,
    window: RingBuffer<N>,
    sum: N,
}

impl<N: Num> Sma<N> {
    pub fn new(input: IndicatorId, period: usize) -> Result<Self, ConfigurationError> {
        check_period("SMA", period)?;
        Ok(Self {
            inputs: [input],
            period,
            window: RingBuffer::new(period)?,
            sum: N::zero(),
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl<N: Num> Indicator<N> for Sma<N> {
    fn name(&self) -> &str {
        "SMA"
    }

    fn inputs(&self) -> &[IndicatorId] {
        &self.inputs
    }

    fn on_bar(&mut self, _bar: &Bar<N>, inputs: &InputValues<'_, N>) {
        let value = inputs.value(self.inputs[0]);
        if value.is_nan() {
            return;
        }
        let evicted = self.window.push(value).unwrap_or_else(N::zero);
        self.sum = self.sum + value - evicted;
    }

    fn value(&self) -> N {
        if self.window.is_full() {
            self.sum / N::from_usize(self.period)
        } else {
            N::nan()
        }
    }

    fn is_stable(&self) -> bool {
        self.window.is_full()
    }

    fn lag(&self) -> usize {
        self.period
    }

    fn reset(&mut self) {
        self.window.clear();
        self.sum = N::zero();
    }
}

/// Exponential Moving Average (EMA).
///
/// Seeded with the SMA of the first N valid values, then
/// `ema = value * k + ema * (1 - k)` with `k = 2 / (N + 1)`.
#[derive(Debug, Clone)]
pub struct Ema<N> {
    inputs: [IndicatorId; 1],
    period: usize,
    multiplier: N,
    current: N,
    count: usize,
    sum: N,
}

impl<N: Num> Ema<N> {
    pub fn new(input: IndicatorId, period: usize) -> Result<Self, ConfigurationError> {
        check_period("EMA", period)?;
        let multiplier = N::from_i64(2) / N::from_usize(period + 1);
        Ok(Self {
            inputs: [input],
            period,
            multiplier,
            current: N::nan(),
            count: 0,
            sum: N::zero(),
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl<N: Num> Indicator<N> for Ema<N> {
    fn name(&self) -> &str {
        "EMA"
    }

    fn inputs(&self) -> &[IndicatorId] {
        &self.inputs
    }

    fn on_bar(&mut self, _bar: &Bar<N>, inputs: &InputValues<'_, N>) {
        let value = inputs.value(self.inputs[0]);
        if value.is_nan() {
            return;
        }
        self.count += 1;

        if self.count < self.period {
            // Accumulating for initial SMA
            self.sum = self.sum + value;
        } else if self.count == self.period {
            self.sum = self.sum + value;
            self.current = self.sum / N::from_usize(self.period);
        } else {
            self.current = value * self.multiplier + self.current * (N::one() - self.multiplier);
        }
    }

    fn value(&self) -> N {
        self.current
    }

    fn is_stable(&self) -> bool {
        self.count >= self.period
    }

    fn lag(&self) -> usize {
        self.period
    }

    fn reset(&mut self) {
        self.current = N::nan();
        self.count = 0;
        self.sum = N::zero();
    }
}
