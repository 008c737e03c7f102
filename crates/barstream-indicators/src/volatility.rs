//! Volatility indicators.

use barstream_core::error::ConfigurationError;
use barstream_core::num::Num;
use barstream_core::traits::{Indicator, IndicatorId, InputValues};
use barstream_core::types::Bar;
use barstream_core::window::RingBuffer;

/// Population standard deviation of the last N valid input values.
#[derive(Debug, Clone)]
pub struct StdDev<N> {
    inputs: [IndicatorId; 1],
    period: usize,
    window: RingBuffer<N>,
    value: N,
}

impl<N: Num> StdDev<N> {
    pub fn new(input: IndicatorId, period: usize) -> Result<Self, ConfigurationError> {
        if period < 2 {
            return Err(ConfigurationError::InvalidParameter(format!(
                "StdDev period must be greater than 1, got {period}"
            )));
        }
        Ok(Self {
            inputs: [input],
            period,
            window: RingBuffer::new(period)?,
            value: N::nan(),
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    fn compute(&self) -> N {
        let n = N::from_usize(self.period);
        let mean = self.window.iter().fold(N::zero(), |acc, &x| acc + x) / n;
        let variance = self
            .window
            .iter()
            .map(|&x| (x - mean) * (x - mean))
            .fold(N::zero(), |acc, sq| acc + sq)
            / n;
        variance.sqrt()
    }
}

impl<N: Num> Indicator<N> for StdDev<N> {
    fn name(&self) -> &str {
        "StdDev"
    }

    fn inputs(&self) -> &[IndicatorId] {
        &self.inputs
    }

    fn on_bar(&mut self, _bar: &Bar<N>, inputs: &InputValues<'_, N>) {
        let value = inputs.value(self.inputs[0]);
        if value.is_nan() {
            return;
        }
        self.window.push(value);
        if self.window.is_full() {
            self.value = self.compute();
        }
    }

    fn value(&self) -> N {
        self.value
    }

    fn is_stable(&self) -> bool {
        self.window.is_full()
    }

    fn lag(&self) -> usize {
        self.period
    }

    fn reset(&mut self) {
        self.window.clear();
        self.value = N::nan();
    }
}
