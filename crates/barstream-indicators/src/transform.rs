//! Structural indicators: delayed values and constants.

use barstream_core::error::ConfigurationError;
use barstream_core::num::Num;
use barstream_core::traits::{Indicator, IndicatorId, InputValues};
use barstream_core::types::Bar;
use barstream_core::window::NanRingBuffer;

/// Value of the input `offset` valid samples ago.
#[derive(Debug, Clone)]
pub struct Previous<N> {
    inputs: [IndicatorId; 1],
    offset: usize,
    buffer: NanRingBuffer<N>,
    count: usize,
}

impl<N: Num> Previous<N> {
    pub fn new(input: IndicatorId, offset: usize) -> Result<Self, ConfigurationError> {
        if offset == 0 {
            return Err(ConfigurationError::InvalidParameter(
                "previous offset must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            inputs: [input],
            offset,
            buffer: NanRingBuffer::new(offset + 1)?,
            count: 0,
        })
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<N: Num> Indicator<N> for Previous<N> {
    fn name(&self) -> &str {
        "Previous"
    }

    fn inputs(&self) -> &[IndicatorId] {
        &self.inputs
    }

    fn on_bar(&mut self, _bar: &Bar<N>, inputs: &InputValues<'_, N>) {
        let value = inputs.value(self.inputs[0]);
        if value.is_nan() {
            return;
        }
        self.buffer.push(value);
        self.count += 1;
    }

    fn value(&self) -> N {
        self.buffer.get(self.offset)
    }

    fn is_stable(&self) -> bool {
        self.count > self.offset
    }

    fn lag(&self) -> usize {
        self.offset + 1
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.count = 0;
    }
}

/// A fixed value, stable from the start.
#[derive(Debug, Clone)]
pub struct Constant<N> {
    value: N,
}

impl<N: Num> Constant<N> {
    pub fn new(value: N) -> Self {
        Self { value }
    }
}

impl<N: Num> Indicator<N> for Constant<N> {
    fn name(&self) -> &str {
        "Constant"
    }

    fn on_bar(&mut self, _bar: &Bar<N>, _inputs: &InputValues<'_, N>) {}

    fn value(&self) -> N {
        self.value
    }

    fn is_stable(&self) -> bool {
        true
    }

    fn lag(&self) -> usize {
        1
    }

    fn reset(&mut self) {}
}
