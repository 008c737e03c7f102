//! Source indicators reading straight from the bar.

use barstream_core::num::Num;
use barstream_core::traits::{Indicator, InputValues};
use barstream_core::types::{Bar, PriceField};

/// One field of the current bar.
#[derive(Debug, Clone)]
pub struct PriceIndicator<N> {
    field: PriceField,
    value: N,
    stable: bool,
}

impl<N: Num> PriceIndicator<N> {
    pub fn new(field: PriceField) -> Self {
        Self {
            field,
            value: N::nan(),
            stable: false,
        }
    }

    pub fn close() -> Self {
        Self::new(PriceField::Close)
    }

    pub fn open() -> Self {
        Self::new(PriceField::Open)
    }

    pub fn high() -> Self {
        Self::new(PriceField::High)
    }

    pub fn low() -> Self {
        Self::new(PriceField::Low)
    }

    pub fn volume() -> Self {
        Self::new(PriceField::Volume)
    }

    pub fn field(&self) -> PriceField {
        self.field
    }
}

impl<N: Num> Indicator<N> for PriceIndicator<N> {
    fn name(&self) -> &str {
        match self.field {
            PriceField::Open => "Open",
            PriceField::High => "High",
            PriceField::Low => "Low",
            PriceField::Close => "Close",
            PriceField::Volume => "Volume",
            PriceField::Typical => "TypicalPrice",
            PriceField::Median => "MedianPrice",
        }
    }

    fn on_bar(&mut self, bar: &Bar<N>, _inputs: &InputValues<'_, N>) {
        self.value = bar.price(self.field);
        if !self.value.is_nan() {
            self.stable = true;
        }
    }

    fn value(&self) -> N {
        self.value
    }

    fn is_stable(&self) -> bool {
        self.stable
    }

    fn lag(&self) -> usize {
        1
    }

    fn reset(&mut self) {
        self.value = N::nan();
        self.stable = false;
    }
}
