//! Highest and lowest value over a trailing window.

use barstream_core::error::ConfigurationError;
use barstream_core::num::Num;
use barstream_core::traits::{Indicator, IndicatorId, InputValues};
use barstream_core::types::Bar;
use barstream_core::window::{ExtremumKind, RollingExtremum};

/// Shared body of [`Highest`] and [`Lowest`].
#[derive(Debug, Clone)]
struct Extremum<N> {
    inputs: [IndicatorId; 1],
    window: RollingExtremum<N>,
}

impl<N: Num> Extremum<N> {
    fn new(input: IndicatorId, kind: ExtremumKind, period: usize) -> Result<Self, ConfigurationError> {
        Ok(Self {
            inputs: [input],
            window: RollingExtremum::new(kind, period)?,
        })
    }

    fn on_bar(&mut self, inputs: &InputValues<'_, N>) {
        let value = inputs.value(self.inputs[0]);
        if !value.is_nan() {
            self.window.push(value);
        }
    }

    fn is_stable(&self) -> bool {
        self.window.count() >= self.window.window()
    }

    fn value(&self) -> N {
        if self.is_stable() {
            self.window.current()
        } else {
            N::nan()
        }
    }
}

/// Highest input value over the last N valid samples.
#[derive(Debug, Clone)]
pub struct Highest<N>(Extremum<N>);

impl<N: Num> Highest<N> {
    pub fn new(input: IndicatorId, period: usize) -> Result<Self, ConfigurationError> {
        Extremum::new(input, ExtremumKind::Max, period).map(Self)
    }

    /// Samples since the highest value (`0` = the latest sample).
    pub fn bars_since(&self) -> Option<usize> {
        self.0.window.index_of_current()
    }
}

/// Lowest input value over the last N valid samples.
#[derive(Debug, Clone)]
pub struct Lowest<N>(Extremum<N>);

impl<N: Num> Lowest<N> {
    pub fn new(input: IndicatorId, period: usize) -> Result<Self, ConfigurationError> {
        Extremum::new(input, ExtremumKind::Min, period).map(Self)
    }

    pub fn bars_since(&self) -> Option<usize> {
        self.0.window.index_of_current()
    }
}

macro_rules! impl_extremum_indicator {
    ($ty:ident, $name:literal) => {
        impl<N: Num> Indicator<N> for $ty<N> {
            fn name(&self) -> &str {
                $name
            }

            fn inputs(&self) -> &[IndicatorId] {
                &self.0.inputs
            }

            fn on_bar(&mut self, _bar: &Bar<N>, inputs: &InputValues<'_, N>) {
                self.0.on_bar(inputs);
            }

            fn value(&self) -> N {
                self.0.value()
            }

            fn is_stable(&self) -> bool {
                self.0.is_stable()
            }

            fn lag(&self) -> usize {
                self.0.window.window()
            }

            fn reset(&mut self) {
                self.0.window.clear();
            }
        }
    };
}

impl_extremum_indicator!(Highest, "Highest");
impl_extremum_indicator!(Lowest, "Lowest");
