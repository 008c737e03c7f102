//! Rolling highest/lowest value over a trailing window.

use std::collections::VecDeque;

use crate::error::ConfigurationError;
use crate::num::Num;

/// Which extremum a [`RollingExtremum`] tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtremumKind {
    Max,
    Min,
}

impl ExtremumKind {
    /// Whether `incoming` evicts `stored` from the back of the deque.
    /// Ties evict, so the newest equal extreme wins.
    #[inline]
    fn dominates<N: Num>(&self, incoming: N, stored: N) -> bool {
        match self {
            ExtremumKind::Max => stored <= incoming,
            ExtremumKind::Min => stored >= incoming,
        }
    }
}

/// Monotonic deque of `(sample index, value)`.
///
/// The front always holds the extremum of the last `window` samples.
/// Amortized O(1) per update. NaN samples advance the window but never
/// become the extremum.
#[derive(Debug, Clone)]
pub struct RollingExtremum<N> {
    kind: ExtremumKind,
    window: usize,
    deque: VecDeque<(usize, N)>,
    /// Index the next sample will get
    next_index: usize,
}

impl<N: Num> RollingExtremum<N> {
    pub fn new(kind: ExtremumKind, window: usize) -> Result<Self, ConfigurationError> {
        if window == 0 {
            return Err(ConfigurationError::NonPositiveWindow {
                name: format!("rolling {:?}", kind).to_lowercase(),
            });
        }
        Ok(Self {
            kind,
            window,
            deque: VecDeque::with_capacity(window),
            next_index: 0,
        })
    }

    pub fn max(window: usize) -> Result<Self, ConfigurationError> {
        Self::new(ExtremumKind::Max, window)
    }

    pub fn min(window: usize) -> Result<Self, ConfigurationError> {
        Self::new(ExtremumKind::Min, window)
    }

    /// Add a sample and return the extremum of the current window.
    pub fn push(&mut self, value: N) -> N {
        let index = self.next_index;
        self.next_index += 1;

        if !value.is_nan() {
            while let Some(&(_, stored)) = self.deque.back() {
                if self.kind.dominates(value, stored) {
                    self.deque.pop_back();
                } else {
                    break;
                }
            }
            self.deque.push_back((index, value));
        }

        while let Some(&(front, _)) = self.deque.front() {
            if front + self.window <= index {
                self.deque.pop_front();
            } else {
                break;
            }
        }

        self.current()
    }

    /// Extremum of the current window, NaN before any valid sample.
    pub fn current(&self) -> N {
        self.deque.front().map(|&(_, value)| value).unwrap_or_else(N::nan)
    }

    /// How many samples ago the current extremum was seen (`0` = latest).
    pub fn index_of_current(&self) -> Option<usize> {
        self.deque
            .front()
            .map(|&(index, _)| self.next_index - 1 - index)
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn kind(&self) -> ExtremumKind {
        self.kind
    }

    /// Samples seen so far.
    pub fn count(&self) -> usize {
        self.next_index
    }

    pub fn clear(&mut self) {
        self.deque.clear();
        self.next_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn brute_force(values: &[f64], i: usize, window: usize, kind: ExtremumKind) -> f64 {
        let start = (i + 1).saturating_sub(window);
        let slice = &values[start..=i];
        match kind {
            ExtremumKind::Max => slice.iter().copied().fold(f64::MIN, f64::max),
            ExtremumKind::Min => slice.iter().copied().fold(f64::MAX, f64::min),
        }
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(RollingExtremum::<f64>::max(0).is_err());
    }

    #[test]
    fn test_rolling_max_known_sequence() {
        let mut max = RollingExtremum::max(3).unwrap();
        let outputs: Vec<f64> = [1.0, 3.0, 2.0, 1.0, 0.5, 4.0]
            .into_iter()
            .map(|v| max.push(v))
            .collect();
        assert_eq!(outputs, vec![1.0, 3.0, 3.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn test_rolling_min_known_sequence() {
        let mut min = RollingExtremum::min(2).unwrap();
        let outputs: Vec<f64> = [5.0, 4.0, 6.0, 7.0, 1.0]
            .into_iter()
            .map(|v| min.push(v))
            .collect();
        assert_eq!(outputs, vec![5.0, 4.0, 4.0, 6.0, 1.0]);
    }

    #[test]
    fn test_ties_keep_newest() {
        let mut max = RollingExtremum::max(3).unwrap();
        max.push(5.0);
        max.push(5.0);
        assert_eq!(max.index_of_current(), Some(0));
        max.push(1.0);
        max.push(1.0);
        // The second 5.0 is still inside the window.
        assert_eq!(max.current(), 5.0);
        assert_eq!(max.index_of_current(), Some(2));
    }

    #[test]
    fn test_nan_is_skipped_but_ages_window() {
        let mut max: RollingExtremum<f64> = RollingExtremum::max(2).unwrap();
        assert!(max.current().is_nan());
        max.push(3.0);
        assert_eq!(max.push(f64::NAN), 3.0);
        assert!(max.push(f64::NAN).is_nan());
        assert_eq!(max.push(1.0), 1.0);
    }

    proptest! {
        #[test]
        fn rolling_extremum_matches_brute_force(
            values in proptest::collection::vec(-1_000.0..1_000.0_f64, 1..200),
            window in 1usize..20,
        ) {
            let mut max = RollingExtremum::max(window).unwrap();
            let mut min = RollingExtremum::min(window).unwrap();
            for (i, &value) in values.iter().enumerate() {
                prop_assert_eq!(max.push(value), brute_force(&values, i, window, ExtremumKind::Max));
                prop_assert_eq!(min.push(value), brute_force(&values, i, window, ExtremumKind::Min));
            }
        }

        #[test]
        fn rolling_extremum_handles_plateaus(
            values in proptest::collection::vec(0..5i32, 1..100),
            window in 1usize..8,
        ) {
            let values: Vec<f64> = values.into_iter().map(f64::from).collect();
            let mut max = RollingExtremum::max(window).unwrap();
            for (i, &value) in values.iter().enumerate() {
                prop_assert_eq!(max.push(value), brute_force(&values, i, window, ExtremumKind::Max));
            }
        }
    }
}
