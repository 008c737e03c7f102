//! Incremental indicator contract.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::num::Num;
use crate::types::Bar;

/// Identity token of an indicator inside one indicator context.
///
/// Tokens are handed out at registration time; lookups never go through
/// names, so two indicators may share a display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndicatorId(usize);

impl IndicatorId {
    /// Only contexts mint ids; external code receives them from registration.
    #[doc(hidden)]
    pub const fn from_index(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for IndicatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Read-only view of dependency outputs, already updated for the current bar.
#[derive(Debug, Clone, Copy)]
pub struct InputValues<'a, N> {
    values: &'a [N],
    stable: &'a [bool],
}

impl<'a, N: Num> InputValues<'a, N> {
    pub fn new(values: &'a [N], stable: &'a [bool]) -> Self {
        Self { values, stable }
    }

    /// An empty view, for driving source indicators directly.
    pub fn empty() -> Self {
        Self {
            values: &[],
            stable: &[],
        }
    }

    /// Current value of a dependency, NaN when unknown.
    pub fn value(&self, id: IndicatorId) -> N {
        self.values.get(id.index()).copied().unwrap_or_else(N::nan)
    }

    pub fn is_stable(&self, id: IndicatorId) -> bool {
        self.stable.get(id.index()).copied().unwrap_or(false)
    }
}

/// A stateful function mapping a bar stream to a value stream.
///
/// Indicators are pushed exactly one bar at a time. Before `on_bar` runs,
/// every indicator listed by [`Indicator::inputs`] has already processed the
/// same bar. Calling `on_bar` twice for one bar double counts internal
/// accumulators; preventing that is the caller's job.
pub trait Indicator<N: Num>: Send {
    /// Short kind name, e.g. `"SMA"`.
    fn name(&self) -> &str;

    /// Indicators whose values this one reads.
    fn inputs(&self) -> &[IndicatorId] {
        &[]
    }

    /// Update with a new bar.
    fn on_bar(&mut self, bar: &Bar<N>, inputs: &InputValues<'_, N>);

    /// Current value, NaN while not computable.
    fn value(&self) -> N;

    /// Whether enough history has been seen. Once true, stays true.
    fn is_stable(&self) -> bool;

    /// Minimum number of valid input samples before stability is possible.
    fn lag(&self) -> usize;

    /// Drop all accumulated state.
    fn reset(&mut self);
}
