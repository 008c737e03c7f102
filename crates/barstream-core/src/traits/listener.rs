//! Observers notified by a bar series on every add.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use crate::num::Num;
use crate::types::Bar;

/// Receives every bar accepted by a series, in registration order.
///
/// Listeners are owned by the series. `as_any`/`as_any_mut` give typed access
/// back through a [`ListenerHandle`].
pub trait BarListener<N: Num>: Any + Send {
    fn on_bar(&mut self, bar: &Bar<N>);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Typed token for a listener registered on a series.
pub struct ListenerHandle<L> {
    index: usize,
    _marker: PhantomData<fn() -> L>,
}

impl<L> ListenerHandle<L> {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// Position in the series' notification order.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<L> Clone for ListenerHandle<L> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<L> Copy for ListenerHandle<L> {}

impl<L> PartialEq for ListenerHandle<L> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<L> Eq for ListenerHandle<L> {}

impl<L> fmt::Debug for ListenerHandle<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ListenerHandle").field(&self.index).finish()
    }
}
