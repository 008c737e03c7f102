//! Sliding-window primitives used by streaming indicators.

mod extremum;
mod ring_buffer;

pub use extremum::{ExtremumKind, RollingExtremum};
pub use ring_buffer::{NanRingBuffer, RingBuffer};
