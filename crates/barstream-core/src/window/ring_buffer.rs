//! Fixed-capacity ring buffers.

use crate::error::ConfigurationError;
use crate::num::Num;

/// Fixed-capacity buffer keeping the most recent `capacity` values.
///
/// `push` overwrites the slot at `cursor % capacity`; reads are relative to
/// the most recent insert.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    capacity: usize,
    /// Total number of values ever pushed
    cursor: usize,
}

impl<T: Clone> RingBuffer<T> {
    pub fn new(capacity: usize) -> Result<Self, ConfigurationError> {
        if capacity == 0 {
            return Err(ConfigurationError::NonPositiveWindow {
                name: "ring buffer".into(),
            });
        }
        Ok(Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
        })
    }

    /// Append a value, returning the value it evicted once the buffer is full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let slot = self.cursor % self.capacity;
        self.cursor += 1;
        if self.slots.len() < self.capacity {
            self.slots.push(value);
            None
        } else {
            Some(std::mem::replace(&mut self.slots[slot], value))
        }
    }

    /// Value `offset` inserts ago (`0` is the newest).
    pub fn get(&self, offset: usize) -> Option<&T> {
        if offset >= self.slots.len() {
            return None;
        }
        let slot = (self.cursor - 1 - offset) % self.capacity;
        self.slots.get(slot)
    }

    /// The most recent value.
    pub fn latest(&self) -> Option<&T> {
        self.get(0)
    }

    /// The oldest retained value.
    pub fn oldest(&self) -> Option<&T> {
        self.slots.len().checked_sub(1).and_then(|last| self.get(last))
    }

    /// Retained values, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let len = self.slots.len();
        (0..len).rev().filter_map(move |offset| self.get(offset))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of values pushed since creation or the last `clear`.
    #[inline]
    pub fn total_pushed(&self) -> usize {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.cursor = 0;
    }
}

/// Ring buffer of numbers whose unfilled slots read as NaN.
///
/// Iteration from the newest value stops at the first unfilled slot, so a
/// partially filled window never yields stale or default data.
#[derive(Debug, Clone)]
pub struct NanRingBuffer<N> {
    slots: Vec<N>,
    cursor: usize,
}

impl<N: Num> NanRingBuffer<N> {
    pub fn new(capacity: usize) -> Result<Self, ConfigurationError> {
        if capacity == 0 {
            return Err(ConfigurationError::NonPositiveWindow {
                name: "NaN ring buffer".into(),
            });
        }
        Ok(Self {
            slots: vec![N::nan(); capacity],
            cursor: 0,
        })
    }

    pub fn push(&mut self, value: N) -> N {
        let capacity = self.slots.len();
        let slot = self.cursor % capacity;
        self.cursor += 1;
        std::mem::replace(&mut self.slots[slot], value)
    }

    /// Value `offset` inserts ago, NaN if that slot was never filled.
    pub fn get(&self, offset: usize) -> N {
        let capacity = self.slots.len();
        if offset >= capacity || offset >= self.cursor {
            return N::nan();
        }
        self.slots[(self.cursor - 1 - offset) % capacity]
    }

    /// Values from newest to oldest, stopping at the first unfilled slot.
    pub fn iter_recent(&self) -> impl Iterator<Item = N> + '_ {
        (0..self.slots.len())
            .map(move |offset| self.get(offset))
            .take_while(|value| !value.is_nan())
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Whether every slot has been written at least once.
    pub fn is_filled(&self) -> bool {
        self.cursor >= self.slots.len()
    }

    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = N::nan();
        }
        self.cursor = 0;
    }
}
