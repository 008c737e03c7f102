//! Shared runtime state read by rules: current bar, time and position.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;

use crate::num::Num;
use crate::traits::BarListener;
use crate::types::{Bar, PositionStatus, PriceField, Side, Timeframe};

/// Keys understood by [`RuntimeContext::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeKey {
    /// A field of the latest bar
    Price(PriceField),
    /// End time of the latest bar
    Time,
    Timeframe,
    /// Bars seen so far
    BarCount,
    PositionStatus,
    PositionSide,
    EntryPrice,
    EntryTime,
    PositionAmount,
    /// Bars seen since the current position was entered
    BarsInPosition,
    /// Value stored with [`RuntimeContext::set_custom`]
    Custom(&'static str),
}

/// Value returned by the runtime resolver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuntimeValue<N> {
    Num(N),
    Time(i64),
    Count(u64),
    Timeframe(Timeframe),
    Status(PositionStatus),
    Side(Side),
}

impl<N: Num> RuntimeValue<N> {
    pub fn as_num(&self) -> Option<N> {
        match self {
            RuntimeValue::Num(n) => Some(*n),
            RuntimeValue::Count(c) => Some(N::from_i64(*c as i64)),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<i64> {
        match self {
            RuntimeValue::Time(t) => Some(*t),
            _ => None,
        }
    }
}

/// Summary of the ledger's current position, pushed into the runtime context
/// after each ledger mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot<N> {
    pub status: PositionStatus,
    pub side: Side,
    pub entry_price: Option<N>,
    pub entry_time: Option<i64>,
    pub amount: Option<N>,
}

impl<N> PositionSnapshot<N> {
    /// A position with no trade yet.
    pub fn flat(side: Side) -> Self {
        Self {
            status: PositionStatus::New,
            side,
            entry_price: None,
            entry_time: None,
            amount: None,
        }
    }
}

/// Key-based resolver for state that is neither an indicator nor a bar
/// series: the latest bar, elapsed bars and the current position.
///
/// Registered as a listener on a series so it always reflects the bar that
/// triggered rule evaluation.
#[derive(Debug, Clone)]
pub struct RuntimeContext<N> {
    timeframe: Option<Timeframe>,
    current: Option<Bar<N>>,
    bar_count: u64,
    position: PositionSnapshot<N>,
    /// Bar count at which the current position was entered
    entry_bar: Option<u64>,
    custom: HashMap<&'static str, N>,
}

impl<N: Num> Default for RuntimeContext<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Num> RuntimeContext<N> {
    pub fn new() -> Self {
        Self {
            timeframe: None,
            current: None,
            bar_count: 0,
            position: PositionSnapshot::flat(Side::Buy),
            entry_bar: None,
            custom: HashMap::new(),
        }
    }

    /// Resolve a key; `None` when the value does not exist yet.
    pub fn resolve(&self, key: RuntimeKey) -> Option<RuntimeValue<N>> {
        match key {
            RuntimeKey::Price(field) => self.current.map(|b| RuntimeValue::Num(b.price(field))),
            RuntimeKey::Time => self.time().map(RuntimeValue::Time),
            RuntimeKey::Timeframe => self.timeframe.map(RuntimeValue::Timeframe),
            RuntimeKey::BarCount => Some(RuntimeValue::Count(self.bar_count)),
            RuntimeKey::PositionStatus => Some(RuntimeValue::Status(self.position.status)),
            RuntimeKey::PositionSide => Some(RuntimeValue::Side(self.position.side)),
            RuntimeKey::EntryPrice => self.position.entry_price.map(RuntimeValue::Num),
            RuntimeKey::EntryTime => self.position.entry_time.map(RuntimeValue::Time),
            RuntimeKey::PositionAmount => self.position.amount.map(RuntimeValue::Num),
            RuntimeKey::BarsInPosition => self.bars_in_position().map(RuntimeValue::Count),
            RuntimeKey::Custom(name) => self.custom.get(name).copied().map(RuntimeValue::Num),
        }
    }

    /// Close of the latest bar, NaN before the first bar.
    pub fn price(&self) -> N {
        self.current.map(|b| b.close).unwrap_or_else(N::nan)
    }

    pub fn time(&self) -> Option<i64> {
        self.current.map(|b| b.end_time)
    }

    pub fn current_bar(&self) -> Option<&Bar<N>> {
        self.current.as_ref()
    }

    pub fn bar_count(&self) -> u64 {
        self.bar_count
    }

    pub fn position(&self) -> &PositionSnapshot<N> {
        &self.position
    }

    pub fn bars_in_position(&self) -> Option<u64> {
        self.entry_bar.map(|entry| self.bar_count - entry)
    }

    /// Replace the position summary.
    pub fn update_position(&mut self, snapshot: PositionSnapshot<N>) {
        let was_open = self.position.status == PositionStatus::Opened;
        let is_open = snapshot.status == PositionStatus::Opened;
        if is_open && !was_open {
            self.entry_bar = Some(self.bar_count);
        } else if !is_open {
            self.entry_bar = None;
        }
        self.position = snapshot;
    }

    pub fn set_custom(&mut self, name: &'static str, value: N) {
        self.custom.insert(name, value);
    }

    pub fn clear_custom(&mut self, name: &'static str) -> Option<N> {
        self.custom.remove(name)
    }
}

impl<N: Num> BarListener<N> for RuntimeContext<N> {
    fn on_bar(&mut self, bar: &Bar<N>) {
        self.timeframe = Some(bar.timeframe);
        self.current = Some(*bar);
        self.bar_count += 1;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
