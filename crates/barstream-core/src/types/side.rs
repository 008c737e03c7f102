//! Trade direction and position lifecycle enums.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::num::Num;

/// Trade side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Buy,
    Sell,
}

impl Side {
    /// Get the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Get the sign for profit calculations (+1 for buy, -1 for sell).
    pub fn sign<N: Num>(&self) -> N {
        match self {
            Side::Buy => N::one(),
            Side::Sell => -N::one(),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Whether a trade opens or closes its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Open,
    Close,
}

/// Lifecycle state of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    /// No trade yet
    #[default]
    New,
    /// Entry trade recorded
    Opened,
    /// Entry and exit recorded; terminal
    Closed,
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionStatus::New => write!(f, "new"),
            PositionStatus::Opened => write!(f, "opened"),
            PositionStatus::Closed => write!(f, "closed"),
        }
    }
}
