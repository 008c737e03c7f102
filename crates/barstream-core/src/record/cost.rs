//! Pluggable transaction and holding cost models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::position::Position;
use crate::error::ConfigurationError;
use crate::num::Num;
use crate::types::{Side, Timeframe};

/// Pure cost function over fills and positions.
///
/// A ledger holds two independent models: one charged per fill
/// (transaction) and one accrued over time in trade (holding).
pub trait CostModel<N: Num>: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Cost of a single fill.
    fn calculate_trade(&self, price: N, amount: N) -> N;

    /// Cost of a position as it stands. Open positions are charged up to
    /// their entry; closed ones up to their exit.
    fn calculate_position(&self, position: &Position<N>) -> N;

    /// Cost of a position evaluated at `time`.
    fn calculate_position_at(&self, position: &Position<N>, time: i64) -> N {
        let _ = time;
        self.calculate_position(position)
    }
}

/// Charges nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZeroCostModel;

impl<N: Num> CostModel<N> for ZeroCostModel {
    fn name(&self) -> &'static str {
        "zero"
    }

    fn calculate_trade(&self, _price: N, _amount: N) -> N {
        N::zero()
    }

    fn calculate_position(&self, _position: &Position<N>) -> N {
        N::zero()
    }
}

/// A flat fee per fill, independent of price and amount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedTransactionCostModel<N> {
    fee_per_trade: N,
}

impl<N: Num> FixedTransactionCostModel<N> {
    pub fn new(fee_per_trade: N) -> Self {
        Self { fee_per_trade }
    }
}

impl<N: Num> CostModel<N> for FixedTransactionCostModel<N> {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn calculate_trade(&self, _price: N, _amount: N) -> N {
        self.fee_per_trade
    }

    fn calculate_position(&self, position: &Position<N>) -> N {
        self.fee_per_trade * N::from_usize(position.trade_count())
    }
}

/// A fraction of the notional value of each fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTransactionCostModel<N> {
    fee_rate: N,
}

impl<N: Num> LinearTransactionCostModel<N> {
    pub fn new(fee_rate: N) -> Self {
        Self { fee_rate }
    }
}

impl<N: Num> CostModel<N> for LinearTransactionCostModel<N> {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn calculate_trade(&self, price: N, amount: N) -> N {
        self.fee_rate * price * amount
    }

    fn calculate_position(&self, position: &Position<N>) -> N {
        [position.entry(), position.exit()]
            .into_iter()
            .flatten()
            .fold(N::zero(), |acc, t| acc + self.calculate_trade(t.price, t.amount))
    }
}

/// Time-based borrowing fee for short positions.
///
/// A short position is charged `entry value * rate * elapsed / period`.
/// Long positions and fills cost nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearBorrowingCostModel<N> {
    rate_per_period: N,
    period_millis: i64,
}

impl<N: Num> LinearBorrowingCostModel<N> {
    /// Charge `rate_per_period` for every elapsed `period`.
    pub fn new(rate_per_period: N, period: Timeframe) -> Self {
        Self {
            rate_per_period,
            period_millis: period.duration_millis(),
        }
    }

    /// Daily borrowing rate.
    pub fn daily(rate_per_day: N) -> Self {
        Self::new(rate_per_day, Timeframe::Daily)
    }

    fn charge(&self, position: &Position<N>, until: i64) -> N {
        let Some(entry) = position.entry() else {
            return N::zero();
        };
        if position.starting_side() != Side::Sell {
            return N::zero();
        }
        let elapsed = (until - entry.time).max(0);
        let periods = N::from_i64(elapsed) / N::from_i64(self.period_millis);
        entry.value() * self.rate_per_period * periods
    }
}

impl<N: Num> CostModel<N> for LinearBorrowingCostModel<N> {
    fn name(&self) -> &'static str {
        "borrowing"
    }

    fn calculate_trade(&self, _price: N, _amount: N) -> N {
        N::zero()
    }

    fn calculate_position(&self, position: &Position<N>) -> N {
        match (position.entry(), position.exit()) {
            (Some(_), Some(exit)) => self.charge(position, exit.time),
            _ => N::zero(),
        }
    }

    fn calculate_position_at(&self, position: &Position<N>, time: i64) -> N {
        let until = match position.exit() {
            Some(exit) => exit.time.min(time),
            None => time,
        };
        self.charge(position, until)
    }
}

/// Serializable description of a cost model, resolved into a concrete
/// model for the pipeline's numeric type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CostModelSpec {
    #[default]
    Zero,
    Fixed {
        fee: f64,
    },
    Linear {
        rate: f64,
    },
    Borrowing {
        rate: f64,
        #[serde(default = "default_borrowing_period")]
        period: Timeframe,
    },
}

fn default_borrowing_period() -> Timeframe {
    Timeframe::Daily
}

impl CostModelSpec {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let (label, value) = match self {
            CostModelSpec::Zero => return Ok(()),
            CostModelSpec::Fixed { fee } => ("fixed fee", *fee),
            CostModelSpec::Linear { rate } => ("linear rate", *rate),
            CostModelSpec::Borrowing { rate, .. } => ("borrowing rate", *rate),
        };
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigurationError::InvalidParameter(format!(
                "{label} must be a non-negative number, got {value}"
            )));
        }
        Ok(())
    }

    pub fn build<N: Num>(&self) -> Arc<dyn CostModel<N>> {
        match *self {
            CostModelSpec::Zero => Arc::new(ZeroCostModel),
            CostModelSpec::Fixed { fee } => Arc::new(FixedTransactionCostModel::new(N::from_f64(fee))),
            CostModelSpec::Linear { rate } => {
                Arc::new(LinearTransactionCostModel::new(N::from_f64(rate)))
            }
            CostModelSpec::Borrowing { rate, period } => {
                Arc::new(LinearBorrowingCostModel::new(N::from_f64(rate), period))
            }
        }
    }
}
