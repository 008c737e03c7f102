//! Single fills recorded by the ledger.

use serde::{Deserialize, Serialize};

use crate::num::Num;
use crate::types::{OrderType, Side};

/// One fill: the entry or exit of a position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade<N> {
    pub order_type: OrderType,
    pub side: Side,
    /// Unix timestamp in milliseconds
    pub time: i64,
    pub price: N,
    pub amount: N,
    /// Transaction cost charged for this fill
    pub cost: N,
}

impl<N: Num> Trade<N> {
    pub fn new(order_type: OrderType, side: Side, time: i64, price: N, amount: N, cost: N) -> Self {
        Self {
            order_type,
            side,
            time,
            price,
            amount,
            cost,
        }
    }

    /// Notional value (price * amount).
    #[inline]
    pub fn value(&self) -> N {
        self.price * self.amount
    }

    /// Price adjusted by the per-unit cost: buys pay more, sells receive less.
    pub fn net_price(&self) -> N {
        if self.amount.is_zero() {
            return self.price;
        }
        let per_unit = self.cost / self.amount;
        match self.side {
            Side::Buy => self.price + per_unit,
            Side::Sell => self.price - per_unit,
        }
    }

    pub fn is_buy(&self) -> bool {
        self.side == Side::Buy
    }
}
