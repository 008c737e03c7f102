//! Ledger of positions and trades for one strategy run.

use std::sync::Arc;
use tracing::debug;

use super::cost::{CostModel, ZeroCostModel};
use super::position::Position;
use super::trade::Trade;
use crate::num::Num;
use crate::runtime::PositionSnapshot;
use crate::types::{OrderType, PositionStatus, Side};

/// Archived closed positions plus exactly one current, non-closed position.
///
/// `enter` only works while the current position is new and `exit` only
/// while it is open; anything else is a no-op returning `false`. Closing a
/// position archives it and allocates a fresh one with the same starting
/// side and cost models.
#[derive(Debug, Clone)]
pub struct TradingRecord<N: Num> {
    starting_side: Side,
    transaction_model: Arc<dyn CostModel<N>>,
    holding_model: Arc<dyn CostModel<N>>,
    current: Position<N>,
    positions: Vec<Position<N>>,
    trades: Vec<Trade<N>>,
}

impl<N: Num> TradingRecord<N> {
    pub fn new(
        starting_side: Side,
        transaction_model: Arc<dyn CostModel<N>>,
        holding_model: Arc<dyn CostModel<N>>,
    ) -> Self {
        let current = Position::new(starting_side, transaction_model.clone(), holding_model.clone());
        Self {
            starting_side,
            transaction_model,
            holding_model,
            current,
            positions: Vec::new(),
            trades: Vec::new(),
        }
    }

    /// A cost-free ledger.
    pub fn without_costs(starting_side: Side) -> Self {
        Self::new(starting_side, Arc::new(ZeroCostModel), Arc::new(ZeroCostModel))
    }

    /// Open the current position. `false` unless it is new.
    pub fn enter(&mut self, time: i64, price: N, amount: N) -> bool {
        if !self.current.is_new() {
            return false;
        }
        self.operate(time, price, amount)
    }

    /// Close the current position. `false` unless it is open and `amount`
    /// matches the entry amount.
    pub fn exit(&mut self, time: i64, price: N, amount: N) -> bool {
        if !self.current.is_opened() {
            return false;
        }
        self.operate(time, price, amount)
    }

    /// Enter if flat, exit if open.
    pub fn operate(&mut self, time: i64, price: N, amount: N) -> bool {
        let Some(trade) = self.current.operate(time, price, amount) else {
            return false;
        };
        self.trades.push(trade);

        if self.current.is_closed() {
            let fresh = Position::new(
                self.starting_side,
                self.transaction_model.clone(),
                self.holding_model.clone(),
            );
            let closed = std::mem::replace(&mut self.current, fresh);
            debug!(
                gross = %closed.gross_profit(),
                net = %closed.profit(),
                archived = self.positions.len() + 1,
                "position archived"
            );
            self.positions.push(closed);
        }
        true
    }

    /// Feed a mark price to the open position for drawdown tracking.
    pub fn mark_to_market(&mut self, price: N) {
        self.current.observe_price(price);
    }

    pub fn starting_side(&self) -> Side {
        self.starting_side
    }

    pub fn current_position(&self) -> &Position<N> {
        &self.current
    }

    /// Closed positions, oldest first.
    pub fn positions(&self) -> &[Position<N>] {
        &self.positions
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Every fill, in order.
    pub fn trades(&self) -> &[Trade<N>] {
        &self.trades
    }

    pub fn last_trade(&self) -> Option<&Trade<N>> {
        self.trades.last()
    }

    pub fn last_entry(&self) -> Option<&Trade<N>> {
        self.trades.iter().rev().find(|t| t.order_type == OrderType::Open)
    }

    pub fn last_exit(&self) -> Option<&Trade<N>> {
        self.trades.iter().rev().find(|t| t.order_type == OrderType::Close)
    }

    /// Largest intra-position drawdown among closed positions.
    ///
    /// Drawdowns spanning several positions are not combined, so this can
    /// under-estimate the drawdown of the whole equity curve.
    pub fn maximum_drawdown(&self) -> N {
        self.positions
            .iter()
            .map(|p| p.max_drawdown())
            .fold(N::zero(), |acc, d| if d > acc { d } else { acc })
    }

    pub fn total_gross_profit(&self) -> N {
        self.positions
            .iter()
            .fold(N::zero(), |acc, p| acc + p.gross_profit())
    }

    pub fn total_net_profit(&self) -> N {
        self.positions.iter().fold(N::zero(), |acc, p| acc + p.profit())
    }

    /// Transaction costs of every fill, including an open entry.
    pub fn total_transaction_cost(&self) -> N {
        self.trades.iter().fold(N::zero(), |acc, t| acc + t.cost)
    }

    pub fn winning_positions(&self) -> usize {
        self.positions.iter().filter(|p| p.is_profitable()).count()
    }

    /// Summary of the current position for the runtime context.
    pub fn snapshot(&self) -> PositionSnapshot<N> {
        let entry = self.current.entry();
        PositionSnapshot {
            status: self.current.status(),
            side: self.starting_side,
            entry_price: entry.map(|t| t.price),
            entry_time: entry.map(|t| t.time),
            amount: entry.map(|t| t.amount),
        }
    }

    pub fn is_in_position(&self) -> bool {
        self.current.status() == PositionStatus::Opened
    }
}
