//! A single round trip: entry trade, exit trade, and what happened between.

use std::sync::Arc;
use tracing::debug;

use super::cost::CostModel;
use super::trade::Trade;
use crate::num::Num;
use crate::types::{OrderType, PositionStatus, Side};

/// Position lifecycle `New -> Opened -> Closed`.
///
/// A long position starts with a buy, a short one with a sell. Once closed,
/// a position no longer changes. Drawdown is tracked from the prices the
/// position observes while open, including its entry and exit.
#[derive(Debug, Clone)]
pub struct Position<N: Num> {
    starting_side: Side,
    entry: Option<Trade<N>>,
    exit: Option<Trade<N>>,
    transaction_model: Arc<dyn CostModel<N>>,
    holding_model: Arc<dyn CostModel<N>>,
    /// Most favorable price seen while open
    best_price: N,
    max_drawdown: N,
}

impl<N: Num> Position<N> {
    pub fn new(
        starting_side: Side,
        transaction_model: Arc<dyn CostModel<N>>,
        holding_model: Arc<dyn CostModel<N>>,
    ) -> Self {
        Self {
            starting_side,
            entry: None,
            exit: None,
            transaction_model,
            holding_model,
            best_price: N::nan(),
            max_drawdown: N::zero(),
        }
    }

    /// Record the next fill.
    ///
    /// The first call opens the position at `amount`, the second closes it
    /// and must repeat the entry amount; partial exits are refused with
    /// `None`. Any call after the close is a no-op returning `None`.
    pub fn operate(&mut self, time: i64, price: N, amount: N) -> Option<Trade<N>> {
        match self.status() {
            PositionStatus::New => {
                let cost = self.transaction_model.calculate_trade(price, amount);
                let trade = Trade::new(OrderType::Open, self.starting_side, time, price, amount, cost);
                self.entry = Some(trade);
                self.observe_price(price);
                debug!(side = %trade.side, %price, %amount, time, "position opened");
                Some(trade)
            }
            PositionStatus::Opened => {
                let entry_amount = self.entry.map(|e| e.amount)?;
                if amount != entry_amount {
                    debug!(%amount, %entry_amount, time, "exit amount differs from entry, refused");
                    return None;
                }
                self.observe_price(price);
                let cost = self.transaction_model.calculate_trade(price, amount);
                let trade = Trade::new(
                    OrderType::Close,
                    self.starting_side.opposite(),
                    time,
                    price,
                    amount,
                    cost,
                );
                self.exit = Some(trade);
                debug!(side = %trade.side, %price, %amount, time, "position closed");
                Some(trade)
            }
            PositionStatus::Closed => None,
        }
    }

    /// Feed a mark price while the position is open. Ignored otherwise.
    pub fn observe_price(&mut self, price: N) {
        if self.is_closed() || self.entry.is_none() || price.is_nan() {
            return;
        }
        if self.best_price.is_nan() || self.is_more_favorable(price, self.best_price) {
            self.best_price = price;
            return;
        }
        let adverse = match self.starting_side {
            Side::Buy => self.best_price - price,
            Side::Sell => price - self.best_price,
        };
        let drawdown = adverse.safe_div(self.best_price);
        if !drawdown.is_nan() && drawdown > self.max_drawdown {
            self.max_drawdown = drawdown;
        }
    }

    fn is_more_favorable(&self, price: N, reference: N) -> bool {
        match self.starting_side {
            Side::Buy => price > reference,
            Side::Sell => price < reference,
        }
    }

    pub fn status(&self) -> PositionStatus {
        match (self.entry.is_some(), self.exit.is_some()) {
            (false, _) => PositionStatus::New,
            (true, false) => PositionStatus::Opened,
            (true, true) => PositionStatus::Closed,
        }
    }

    pub fn is_new(&self) -> bool {
        self.status() == PositionStatus::New
    }

    pub fn is_opened(&self) -> bool {
        self.status() == PositionStatus::Opened
    }

    pub fn is_closed(&self) -> bool {
        self.status() == PositionStatus::Closed
    }

    pub fn starting_side(&self) -> Side {
        self.starting_side
    }

    pub fn is_short(&self) -> bool {
        self.starting_side == Side::Sell
    }

    pub fn entry(&self) -> Option<&Trade<N>> {
        self.entry.as_ref()
    }

    pub fn exit(&self) -> Option<&Trade<N>> {
        self.exit.as_ref()
    }

    /// Number of recorded fills (0, 1 or 2).
    pub fn trade_count(&self) -> usize {
        self.entry.is_some() as usize + self.exit.is_some() as usize
    }

    pub fn transaction_model(&self) -> &Arc<dyn CostModel<N>> {
        &self.transaction_model
    }

    pub fn holding_model(&self) -> &Arc<dyn CostModel<N>> {
        &self.holding_model
    }

    /// Profit before costs. Zero until closed; shorts invert the sign.
    pub fn gross_profit(&self) -> N {
        match (self.entry, self.exit) {
            (Some(entry), Some(exit)) => self.gross_profit_at(exit.price, entry),
            _ => N::zero(),
        }
    }

    /// Profit before costs if the position were closed at `price`.
    pub fn unrealized_profit(&self, price: N) -> N {
        match self.entry {
            Some(entry) if self.exit.is_none() => self.gross_profit_at(price, entry),
            _ => self.gross_profit(),
        }
    }

    fn gross_profit_at(&self, price: N, entry: Trade<N>) -> N {
        (price - entry.price) * entry.amount * self.starting_side.sign()
    }

    /// Gross profit minus transaction and holding costs. Zero until closed.
    pub fn profit(&self) -> N {
        match self.exit {
            Some(exit) => self.gross_profit() - self.position_cost(exit.time),
            None => N::zero(),
        }
    }

    /// Gross profit relative to the entry value, NaN until closed.
    pub fn gross_return(&self) -> N {
        match (self.entry, self.exit) {
            (Some(entry), Some(_)) => self.gross_profit().safe_div(entry.value()),
            _ => N::nan(),
        }
    }

    /// Holding cost accrued up to `time` (capped at the exit).
    pub fn holding_cost(&self, time: i64) -> N {
        self.holding_model.calculate_position_at(self, time)
    }

    /// Transaction costs plus holding cost up to `time`.
    pub fn position_cost(&self, time: i64) -> N {
        self.transaction_model.calculate_position(self) + self.holding_cost(time)
    }

    pub fn is_profitable(&self) -> bool {
        self.profit() > N::zero()
    }

    /// Largest adverse move from the most favorable price seen while open,
    /// as a fraction of that price.
    pub fn max_drawdown(&self) -> N {
        self.max_drawdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::DecimalNum;
    use crate::record::cost::{FixedTransactionCostModel, LinearBorrowingCostModel, ZeroCostModel};
    use rust_decimal_macros::dec;

    fn zero<N: Num>() -> Arc<dyn CostModel<N>> {
        Arc::new(ZeroCostModel)
    }

    #[test]
    fn test_lifecycle() {
        let mut position: Position<f64> = Position::new(Side::Buy, zero(), zero());
        assert!(position.is_new());

        let entry = position.operate(1, 100.0, 2.0).unwrap();
        assert_eq!(entry.order_type, OrderType::Open);
        assert_eq!(entry.side, Side::Buy);
        assert!(position.is_opened());

        let exit = position.operate(2, 110.0, 2.0).unwrap();
        assert_eq!(exit.order_type, OrderType::Close);
        assert_eq!(exit.side, Side::Sell);
        assert_eq!(exit.amount, 2.0);
        assert!(position.is_closed());

        assert!(position.operate(3, 120.0, 1.0).is_none());
        assert_eq!(position.trade_count(), 2);
    }

    #[test]
    fn test_partial_exit_refused() {
        let mut position: Position<f64> = Position::new(Side::Sell, zero(), zero());
        position.operate(1, 100.0, 2.0).unwrap();

        assert!(position.operate(2, 90.0, 5.0).is_none());
        assert!(position.operate(2, 90.0, 1.0).is_none());
        assert!(position.is_opened());
        assert!(position.exit().is_none());

        let exit = position.operate(3, 90.0, 2.0).unwrap();
        assert_eq!(exit.amount, 2.0);
        assert_eq!(position.gross_profit(), 20.0);
    }

    #[test]
    fn test_long_profit() {
        let fee: Arc<dyn CostModel<f64>> = Arc::new(FixedTransactionCostModel::new(1.0));
        let mut position = Position::new(Side::Buy, fee, zero());
        position.operate(0, 100.0, 2.0);
        assert_eq!(position.gross_profit(), 0.0);
        assert_eq!(position.unrealized_profit(105.0), 10.0);

        position.operate(1, 110.0, 2.0);
        assert_eq!(position.gross_profit(), 20.0);
        assert_eq!(position.profit(), 18.0);
        assert_eq!(position.gross_return(), 0.1);
        assert!(position.is_profitable());
    }

    #[test]
    fn test_short_profit_inverts_sign() {
        let mut position: Position<DecimalNum> = Position::new(Side::Sell, zero(), zero());
        let entry = position
            .operate(0, DecimalNum::from(dec!(50)), DecimalNum::from(dec!(4)))
            .unwrap();
        assert_eq!(entry.side, Side::Sell);

        position.operate(1, DecimalNum::from(dec!(45.5)), DecimalNum::from(dec!(4)));
        assert_eq!(position.gross_profit().decimal(), Some(dec!(18.0)));

        let mut loser: Position<DecimalNum> = Position::new(Side::Sell, zero(), zero());
        loser.operate(0, DecimalNum::from(dec!(50)), DecimalNum::from(dec!(1)));
        loser.operate(1, DecimalNum::from(dec!(52)), DecimalNum::from(dec!(1)));
        assert_eq!(loser.gross_profit().decimal(), Some(dec!(-2)));
        assert!(!loser.is_profitable());
    }

    #[test]
    fn test_holding_cost_in_net_profit() {
        let day = 86_400_000;
        let borrowing: Arc<dyn CostModel<f64>> = Arc::new(LinearBorrowingCostModel::daily(0.01));
        let mut short = Position::new(Side::Sell, zero(), borrowing);
        short.operate(0, 100.0, 1.0);
        assert!((short.holding_cost(day) - 1.0).abs() < 1e-12);

        short.operate(2 * day, 90.0, 1.0);
        assert_eq!(short.gross_profit(), 10.0);
        assert!((short.profit() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_drawdown_long() {
        let mut position: Position<f64> = Position::new(Side::Buy, zero(), zero());
        position.operate(0, 100.0, 1.0);
        position.observe_price(120.0);
        position.observe_price(90.0);
        position.observe_price(130.0);
        position.operate(1, 125.0, 1.0);
        assert_eq!(position.max_drawdown(), 0.25);

        // Closed positions ignore further marks.
        position.observe_price(1.0);
        assert_eq!(position.max_drawdown(), 0.25);
    }

    #[test]
    fn test_drawdown_short() {
        let mut position: Position<f64> = Position::new(Side::Sell, zero(), zero());
        position.operate(0, 100.0, 1.0);
        position.observe_price(80.0);
        position.operate(1, 100.0, 1.0);
        assert_eq!(position.max_drawdown(), 0.25);
    }

    #[test]
    fn test_new_position_observes_nothing() {
        let mut position: Position<f64> = Position::new(Side::Buy, zero(), zero());
        position.observe_price(10.0);
        position.observe_price(5.0);
        assert_eq!(position.max_drawdown(), 0.0);
        assert!(position.gross_return().is_nan());
    }
}
