//! Backtest statistics.

use serde::{Deserialize, Serialize};

use barstream_core::num::Num;
use barstream_core::record::{Position, TradingRecord};
use barstream_core::types::{Side, Timeframe};

const YEAR_MILLIS: f64 = 365.0 * 86_400_000.0;

/// Summary of one closed position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSummary {
    pub side: Side,
    pub entry_time: i64,
    pub entry_price: f64,
    pub exit_time: i64,
    pub exit_price: f64,
    pub amount: f64,
    pub gross_profit: f64,
    /// Gross profit minus transaction and holding costs
    pub net_profit: f64,
    /// Worst adverse excursion while open, as a fraction
    pub max_drawdown: f64,
}

impl PositionSummary {
    /// `None` for positions that are not closed.
    pub fn from_position<N: Num>(position: &Position<N>) -> Option<Self> {
        let entry = position.entry()?;
        let exit = position.exit()?;
        Some(Self {
            side: position.starting_side(),
            entry_time: entry.time,
            entry_price: entry.price.to_f64(),
            exit_time: exit.time,
            exit_price: exit.price.to_f64(),
            amount: entry.amount.to_f64(),
            gross_profit: position.gross_profit().to_f64(),
            net_profit: position.profit().to_f64(),
            max_drawdown: position.max_drawdown().to_f64(),
        })
    }
}

/// Backtest statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestStats {
    /// Initial capital
    pub initial_capital: f64,
    /// Final equity
    pub final_equity: f64,
    /// Total return percentage
    pub total_return_pct: f64,
    /// Maximum drawdown of the equity curve, percentage
    pub max_drawdown_pct: f64,
    /// Largest intra-position drawdown over closed positions, percentage
    pub max_position_drawdown_pct: f64,
    /// Sharpe ratio (assuming risk-free rate of 0)
    pub sharpe_ratio: f64,
    /// Sortino ratio
    pub sortino_ratio: f64,
    /// Number of closed positions
    pub total_positions: usize,
    pub winning_positions: usize,
    pub losing_positions: usize,
    /// Win rate percentage
    pub win_rate_pct: f64,
    /// Average net profit per winning position
    pub avg_win: f64,
    /// Average net loss per losing position
    pub avg_loss: f64,
    /// Profit factor (gross profit / gross loss)
    pub profit_factor: f64,
    pub gross_profit: f64,
    pub net_profit: f64,
    pub transaction_costs: f64,
    /// Number of bars evaluated on the strategy's timeframe
    pub bars_processed: usize,
    /// Equity curve
    pub equity_curve: Vec<(i64, f64)>,
    /// Peak equity (for drawdown)
    peak_equity: f64,
    /// Per-bar returns for Sharpe calculation
    returns: Vec<f64>,
}

impl BacktestStats {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            final_equity: initial_capital,
            total_return_pct: 0.0,
            max_drawdown_pct: 0.0,
            max_position_drawdown_pct: 0.0,
            sharpe_ratio: 0.0,
            sortino_ratio: 0.0,
            total_positions: 0,
            winning_positions: 0,
            losing_positions: 0,
            win_rate_pct: 0.0,
            avg_win: 0.0,
            avg_loss: 0.0,
            profit_factor: 0.0,
            gross_profit: 0.0,
            net_profit: 0.0,
            transaction_costs: 0.0,
            bars_processed: 0,
            equity_curve: Vec::new(),
            peak_equity: initial_capital,
            returns: Vec::new(),
        }
    }

    /// Record equity at a timestamp.
    pub fn record_equity(&mut self, timestamp: i64, equity: f64) {
        self.push_equity(timestamp, equity);
        self.bars_processed += 1;
    }

    /// Replace the last equity point, e.g. after positions are closed at the
    /// final bar's price. No bar is counted; an empty curve gets its first
    /// point.
    pub fn revise_last_equity(&mut self, timestamp: i64, equity: f64) {
        if self.equity_curve.pop().is_some() {
            if matches!(self.equity_curve.last(), Some(&(_, prev)) if prev > 0.0) {
                self.returns.pop();
            }
            self.rescan_drawdown();
        }
        self.push_equity(timestamp, equity);
    }

    fn push_equity(&mut self, timestamp: i64, equity: f64) {
        if let Some(&(_, prev_equity)) = self.equity_curve.last() {
            if prev_equity > 0.0 {
                self.returns.push((equity - prev_equity) / prev_equity);
            }
        }
        self.equity_curve.push((timestamp, equity));
        self.track_drawdown(equity);
    }

    fn track_drawdown(&mut self, equity: f64) {
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
        if self.peak_equity > 0.0 {
            let drawdown = (self.peak_equity - equity) / self.peak_equity * 100.0;
            if drawdown > self.max_drawdown_pct {
                self.max_drawdown_pct = drawdown;
            }
        }
    }

    fn rescan_drawdown(&mut self) {
        self.peak_equity = self.initial_capital;
        self.max_drawdown_pct = 0.0;
        for i in 0..self.equity_curve.len() {
            let (_, equity) = self.equity_curve[i];
            self.track_drawdown(equity);
        }
    }

    /// Equity implied by `record` at `price`: capital plus realized net
    /// profit plus the open position's unrealized profit.
    pub fn equity_of<N: Num>(&self, record: &TradingRecord<N>, price: N) -> f64 {
        let mut equity = self.initial_capital + record.total_net_profit().to_f64();
        if record.is_in_position() {
            let unrealized = record.current_position().unrealized_profit(price).to_f64();
            if unrealized.is_finite() {
                equity += unrealized;
            }
        }
        equity
    }

    /// Calculate final statistics from the closed positions of `record`.
    pub fn finalize<N: Num>(&mut self, record: &TradingRecord<N>, timeframe: Timeframe) {
        self.final_equity = self
            .equity_curve
            .last()
            .map(|&(_, equity)| equity)
            .unwrap_or(self.initial_capital);

        if self.initial_capital > 0.0 {
            self.total_return_pct =
                (self.final_equity - self.initial_capital) / self.initial_capital * 100.0;
        }

        let drawdown = record.maximum_drawdown().to_f64();
        if drawdown.is_finite() {
            self.max_position_drawdown_pct = drawdown * 100.0;
        }

        let mut total_profit = 0.0;
        let mut total_loss = 0.0;
        for position in record.positions() {
            let pnl = position.profit().to_f64();
            if pnl > 0.0 {
                self.winning_positions += 1;
                total_profit += pnl;
            } else if pnl < 0.0 {
                self.losing_positions += 1;
                total_loss += pnl.abs();
            }
        }
        self.total_positions = record.position_count();
        self.gross_profit = record.total_gross_profit().to_f64();
        self.net_profit = record.total_net_profit().to_f64();
        self.transaction_costs = record.total_transaction_cost().to_f64();

        if self.total_positions > 0 {
            self.win_rate_pct =
                self.winning_positions as f64 * 100.0 / self.total_positions as f64;
        }
        if self.winning_positions > 0 {
            self.avg_win = total_profit / self.winning_positions as f64;
        }
        if self.losing_positions > 0 {
            self.avg_loss = total_loss / self.losing_positions as f64;
        }
        if total_loss > 0.0 {
            self.profit_factor = total_profit / total_loss;
        }

        self.compute_ratios(timeframe);
    }

    fn compute_ratios(&mut self, timeframe: Timeframe) {
        if self.returns.is_empty() {
            return;
        }
        let periods_per_year = YEAR_MILLIS / timeframe.duration_millis() as f64;
        let annualization = periods_per_year.sqrt();

        let mean = self.returns.iter().sum::<f64>() / self.returns.len() as f64;
        let variance = self
            .returns
            .iter()
            .map(|r| (r - mean).powi(2))
            .sum::<f64>()
            / self.returns.len() as f64;
        let std_dev = variance.sqrt();
        if std_dev > 0.0 {
            self.sharpe_ratio = mean * annualization / std_dev;
        }

        // Sortino ratio (only downside deviation)
        let negative: Vec<f64> = self.returns.iter().filter(|&&r| r < 0.0).copied().collect();
        if !negative.is_empty() {
            let downside = (negative.iter().map(|r| r.powi(2)).sum::<f64>()
                / negative.len() as f64)
                .sqrt();
            if downside > 0.0 {
                self.sortino_ratio = mean * annualization / downside;
            }
        }
    }
}
