//! Backtest report generation.

use serde::{Deserialize, Serialize};

use barstream_core::types::Timeframe;

use crate::statistics::{BacktestStats, PositionSummary};

/// Complete report of one strategy plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub strategy: String,
    pub timeframe: Timeframe,
    /// Numeric representation the plan ran with
    pub precision: String,
    /// Input events routed
    pub events_processed: usize,
    /// Input events rejected by the series
    pub sequence_errors: usize,
    pub stats: BacktestStats,
    pub positions: Vec<PositionSummary>,
}

impl BacktestReport {
    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let mut s = String::new();

        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str("                     BACKTEST REPORT                        \n");
        s.push_str("═══════════════════════════════════════════════════════════\n\n");

        s.push_str(&format!("  Strategy:            {}\n", self.strategy));
        s.push_str(&format!("  Timeframe:           {}\n", self.timeframe));
        s.push_str(&format!("  Precision:           {}\n", self.precision));
        s.push('\n');

        s.push_str("PERFORMANCE\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!(
            "  Initial Capital:     ${:.2}\n",
            self.stats.initial_capital
        ));
        s.push_str(&format!(
            "  Final Equity:        ${:.2}\n",
            self.stats.final_equity
        ));
        s.push_str(&format!(
            "  Total Return:        {:.2}%\n",
            self.stats.total_return_pct
        ));
        s.push_str(&format!(
            "  Max Drawdown:        {:.2}%\n",
            self.stats.max_drawdown_pct
        ));
        s.push_str(&format!(
            "  Max Pos. Drawdown:   {:.2}%\n",
            self.stats.max_position_drawdown_pct
        ));
        s.push('\n');

        s.push_str("RISK METRICS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Sharpe Ratio:        {:.2}\n", self.stats.sharpe_ratio));
        s.push_str(&format!("  Sortino Ratio:       {:.2}\n", self.stats.sortino_ratio));
        s.push_str(&format!("  Profit Factor:       {:.2}\n", self.stats.profit_factor));
        s.push('\n');

        s.push_str("POSITION STATISTICS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Closed Positions:    {}\n", self.stats.total_positions));
        s.push_str(&format!("  Winning:             {}\n", self.stats.winning_positions));
        s.push_str(&format!("  Losing:              {}\n", self.stats.losing_positions));
        s.push_str(&format!("  Win Rate:            {:.2}%\n", self.stats.win_rate_pct));
        s.push_str(&format!("  Avg Win:             ${:.2}\n", self.stats.avg_win));
        s.push_str(&format!("  Avg Loss:            ${:.2}\n", self.stats.avg_loss));
        s.push_str(&format!("  Gross Profit:        ${:.2}\n", self.stats.gross_profit));
        s.push_str(&format!(
            "  Transaction Costs:   ${:.2}\n",
            self.stats.transaction_costs
        ));
        s.push_str(&format!("  Net Profit:          ${:.2}\n", self.stats.net_profit));
        s.push('\n');

        s.push_str("EXECUTION\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Events Processed:    {}\n", self.events_processed));
        s.push_str(&format!("  Sequence Errors:     {}\n", self.sequence_errors));
        s.push_str(&format!("  Bars Evaluated:      {}\n", self.stats.bars_processed));
        s.push('\n');

        s.push_str("═══════════════════════════════════════════════════════════\n");

        s
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV (equity curve only).
    pub fn equity_to_csv(&self) -> String {
        let mut csv = String::from("timestamp,equity\n");
        for (ts, equity) in &self.stats.equity_curve {
            csv.push_str(&format!("{},{}\n", ts, equity));
        }
        csv
    }
}
