//! Run report generation.

use rust_decimal::Decimal;
use serde::Serialize;
use trading_risk::{Portfolio, PortfolioSummary, TradeRecord};

use crate::PerformanceStats;

/// Complete run report: capital endpoints, statistics and the trade list.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Strategy that produced the run
    pub strategy: String,
    /// Candles evaluated
    pub ticks: usize,
    pub summary: PortfolioSummary,
    pub stats: PerformanceStats,
    pub trades: Vec<TradeRecord>,
    /// Mark-to-market equity after each tick
    #[serde(skip)]
    pub equity_curve: Vec<(i64, Decimal)>,
}

impl RunReport {
    pub fn new(
        strategy: &str,
        ticks: usize,
        portfolio: &Portfolio,
        equity_curve: Vec<(i64, Decimal)>,
    ) -> Self {
        Self {
            strategy: strategy.to_string(),
            ticks,
            summary: portfolio.summary(),
            stats: PerformanceStats::from_ledger(portfolio.initial_capital(), portfolio.ledger()),
            trades: portfolio.ledger().to_vec(),
            equity_curve,
        }
    }

    /// Generate a text summary.
    pub fn summary_text(&self) -> String {
        let mut s = String::new();
        let stats = &self.stats;

        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str("                        RUN REPORT                          \n");
        s.push_str("═══════════════════════════════════════════════════════════\n\n");

        s.push_str(&format!("  Strategy:            {}\n", self.strategy));
        s.push_str(&format!("  Candles Evaluated:   {}\n", self.ticks));
        s.push('\n');

        s.push_str("CAPITAL\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!(
            "  Initial Capital:     ${:.2}\n",
            self.summary.initial_capital.round_dp(2)
        ));
        s.push_str(&format!(
            "  Final Capital:       ${:.2}\n",
            self.summary.final_capital.round_dp(2)
        ));
        s.push_str(&format!("  Gross Profit:        ${:.2}\n", stats.gross_profit.round_dp(2)));
        s.push_str(&format!("  Fees Paid:           ${:.2}\n", stats.total_fees.round_dp(2)));
        s.push_str(&format!("  Net Profit:          ${:.2}\n", stats.net_profit.round_dp(2)));
        s.push_str(&format!(
            "  Total Return:        {:.2}%\n",
            stats.total_return_pct.round_dp(2)
        ));
        s.push_str(&format!(
            "  Max Drawdown:        ${:.2} ({:.2}%)\n",
            stats.max_drawdown.round_dp(2), stats.max_drawdown_pct.round_dp(2)
        ));
        s.push('\n');

        s.push_str("TRADE STATISTICS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Total Trades:        {}\n", stats.total_trades));
        s.push_str(&format!("  Winning Trades:      {}\n", stats.winning_trades));
        s.push_str(&format!("  Losing Trades:       {}\n", stats.losing_trades));
        s.push_str(&format!("  Breakeven Trades:    {}\n", stats.breakeven_trades));
        s.push_str(&format!("  Win Rate:            {:.2}%\n", stats.win_rate_pct.round_dp(2)));
        s.push_str(&format!("  Profit Factor:       {:.2}\n", stats.profit_factor));
        s.push_str(&format!("  Expectancy:          ${:.2}\n", stats.expectancy.round_dp(2)));
        s.push_str(&format!("  Avg Win:             ${:.2}\n", stats.avg_win.round_dp(2)));
        s.push_str(&format!("  Avg Loss:            ${:.2}\n", stats.avg_loss.round_dp(2)));
        s.push_str(&format!(
            "  Max Win Streak:      {}\n",
            stats.max_consecutive_wins
        ));
        s.push_str(&format!(
            "  Max Loss Streak:     {}\n",
            stats.max_consecutive_losses
        ));
        s.push_str(&format!(
            "  Avg Duration:        {:.1} candles ({:.0}s)\n",
            stats.avg_duration_steps, stats.avg_duration_secs
        ));
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
        for (ts, equity) in &self.equity_curve {
            csv.push_str(&format!("{},{}\n", ts, equity));
        }
        csv
    }
}
