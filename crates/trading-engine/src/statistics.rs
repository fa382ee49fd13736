//! Performance statistics derived from the trade ledger.

use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use trading_risk::TradeRecord;

/// Run statistics.
///
/// Every field is a pure fold over the ledger; drawdown is measured on the
/// realized equity `initial + cumulative net` after each trade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub initial_capital: Decimal,
    pub final_capital: Decimal,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
    /// Win rate percentage
    pub win_rate_pct: Decimal,
    /// Σ wins / |Σ losses|; infinite when nothing was lost
    pub profit_factor: f64,
    /// Net profit per trade
    pub expectancy: Decimal,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub max_drawdown: Decimal,
    pub max_drawdown_pct: Decimal,
    pub avg_duration_steps: f64,
    pub avg_duration_secs: f64,
    pub total_fees: Decimal,
    pub gross_profit: Decimal,
    pub net_profit: Decimal,
    pub total_return_pct: Decimal,
}

impl PerformanceStats {
    pub fn from_ledger(initial_capital: Decimal, trades: &[TradeRecord]) -> Self {
        let total_trades = trades.len();

        let mut winning_trades = 0;
        let mut losing_trades = 0;
        let mut total_won = Decimal::ZERO;
        let mut total_lost = Decimal::ZERO;
        let (mut win_streak, mut loss_streak) = (0usize, 0usize);
        let (mut max_consecutive_wins, mut max_consecutive_losses) = (0usize, 0usize);

        let mut equity = initial_capital;
        let mut peak = initial_capital;
        let mut max_drawdown = Decimal::ZERO;
        let mut max_drawdown_pct = Decimal::ZERO;

        for trade in trades {
            let net = trade.net_profit_loss;
            if net > Decimal::ZERO {
                winning_trades += 1;
                total_won += net;
                win_streak += 1;
                loss_streak = 0;
            } else if net < Decimal::ZERO {
                losing_trades += 1;
                total_lost += net.abs();
                loss_streak += 1;
                win_streak = 0;
            } else {
                win_streak = 0;
                loss_streak = 0;
            }
            max_consecutive_wins = max_consecutive_wins.max(win_streak);
            max_consecutive_losses = max_consecutive_losses.max(loss_streak);

            equity += net;
            if equity > peak {
                peak = equity;
            }
            let drawdown = peak - equity;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
            if peak > Decimal::ZERO {
                let pct = drawdown / peak * dec!(100);
                if pct > max_drawdown_pct {
                    max_drawdown_pct = pct;
                }
            }
        }

        let net_profit: Decimal = trades.iter().map(|t| t.net_profit_loss).sum();
        let gross_profit: Decimal = trades.iter().map(|t| t.gross_profit_loss).sum();
        let total_fees: Decimal = trades.iter().map(|t| t.total_fees).sum();

        let ratio = |value: Decimal, count: usize| {
            if count == 0 {
                Decimal::ZERO
            } else {
                value / Decimal::from(count)
            }
        };

        let profit_factor = if total_lost > Decimal::ZERO {
            (total_won / total_lost).to_f64().unwrap_or(0.0)
        } else if total_won > Decimal::ZERO {
            f64::INFINITY
        } else {
            0.0
        };

        let mean = |values: &mut dyn Iterator<Item = f64>| {
            if total_trades == 0 {
                0.0
            } else {
                values.sum::<f64>() / total_trades as f64
            }
        };

        Self {
            initial_capital,
            final_capital: initial_capital + net_profit,
            total_trades,
            winning_trades,
            losing_trades,
            breakeven_trades: total_trades - winning_trades - losing_trades,
            win_rate_pct: ratio(Decimal::from(winning_trades) * dec!(100), total_trades),
            profit_factor,
            expectancy: ratio(net_profit, total_trades),
            avg_win: ratio(total_won, winning_trades),
            avg_loss: ratio(total_lost, losing_trades),
            max_consecutive_wins,
            max_consecutive_losses,
            max_drawdown,
            max_drawdown_pct,
            avg_duration_steps: mean(&mut trades.iter().map(|t| t.duration_steps() as f64)),
            avg_duration_secs: mean(&mut trades.iter().map(|t| t.duration_secs() as f64)),
            total_fees,
            gross_profit,
            net_profit,
            total_return_pct: if initial_capital > Decimal::ZERO {
                net_profit / initial_capital * dec!(100)
            } else {
                Decimal::ZERO
            },
        }
    }
}
