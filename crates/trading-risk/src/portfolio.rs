//! Single-position portfolio: capital, fees and the trade ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};
use trading_core::types::PositionSide;

use crate::position_sizer::PositionSizer;

/// Portfolio settings, expressed in percent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioConfig {
    pub initial_capital: Decimal,
    /// Percent of initial capital risked per trade
    pub risk_pct: Decimal,
    /// Fee charged on entry and exit notional, in percent
    pub fee_pct: Decimal,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            initial_capital: dec!(100000),
            risk_pct: dec!(5),
            fee_pct: dec!(0.1),
        }
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExitReason {
    StopLoss,
    EndOfData,
    /// Strategy exit with its own reason text
    Signal(String),
}

impl ExitReason {
    pub fn as_str(&self) -> &str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::EndOfData => "end_of_data",
            ExitReason::Signal(reason) => reason,
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ExitReason {
    fn from(value: String) -> Self {
        match value.as_str() {
            "stop_loss" => ExitReason::StopLoss,
            "end_of_data" => ExitReason::EndOfData,
            _ => ExitReason::Signal(value),
        }
    }
}

impl From<ExitReason> for String {
    fn from(value: ExitReason) -> Self {
        value.as_str().to_string()
    }
}

/// The open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    pub entry_price: Decimal,
    pub quantity: Decimal,
    /// Current stop; moves only through trailing updates
    pub stop_loss: Decimal,
    /// Stop at entry, kept for the trade record
    pub initial_stop_loss: Decimal,
    pub risk_per_unit: Decimal,
    pub entry_timestamp: i64,
    pub entry_step: usize,
    pub entry_fee: Decimal,
}

impl Position {
    /// Entry notional, quantity * entry price.
    pub fn notional(&self) -> Decimal {
        self.quantity * self.entry_price
    }

    /// Gross profit if closed at `price`.
    pub fn gross_pnl(&self, price: Decimal) -> Decimal {
        (price - self.entry_price) * self.quantity * self.side.sign()
    }
}

/// Immutable record of a closed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub entry_step: usize,
    pub exit_step: usize,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub quantity: Decimal,
    pub side: PositionSide,
    pub stop_loss: Decimal,
    pub risk_per_unit: Decimal,
    pub exit_reason: ExitReason,
    pub gross_profit_loss: Decimal,
    pub entry_fee: Decimal,
    pub exit_fee: Decimal,
    pub total_fees: Decimal,
    pub net_profit_loss: Decimal,
    pub gross_profit_loss_pct: Decimal,
    pub net_profit_loss_pct: Decimal,
}

impl TradeRecord {
    pub fn is_win(&self) -> bool {
        self.net_profit_loss > Decimal::ZERO
    }

    pub fn is_loss(&self) -> bool {
        self.net_profit_loss < Decimal::ZERO
    }

    /// Holding time in candles.
    pub fn duration_steps(&self) -> usize {
        self.exit_step.saturating_sub(self.entry_step)
    }

    /// Holding time in seconds.
    pub fn duration_secs(&self) -> i64 {
        (self.exit_time - self.entry_time).num_seconds()
    }
}

/// Capital endpoints and totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub initial_capital: Decimal,
    pub final_capital: Decimal,
    pub total_trades: usize,
    pub gross_profit: Decimal,
    pub total_fees_paid: Decimal,
    pub net_profit: Decimal,
}

/// Capital, the single open position and the append-only trade ledger.
#[derive(Debug, Clone)]
pub struct Portfolio {
    initial_capital: Decimal,
    capital: Decimal,
    fee_rate: Decimal,
    sizer: PositionSizer,
    position: Option<Position>,
    ledger: Vec<TradeRecord>,
    total_fees: Decimal,
}

impl Portfolio {
    pub fn new(config: &PortfolioConfig) -> Self {
        Self {
            initial_capital: config.initial_capital,
            capital: config.initial_capital,
            fee_rate: config.fee_pct / dec!(100),
            sizer: PositionSizer::new(config.initial_capital, config.risk_pct),
            position: None,
            ledger: Vec::new(),
            total_fees: Decimal::ZERO,
        }
    }

    /// Open a position sized by the risk budget.
    ///
    /// No-op (returns `None`) when a position is already open, when the
    /// stop is not on the loss side of `price`, or when the quantity floors
    /// to zero.
    pub fn open(
        &mut self,
        side: PositionSide,
        price: Decimal,
        stop_loss: Decimal,
        risk_per_unit: Decimal,
        timestamp: i64,
        step: usize,
    ) -> Option<&Position> {
        if self.position.is_some() {
            debug!(step, "open ignored: position already open");
            return None;
        }

        let stop_on_loss_side = match side {
            PositionSide::Long => stop_loss < price,
            PositionSide::Short => stop_loss > price,
        };
        if !stop_on_loss_side {
            warn!(%side, %price, %stop_loss, step, "open ignored: stop is not on the loss side");
            return None;
        }

        let quantity = self.sizer.quantity(self.capital, price, risk_per_unit);
        if quantity.is_zero() {
            info!(%side, %price, capital = %self.capital, step, "open ignored: insufficient capital");
            return None;
        }

        let notional = quantity * price;
        let entry_fee = notional * self.fee_rate;
        match side {
            PositionSide::Long => self.capital -= notional + entry_fee,
            PositionSide::Short => self.capital += notional - entry_fee,
        }
        self.total_fees += entry_fee;

        info!(
            %side,
            %price,
            %quantity,
            %stop_loss,
            fee = %entry_fee,
            capital = %self.capital,
            step,
            "position opened"
        );

        self.position = Some(Position {
            side,
            entry_price: price,
            quantity,
            stop_loss,
            initial_stop_loss: stop_loss,
            risk_per_unit,
            entry_timestamp: timestamp,
            entry_step: step,
            entry_fee,
        });
        self.position.as_ref()
    }

    /// Close the open position and append its record to the ledger.
    ///
    /// No-op (returns `None`) when flat.
    pub fn close(
        &mut self,
        price: Decimal,
        timestamp: i64,
        step: usize,
        reason: ExitReason,
    ) -> Option<TradeRecord> {
        let position = self.position.take()?;

        let notional = position.quantity * price;
        let exit_fee = notional * self.fee_rate;
        match position.side {
            PositionSide::Long => self.capital += notional - exit_fee,
            PositionSide::Short => self.capital -= notional + exit_fee,
        }
        self.total_fees += exit_fee;

        let gross = position.gross_pnl(price);
        let total_fees = position.entry_fee + exit_fee;
        let net = gross - total_fees;
        let entry_notional = position.notional();
        let pct = |value: Decimal| {
            if entry_notional.is_zero() {
                Decimal::ZERO
            } else {
                value / entry_notional * dec!(100)
            }
        };

        let record = TradeRecord {
            entry_step: position.entry_step,
            exit_step: step,
            entry_time: millis_to_datetime(position.entry_timestamp),
            exit_time: millis_to_datetime(timestamp),
            entry_price: position.entry_price,
            exit_price: price,
            quantity: position.quantity,
            side: position.side,
            stop_loss: position.initial_stop_loss,
            risk_per_unit: position.risk_per_unit,
            exit_reason: reason,
            gross_profit_loss: gross,
            entry_fee: position.entry_fee,
            exit_fee,
            total_fees,
            net_profit_loss: net,
            gross_profit_loss_pct: pct(gross),
            net_profit_loss_pct: pct(net),
        };

        info!(
            side = %record.side,
            entry = %record.entry_price,
            exit = %record.exit_price,
            net = %record.net_profit_loss,
            reason = %record.exit_reason,
            capital = %self.capital,
            step,
            "position closed"
        );

        self.ledger.push(record.clone());

        let discrepancy = self.ledger_discrepancy();
        if !discrepancy.is_zero() {
            warn!(%discrepancy, "capital does not match initial capital plus ledger net");
        }

        Some(record)
    }

    /// Quantity `open` would use at `price`, without opening anything.
    pub fn quantity_for(&self, price: Decimal, risk_per_unit: Decimal) -> Decimal {
        self.sizer.quantity(self.capital, price, risk_per_unit)
    }

    /// Move the open position's stop. Returns `false` when flat.
    pub fn update_stop_loss(&mut self, new_stop: Decimal) -> bool {
        match self.position.as_mut() {
            Some(position) => {
                debug!(old = %position.stop_loss, new = %new_stop, "stop loss updated");
                position.stop_loss = new_stop;
                true
            }
            None => false,
        }
    }

    /// `capital - (initial + Σ net)`; zero whenever flat.
    ///
    /// While a position is open this equals the open leg's cash flow.
    pub fn ledger_discrepancy(&self) -> Decimal {
        let realized: Decimal = self.ledger.iter().map(|t| t.net_profit_loss).sum();
        let open_leg = match &self.position {
            Some(p) => match p.side {
                PositionSide::Long => -(p.notional() + p.entry_fee),
                PositionSide::Short => p.notional() - p.entry_fee,
            },
            None => Decimal::ZERO,
        };
        self.capital - (self.initial_capital + realized) - open_leg
    }

    /// Mark-to-market value: cash plus the open position at `mark`.
    pub fn equity(&self, mark: Decimal) -> Decimal {
        match &self.position {
            Some(p) => match p.side {
                PositionSide::Long => self.capital + p.quantity * mark,
                PositionSide::Short => self.capital - p.quantity * mark,
            },
            None => self.capital,
        }
    }

    pub fn summary(&self) -> PortfolioSummary {
        let net_profit = self.capital - self.initial_capital;
        PortfolioSummary {
            initial_capital: self.initial_capital,
            final_capital: self.capital,
            total_trades: self.ledger.len(),
            gross_profit: net_profit + self.total_fees,
            total_fees_paid: self.total_fees,
            net_profit,
        }
    }

    pub fn capital(&self) -> Decimal {
        self.capital
    }

    pub fn initial_capital(&self) -> Decimal {
        self.initial_capital
    }

    pub fn risk_budget(&self) -> Decimal {
        self.sizer.risk_budget()
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    pub fn ledger(&self) -> &[TradeRecord] {
        &self.ledger
    }

    pub fn total_fees(&self) -> Decimal {
        self.total_fees
    }
}

fn millis_to_datetime(timestamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(timestamp).unwrap_or_default()
}
