//! Risk-budget position sizing.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Decimal places kept on position quantities.
pub const QUANTITY_SCALE: u32 = 2;

/// Sizes positions so a stop-out loses at most a fixed budget.
///
/// The budget is a percent of the initial capital, fixed when the sizer
/// is created; the quantity is further capped by what the current capital
/// can pay for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSizer {
    risk_budget: Decimal,
}

impl PositionSizer {
    /// Budget = `capital * risk_pct / 100`.
    pub fn new(capital: Decimal, risk_pct: Decimal) -> Self {
        Self {
            risk_budget: capital * risk_pct / dec!(100),
        }
    }

    /// Amount of capital at risk per trade.
    pub fn risk_budget(&self) -> Decimal {
        self.risk_budget
    }

    /// Quantity for an entry at `price` with `risk_per_unit` to the stop.
    ///
    /// `min(budget / risk_per_unit, capital / price)`, floored to
    /// [`QUANTITY_SCALE`] decimals and never negative. Non-positive inputs
    /// size to zero.
    pub fn quantity(&self, capital: Decimal, price: Decimal, risk_per_unit: Decimal) -> Decimal {
        if price <= Decimal::ZERO || risk_per_unit <= Decimal::ZERO || capital <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let by_risk = self.risk_budget / risk_per_unit;
        let by_capital = capital / price;

        by_risk
            .min(by_capital)
            .round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::ToNegativeInfinity)
            .max(Decimal::ZERO)
    }
}
