use crate::domain::ids::OrderId;
use crate::domain::order::OrderSide;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A completed (possibly partial) execution of an order against a bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub quantity: u64,
    pub side: OrderSide,
    /// Per-share price after slippage.
    pub fill_price: f64,
    /// `fill_price * quantity`.
    pub fill_cost: f64,
    pub commission: f64,
    /// Dollar cost of slippage already included in `fill_cost`.
    pub slippage: f64,
    /// The bar opened through the trigger level, so the fill took the open.
    pub gap_through: bool,
    pub order_id: OrderId,
    /// True when the order still has quantity resting after this fill.
    pub partial_fill: bool,
}

impl Fill {
    /// Signed quantity: positive for buys, negative for sells.
    pub fn signed_quantity(&self) -> i64 {
        self.side.sign() * self.quantity as i64
    }

    /// Cash delta of this fill: `-sign * fill_cost - commission`.
    pub fn cash_delta(&self) -> f64 {
        -(self.side.sign() as f64) * self.fill_cost - self.commission
    }
}
