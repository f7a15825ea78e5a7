//! Trade lots: the open, size-weighted position record per symbol and the
//! append-only log of realized closes.

use super::order::OrderSide;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a lot or closed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeDirection {
    Long,
    Short,
}

impl TradeDirection {
    /// The direction a fill on `side` opens or extends.
    pub fn from_side(side: OrderSide) -> Self {
        match side {
            OrderSide::Buy => TradeDirection::Long,
            OrderSide::Sell => TradeDirection::Short,
        }
    }

    /// +1 for long, -1 for short.
    pub fn sign(self) -> i64 {
        match self {
            TradeDirection::Long => 1,
            TradeDirection::Short => -1,
        }
    }
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeDirection::Long => write!(f, "LONG"),
            TradeDirection::Short => write!(f, "SHORT"),
        }
    }
}

/// The single open lot for a symbol.
///
/// `quantity` always equals `|position|` for the symbol while the lot exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenLot {
    pub entry_time: NaiveDateTime,
    /// Size-weighted average entry price.
    pub entry_price: f64,
    pub quantity: u64,
    pub direction: TradeDirection,
    /// Entry commission not yet attributed to a closed trade.
    pub entry_commission: f64,
}

impl OpenLot {
    /// Unrealized PnL at `price`, before commissions.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        gross_pnl(self.direction, self.entry_price, price, self.quantity)
    }
}

/// One realized close (partial or full) of an open lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub symbol: String,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: u64,
    pub direction: TradeDirection,
    /// Net of the apportioned entry and exit commissions.
    pub pnl: f64,
    pub commission: f64,
    pub duration_days: i64,
}

impl ClosedTrade {
    /// Return on the trade as a fraction of entry notional.
    pub fn return_pct(&self) -> f64 {
        let notional = self.entry_price * self.quantity as f64;
        if notional == 0.0 {
            return 0.0;
        }
        self.pnl / notional
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}

/// Gross PnL of `quantity` shares moved from `entry` to `exit`.
pub fn gross_pnl(direction: TradeDirection, entry: f64, exit: f64, quantity: u64) -> f64 {
    match direction {
        TradeDirection::Long => (exit - entry) * quantity as f64,
        TradeDirection::Short => (entry - exit) * quantity as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn direction_from_side() {
        assert_eq!(TradeDirection::from_side(OrderSide::Buy), TradeDirection::Long);
        assert_eq!(TradeDirection::from_side(OrderSide::Sell), TradeDirection::Short);
    }

    #[test]
    fn gross_pnl_is_directional() {
        assert_eq!(gross_pnl(TradeDirection::Long, 100.0, 110.0, 10), 100.0);
        assert_eq!(gross_pnl(TradeDirection::Short, 100.0, 110.0, 10), -100.0);
    }

    #[test]
    fn return_pct_uses_entry_notional() {
        let trade = ClosedTrade {
            symbol: "AAPL".into(),
            entry_time: ts(2),
            exit_time: ts(5),
            entry_price: 100.0,
            exit_price: 110.0,
            quantity: 50,
            direction: TradeDirection::Long,
            pnl: 485.0,
            commission: 15.0,
            duration_days: 3,
        };
        assert!((trade.return_pct() - 485.0 / 5000.0).abs() < 1e-12);
        assert!(trade.is_winner());
    }

    #[test]
    fn lot_unrealized_pnl() {
        let lot = OpenLot {
            entry_time: ts(2),
            entry_price: 100.0,
            quantity: 100,
            direction: TradeDirection::Short,
            entry_commission: 0.35,
        };
        assert_eq!(lot.unrealized_pnl(99.0), 100.0);
    }
}
