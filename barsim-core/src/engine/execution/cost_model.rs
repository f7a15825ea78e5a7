//! Slippage model.
//!
//! Slippage is directional: buyers pay more, sellers receive less.

use crate::domain::OrderSide;

/// Fixed basis-point slippage applied adversely to every fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub slippage_bps: f64,
}

impl CostModel {
    pub fn new(slippage_bps: f64) -> Self {
        Self { slippage_bps }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0)
    }

    /// Apply slippage to a raw fill price.
    ///
    /// Returns `(slipped_price, slippage_dollar_amount)`.
    pub fn apply_slippage(&self, raw_price: f64, side: OrderSide, quantity: u64) -> (f64, f64) {
        if self.slippage_bps == 0.0 {
            return (raw_price, 0.0);
        }
        let slip_fraction = self.slippage_bps / 10_000.0;
        let slipped = match side {
            OrderSide::Buy => raw_price * (1.0 + slip_fraction),
            OrderSide::Sell => raw_price * (1.0 - slip_fraction),
        };
        let amount = (slipped - raw_price).abs() * quantity as f64;
        (slipped, amount)
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::frictionless()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frictionless_returns_raw_price() {
        let cost = CostModel::frictionless();
        assert_eq!(cost.apply_slippage(100.0, OrderSide::Buy, 50), (100.0, 0.0));
    }

    #[test]
    fn buy_slippage_increases_price() {
        let cost = CostModel::new(10.0); // 10 bps
        let (price, slip) = cost.apply_slippage(100.0, OrderSide::Buy, 100);
        // 100 * (1 + 10/10000) = 100.10
        assert!((price - 100.10).abs() < 1e-10);
        assert!((slip - 10.0).abs() < 1e-8); // 0.10 * 100 shares
    }

    #[test]
    fn sell_slippage_decreases_price() {
        let cost = CostModel::new(10.0);
        let (price, slip) = cost.apply_slippage(100.0, OrderSide::Sell, 100);
        assert!((price - 99.90).abs() < 1e-10);
        assert!((slip - 10.0).abs() < 1e-8);
    }
}
