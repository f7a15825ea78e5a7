//! Fill price computation: applies slippage and commission to raw trigger prices.

use crate::domain::OrderSide;

use super::commission::CommissionModel;
use super::cost_model::CostModel;

/// The fully computed fill price with all costs.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedFill {
    /// Per-share price after slippage.
    pub price: f64,
    /// `price * quantity`.
    pub cost: f64,
    /// Dollar amount of slippage applied.
    pub slippage: f64,
    pub commission: f64,
}

/// Compute the final fill from a raw trigger price.
///
/// Applies: slippage (directional) → cost → commission on the slipped price.
pub fn compute_fill(
    raw_price: f64,
    side: OrderSide,
    quantity: u64,
    cost_model: &CostModel,
    commission: &dyn CommissionModel,
) -> ComputedFill {
    let (price, slippage) = cost_model.apply_slippage(raw_price, side, quantity);
    ComputedFill {
        price,
        cost: price * quantity as f64,
        slippage,
        commission: commission.compute(quantity, side, price),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::execution::commission::{BpsCommission, ZeroCommission};

    #[test]
    fn frictionless_fill() {
        let fill = compute_fill(100.0, OrderSide::Buy, 100, &CostModel::frictionless(), &ZeroCommission);
        assert_eq!(fill.price, 100.0);
        assert_eq!(fill.cost, 10_000.0);
        assert_eq!(fill.slippage, 0.0);
        assert_eq!(fill.commission, 0.0);
    }

    #[test]
    fn commission_uses_slipped_price() {
        let fill = compute_fill(
            100.0,
            OrderSide::Buy,
            100,
            &CostModel::new(5.0),
            &BpsCommission { bps: 5.0 },
        );
        // slipped: 100 * 1.0005 = 100.05
        assert!((fill.price - 100.05).abs() < 1e-10);
        // commission: 100.05 * 100 * 5/10000 = 5.0025
        assert!((fill.commission - 5.0025).abs() < 1e-8);
        assert!((fill.cost - 10_005.0).abs() < 1e-8);
    }

    #[test]
    fn sell_always_receives_less() {
        let fill = compute_fill(100.0, OrderSide::Sell, 50, &CostModel::new(10.0), &ZeroCommission);
        assert!(fill.price < 100.0);
    }
}
