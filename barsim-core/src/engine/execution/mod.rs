//! Execution: turns one resting order plus one bar into at most one fill.
//!
//! The execution engine is stateless apart from configuration. It mutates
//! only the order it is handed (trailing extrema and filled quantity); the
//! caller owns the order book and the bus.

pub mod commission;
pub mod cost_model;
pub mod fill_price;
pub mod liquidity;
pub mod trigger;

pub use commission::{
    BpsCommission, CommissionConfig, CommissionModel, PerShareCommission, ZeroCommission,
};
pub use cost_model::CostModel;
pub use fill_price::{compute_fill, ComputedFill};
pub use liquidity::LiquidityPolicy;
pub use trigger::{check_trigger, track_extrema, StopFillPolicy, TriggerResult};

use crate::domain::{Bar, Fill, Order};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Execution parameters for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Adverse price adjustment in basis points.
    pub slippage_bps: f64,
    /// Max fraction of a bar's volume a single order may take.
    pub participation_pct: f64,
    pub stop_fill: StopFillPolicy,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            slippage_bps: 0.0,
            participation_pct: 1.0,
            stop_fill: StopFillPolicy::TouchedExtreme,
        }
    }
}

impl ExecutionConfig {
    pub fn frictionless() -> Self {
        Self::default()
    }
}

/// Applies trigger rules, the liquidity cap, slippage and commission.
#[derive(Debug)]
pub struct ExecutionEngine {
    cost_model: CostModel,
    liquidity: LiquidityPolicy,
    stop_fill: StopFillPolicy,
    commission: Box<dyn CommissionModel>,
}

impl ExecutionEngine {
    pub fn new(config: ExecutionConfig, commission: Box<dyn CommissionModel>) -> Self {
        Self {
            cost_model: CostModel::new(config.slippage_bps),
            liquidity: LiquidityPolicy::new(config.participation_pct),
            stop_fill: config.stop_fill,
            commission,
        }
    }

    pub fn frictionless() -> Self {
        Self::new(ExecutionConfig::frictionless(), Box::new(ZeroCommission))
    }

    /// Evaluate `order` against `bar`.
    ///
    /// Trailing extrema are updated first, whatever the outcome. On a fill the
    /// order's `filled_quantity` is advanced and the resulting `Fill` returned;
    /// `partial_fill` is set when quantity remains after this fill.
    pub fn execute(&self, order: &mut Order, bar: &Bar) -> Option<Fill> {
        let remaining = order.remaining_quantity();
        if remaining == 0 {
            return None;
        }

        track_extrema(order, bar);
        let TriggerResult::Fill {
            fill_price,
            gap_through,
        } = check_trigger(order, bar, self.stop_fill)
        else {
            return None;
        };
        if gap_through {
            debug!(order = %order.id, open = bar.open, "bar gapped through trigger");
        }

        let (quantity, remainder) = self.liquidity.constrain(remaining, bar.volume);
        if quantity == 0 {
            return None;
        }

        let computed = compute_fill(
            fill_price,
            order.side,
            quantity,
            &self.cost_model,
            self.commission.as_ref(),
        );
        order.filled_quantity += quantity;

        Some(Fill {
            timestamp: bar.timestamp,
            symbol: order.symbol.clone(),
            quantity,
            side: order.side,
            fill_price: computed.price,
            fill_cost: computed.cost,
            commission: computed.commission,
            slippage: computed.slippage,
            gap_through,
            order_id: order.id,
            partial_fill: remainder > 0,
        })
    }
}
