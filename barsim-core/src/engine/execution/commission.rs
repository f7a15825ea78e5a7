//! Commission calculators.
//!
//! A commission calculator is a pure function of one fill. The matching
//! engine computes the commission and attaches it to every `Fill`; the
//! portfolio only books what it is given.

use crate::domain::OrderSide;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pluggable commission calculator.
pub trait CommissionModel: fmt::Debug + Send + Sync {
    /// Commission for filling `quantity` shares at `price`.
    fn compute(&self, quantity: u64, side: OrderSide, price: f64) -> f64;
}

/// Per-share rate with a per-fill floor and an optional cap as a fraction
/// of trade value (broker-style tiered pricing).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerShareCommission {
    pub rate: f64,
    pub minimum: f64,
    pub max_pct: Option<f64>,
}

impl PerShareCommission {
    /// $0.0035 per share, $0.35 minimum.
    pub fn reference() -> Self {
        Self {
            rate: 0.0035,
            minimum: 0.35,
            max_pct: None,
        }
    }
}

impl CommissionModel for PerShareCommission {
    fn compute(&self, quantity: u64, _side: OrderSide, price: f64) -> f64 {
        let commission = (self.rate * quantity as f64).max(self.minimum);
        match self.max_pct {
            Some(pct) => commission.min(pct * price * quantity as f64),
            None => commission,
        }
    }
}

/// Commission in basis points of trade value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BpsCommission {
    pub bps: f64,
}

impl CommissionModel for BpsCommission {
    fn compute(&self, quantity: u64, _side: OrderSide, price: f64) -> f64 {
        price * quantity as f64 * (self.bps / 10_000.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ZeroCommission;

impl CommissionModel for ZeroCommission {
    fn compute(&self, _quantity: u64, _side: OrderSide, _price: f64) -> f64 {
        0.0
    }
}

/// Serializable commission selection for run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionConfig {
    PerShare {
        rate: f64,
        minimum: f64,
        #[serde(default)]
        max_pct: Option<f64>,
    },
    Bps {
        bps: f64,
    },
    Zero,
}

impl Default for CommissionConfig {
    fn default() -> Self {
        let r = PerShareCommission::reference();
        CommissionConfig::PerShare {
            rate: r.rate,
            minimum: r.minimum,
            max_pct: r.max_pct,
        }
    }
}

impl CommissionConfig {
    pub fn build(&self) -> Box<dyn CommissionModel> {
        match *self {
            CommissionConfig::PerShare {
                rate,
                minimum,
                max_pct,
            } => Box::new(PerShareCommission {
                rate,
                minimum,
                max_pct,
            }),
            CommissionConfig::Bps { bps } => Box::new(BpsCommission { bps }),
            CommissionConfig::Zero => Box::new(ZeroCommission),
        }
    }

    /// Every numeric parameter must be finite and non-negative.
    pub fn is_valid(&self) -> bool {
        let ok = |v: f64| v.is_finite() && v >= 0.0;
        match *self {
            CommissionConfig::PerShare {
                rate,
                minimum,
                max_pct,
            } => ok(rate) && ok(minimum) && max_pct.map_or(true, ok),
            CommissionConfig::Bps { bps } => ok(bps),
            CommissionConfig::Zero => true,
        }
    }
}
