//! Per-bar portfolio snapshots and the derived equity curve.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Signed share count per symbol at one time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub timestamp: NaiveDateTime,
    pub positions: BTreeMap<String, i64>,
}

/// Cash, commission, and mark-to-market values at one time step.
///
/// The accounting identity `total == cash + sum(market_values)` holds for
/// every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingsSnapshot {
    pub timestamp: NaiveDateTime,
    pub cash: f64,
    pub commission: f64,
    pub market_values: BTreeMap<String, f64>,
    pub total: f64,
}

/// One row of the equity curve derived from the holdings history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub total: f64,
    /// `total.pct_change()`; `None` for the first row.
    pub returns: Option<f64>,
    /// Running product of `(1 + returns)` scaled by initial capital.
    pub equity: f64,
}
