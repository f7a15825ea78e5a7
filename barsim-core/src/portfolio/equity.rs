//! Equity curve derived from the holdings history.
//!
//! Recomputed on demand; nothing here is stored on the portfolio.

use crate::domain::{EquityPoint, HoldingsSnapshot};

/// Period returns as `total.pct_change()`, compounded from `initial_capital`.
///
/// The first row has no return. A return that cannot be computed (previous
/// total of zero) is recorded as `None` and compounds as 0.
pub fn equity_curve(holdings: &[HoldingsSnapshot], initial_capital: f64) -> Vec<EquityPoint> {
    let mut curve = Vec::with_capacity(holdings.len());
    let mut growth = 1.0;
    let mut prev: Option<f64> = None;

    for h in holdings {
        let returns = prev.and_then(|p| (p != 0.0).then(|| h.total / p - 1.0));
        growth *= 1.0 + returns.unwrap_or(0.0);
        curve.push(EquityPoint {
            timestamp: h.timestamp,
            total: h.total,
            returns,
            equity: initial_capital * growth,
        });
        prev = Some(h.total);
    }
    curve
}
