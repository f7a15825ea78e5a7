//! Signal sizing: how many shares a signal asks for.

use crate::events::Sizing;

/// Share count for an entry signal.
///
/// `None` falls back to `default_quantity`. Fractional results are floored;
/// anything non-finite or negative sizes to zero.
pub fn order_quantity(
    sizing: Option<Sizing>,
    total_equity: f64,
    price: f64,
    default_quantity: u64,
) -> u64 {
    match sizing {
        None => default_quantity,
        Some(Sizing::FixedShares(shares)) => shares,
        Some(Sizing::PercentEquity(fraction)) => shares_for(total_equity * fraction, price),
        Some(Sizing::FixedCapital(capital)) => shares_for(capital, price),
    }
}

fn shares_for(capital: f64, price: f64) -> u64 {
    if price <= 0.0 || !price.is_finite() {
        return 0;
    }
    let shares = (capital / price).floor();
    if shares.is_finite() && shares > 0.0 {
        shares as u64
    } else {
        0
    }
}
