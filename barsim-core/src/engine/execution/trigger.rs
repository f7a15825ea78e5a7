//! Trigger checking: does a bar trigger a given order?
//!
//! Evaluates whether an order's condition is met within a bar's OHLC range
//! and computes the raw fill price before slippage and commission. The
//! intrabar path is unknown, so stops that are touched but not gapped fill
//! at the touched extreme unless the policy says otherwise.

use crate::domain::{Bar, Order, OrderSide, OrderType};
use serde::{Deserialize, Serialize};

/// Result of checking whether an order triggers on a bar.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerResult {
    /// Order does not trigger on this bar.
    NoTrigger,
    /// Order triggers and fills at the computed raw price.
    Fill { fill_price: f64, gap_through: bool },
}

/// Fill price for a stop that is touched inside the bar (open had not
/// yet crossed the stop).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopFillPolicy {
    /// Fill at the bar high (buy) or low (sell).
    #[default]
    TouchedExtreme,
    /// Fill at the stop price itself.
    TriggerPrice,
}

/// Fold the bar into a resting order's trailing extrema.
///
/// Runs on every bar the order sees, whether or not it fills.
pub fn track_extrema(order: &mut Order, bar: &Bar) {
    if bar.is_void() {
        return;
    }
    order.highest_seen = order.highest_seen.max(bar.high);
    order.lowest_seen = order.lowest_seen.min(bar.low);
}

/// Check whether an order triggers on a given bar and compute its raw fill price.
///
/// Does NOT apply slippage, commission or liquidity caps. Trailing orders
/// read the extrema already folded in by [`track_extrema`].
pub fn check_trigger(order: &Order, bar: &Bar, stop_fill: StopFillPolicy) -> TriggerResult {
    if bar.is_void() {
        return TriggerResult::NoTrigger;
    }

    match order.order_type {
        OrderType::Market => TriggerResult::Fill {
            fill_price: bar.open,
            gap_through: false,
        },
        OrderType::Limit { limit_price } => check_limit(order.side, limit_price, bar),
        OrderType::Stop { stop_price } => check_stop(order.side, stop_price, bar, stop_fill),
        OrderType::StopLimit {
            stop_price,
            limit_price,
        } => check_stop_limit(order.side, stop_price, limit_price, bar),
        OrderType::TrailingStop { trail_offset } => check_trailing(order, trail_offset, bar),
    }
}

/// Buy limit: fills if low <= limit, at min(open, limit).
/// Sell limit: fills at open if open >= limit, else at limit if high >= limit.
pub fn check_limit(side: OrderSide, limit: f64, bar: &Bar) -> TriggerResult {
    match side {
        OrderSide::Buy => {
            if bar.low <= limit {
                TriggerResult::Fill {
                    fill_price: bar.open.min(limit),
                    gap_through: bar.open <= limit,
                }
            } else {
                TriggerResult::NoTrigger
            }
        }
        OrderSide::Sell => {
            if bar.open >= limit {
                TriggerResult::Fill {
                    fill_price: bar.open,
                    gap_through: true,
                }
            } else if bar.high >= limit {
                TriggerResult::Fill {
                    fill_price: limit,
                    gap_through: false,
                }
            } else {
                TriggerResult::NoTrigger
            }
        }
    }
}

/// Buy stop: triggers if high >= stop. Gap-through fills at open.
/// Sell stop: triggers if low <= stop. Gap-through fills at open.
pub fn check_stop(
    side: OrderSide,
    stop: f64,
    bar: &Bar,
    stop_fill: StopFillPolicy,
) -> TriggerResult {
    let (touched, gapped, extreme) = match side {
        OrderSide::Buy => (bar.high >= stop, bar.open >= stop, bar.high),
        OrderSide::Sell => (bar.low <= stop, bar.open <= stop, bar.low),
    };
    if !touched {
        return TriggerResult::NoTrigger;
    }
    let fill_price = if gapped {
        bar.open
    } else {
        match stop_fill {
            StopFillPolicy::TouchedExtreme => extreme,
            StopFillPolicy::TriggerPrice => stop,
        }
    };
    TriggerResult::Fill {
        fill_price,
        gap_through: gapped,
    }
}

/// Stop condition first, then the limit rule on the same bar.
///
/// Nothing carries over: a bar that triggers the stop but misses the limit
/// leaves the order exactly as it was.
fn check_stop_limit(side: OrderSide, stop: f64, limit: f64, bar: &Bar) -> TriggerResult {
    let triggered = match side {
        OrderSide::Buy => bar.high >= stop,
        OrderSide::Sell => bar.low <= stop,
    };
    if !triggered {
        return TriggerResult::NoTrigger;
    }
    check_limit(side, limit, bar)
}

/// Buy trail: trigger = highest_seen - offset, fills if low <= trigger at
/// min(open, trigger). Sell trail mirrors with lowest_seen + offset.
fn check_trailing(order: &Order, offset: f64, bar: &Bar) -> TriggerResult {
    match order.side {
        OrderSide::Buy => {
            let trigger = order.highest_seen - offset;
            if bar.low <= trigger {
                TriggerResult::Fill {
                    fill_price: bar.open.min(trigger),
                    gap_through: bar.open <= trigger,
                }
            } else {
                TriggerResult::NoTrigger
            }
        }
        OrderSide::Sell => {
            let trigger = order.lowest_seen + offset;
            if bar.high >= trigger {
                TriggerResult::Fill {
                    fill_price: bar.open.max(trigger),
                    gap_through: bar.open >= trigger,
                }
            } else {
                TriggerResult::NoTrigger
            }
        }
    }
}
