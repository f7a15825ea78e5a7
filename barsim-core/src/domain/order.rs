//! Order types: the submission request, the validated order type, and the
//! resting order record owned by the matching engine.

use super::ids::OrderId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Configuration errors: an order request that cannot enter the resting set.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    #[error("{kind} order requires a {field}")]
    MissingPrice { kind: OrderKind, field: &'static str },

    #[error("{field} must be finite and positive, got {value}")]
    InvalidPrice { field: &'static str, value: f64 },

    #[error("order quantity must be positive")]
    ZeroQuantity,
}

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// +1 for buys, -1 for sells.
    pub fn sign(self) -> i64 {
        match self {
            OrderSide::Buy => 1,
            OrderSide::Sell => -1,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type tag as carried on signals and order requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderKind {
    #[default]
    #[serde(rename = "MKT")]
    Market,
    #[serde(rename = "LMT")]
    Limit,
    #[serde(rename = "STP")]
    Stop,
    #[serde(rename = "STP_LMT")]
    StopLimit,
    #[serde(rename = "TRAIL")]
    TrailingStop,
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            OrderKind::Market => "MKT",
            OrderKind::Limit => "LMT",
            OrderKind::Stop => "STP",
            OrderKind::StopLimit => "STP_LMT",
            OrderKind::TrailingStop => "TRAIL",
        };
        f.write_str(tag)
    }
}

/// Validated order type with its price parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrderType {
    /// Fills at the bar's open.
    Market,
    /// Fills at the limit price or better.
    Limit { limit_price: f64 },
    /// Triggers when the bar touches the stop, then fills as market.
    Stop { stop_price: f64 },
    /// Triggers at the stop, then applies the limit rule on the same bar.
    StopLimit { stop_price: f64, limit_price: f64 },
    /// Trigger follows the running bar extreme at a fixed offset.
    TrailingStop { trail_offset: f64 },
}

impl OrderType {
    pub fn kind(&self) -> OrderKind {
        match self {
            OrderType::Market => OrderKind::Market,
            OrderType::Limit { .. } => OrderKind::Limit,
            OrderType::Stop { .. } => OrderKind::Stop,
            OrderType::StopLimit { .. } => OrderKind::StopLimit,
            OrderType::TrailingStop { .. } => OrderKind::TrailingStop,
        }
    }
}

/// An order as submitted through the bus (the `Order` event payload).
///
/// Price fields are optional here; [`OrderRequest::validate`] turns the
/// request into an [`OrderType`] or rejects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub kind: OrderKind,
    pub quantity: u64,
    pub side: OrderSide,
    pub limit_price: Option<f64>,
    pub stop_price: Option<f64>,
    pub trail_offset: Option<f64>,
    /// Attempt a same-bar fill against the current market event.
    pub immediate_fill: bool,
}

impl OrderRequest {
    pub fn market(symbol: impl Into<String>, side: OrderSide, quantity: u64) -> Self {
        Self {
            symbol: symbol.into(),
            kind: OrderKind::Market,
            quantity,
            side,
            limit_price: None,
            stop_price: None,
            trail_offset: None,
            immediate_fill: false,
        }
    }

    pub fn limit(symbol: impl Into<String>, side: OrderSide, quantity: u64, limit: f64) -> Self {
        Self {
            kind: OrderKind::Limit,
            limit_price: Some(limit),
            ..Self::market(symbol, side, quantity)
        }
    }

    pub fn stop(symbol: impl Into<String>, side: OrderSide, quantity: u64, stop: f64) -> Self {
        Self {
            kind: OrderKind::Stop,
            stop_price: Some(stop),
            ..Self::market(symbol, side, quantity)
        }
    }

    pub fn stop_limit(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: u64,
        stop: f64,
        limit: f64,
    ) -> Self {
        Self {
            kind: OrderKind::StopLimit,
            stop_price: Some(stop),
            limit_price: Some(limit),
            ..Self::market(symbol, side, quantity)
        }
    }

    pub fn trailing_stop(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: u64,
        offset: f64,
    ) -> Self {
        Self {
            kind: OrderKind::TrailingStop,
            trail_offset: Some(offset),
            ..Self::market(symbol, side, quantity)
        }
    }

    pub fn with_immediate_fill(mut self) -> Self {
        self.immediate_fill = true;
        self
    }

    /// Check the request's fields against its order kind.
    pub fn validate(&self) -> Result<OrderType, OrderError> {
        if self.quantity == 0 {
            return Err(OrderError::ZeroQuantity);
        }
        let order_type = match self.kind {
            OrderKind::Market => OrderType::Market,
            OrderKind::Limit => OrderType::Limit {
                limit_price: require(self.kind, "limit price", self.limit_price)?,
            },
            OrderKind::Stop => OrderType::Stop {
                stop_price: require(self.kind, "stop price", self.stop_price)?,
            },
            OrderKind::StopLimit => OrderType::StopLimit {
                stop_price: require(self.kind, "stop price", self.stop_price)?,
                limit_price: require(self.kind, "limit price", self.limit_price)?,
            },
            OrderKind::TrailingStop => OrderType::TrailingStop {
                trail_offset: require(self.kind, "trail offset", self.trail_offset)?,
            },
        };
        Ok(order_type)
    }
}

fn require(kind: OrderKind, field: &'static str, value: Option<f64>) -> Result<f64, OrderError> {
    let value = value.ok_or(OrderError::MissingPrice { kind, field })?;
    if !value.is_finite() || value <= 0.0 {
        return Err(OrderError::InvalidPrice { field, value });
    }
    Ok(value)
}

/// A resting order in the matching engine.
///
/// `filled_quantity` and the trailing extrema are the only fields that change
/// after submission. The record is owned by the order book and never aliased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: u64,
    pub filled_quantity: u64,
    pub immediate_fill: bool,
    /// Running max of bar highs seen while resting (trailing buys).
    pub highest_seen: f64,
    /// Running min of bar lows seen while resting (trailing sells).
    pub lowest_seen: f64,
}

impl Order {
    /// Build a resting order from a validated request.
    pub fn from_request(id: OrderId, request: &OrderRequest) -> Result<Self, OrderError> {
        let order_type = request.validate()?;
        Ok(Self {
            id,
            symbol: request.symbol.clone(),
            side: request.side,
            order_type,
            quantity: request.quantity,
            filled_quantity: 0,
            immediate_fill: request.immediate_fill,
            highest_seen: f64::NEG_INFINITY,
            lowest_seen: f64::INFINITY,
        })
    }

    pub fn remaining_quantity(&self) -> u64 {
        self.quantity.saturating_sub(self.filled_quantity)
    }

    pub fn is_filled(&self) -> bool {
        self.filled_quantity >= self.quantity
    }
}
