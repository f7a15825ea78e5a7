//! Event model: the closed set of messages that flow through the bus.
//!
//! Data flows one direction per step:
//! bar source → `Market` → strategy → `Signal` → portfolio → `Order`
//! → matching engine → `Fill` → portfolio.

pub mod bus;

pub use bus::EventBus;

use crate::domain::{Fill, OrderId, OrderKind, OrderRequest};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A new bar has been published for every symbol at `timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub timestamp: NaiveDateTime,
}

/// What the strategy wants done with a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    Long,
    Short,
    Exit,
    MktImmediateLong,
    MktImmediateShort,
    MktImmediateExit,
}

impl SignalKind {
    /// The plain LONG/SHORT/EXIT intent behind an immediate variant.
    pub fn base(self) -> SignalKind {
        match self {
            SignalKind::MktImmediateLong => SignalKind::Long,
            SignalKind::MktImmediateShort => SignalKind::Short,
            SignalKind::MktImmediateExit => SignalKind::Exit,
            other => other,
        }
    }

    pub fn forces_immediate(self) -> bool {
        matches!(
            self,
            SignalKind::MktImmediateLong | SignalKind::MktImmediateShort | SignalKind::MktImmediateExit
        )
    }
}

/// Position sizing requested by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sizing {
    /// Literal share count.
    FixedShares(u64),
    /// Fraction of total equity, e.g. 0.25.
    PercentEquity(f64),
    /// Dollar amount to deploy.
    FixedCapital(f64),
}

/// A strategy's trading intent for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub kind: SignalKind,
    /// `None` falls back to the portfolio's default quantity.
    pub sizing: Option<Sizing>,
    pub order_kind: OrderKind,
    pub limit_price: Option<f64>,
    pub stop_price: Option<f64>,
    pub trail_offset: Option<f64>,
    pub immediate_fill: bool,
}

impl SignalEvent {
    /// A market-order signal with default sizing.
    pub fn new(symbol: impl Into<String>, timestamp: NaiveDateTime, kind: SignalKind) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            kind,
            sizing: None,
            order_kind: OrderKind::Market,
            limit_price: None,
            stop_price: None,
            trail_offset: None,
            immediate_fill: false,
        }
    }

    pub fn with_sizing(mut self, sizing: Sizing) -> Self {
        self.sizing = Some(sizing);
        self
    }

    pub fn with_limit(mut self, limit_price: f64) -> Self {
        self.order_kind = OrderKind::Limit;
        self.limit_price = Some(limit_price);
        self
    }

    pub fn with_stop(mut self, stop_price: f64) -> Self {
        self.order_kind = OrderKind::Stop;
        self.stop_price = Some(stop_price);
        self
    }

    pub fn with_stop_limit(mut self, stop_price: f64, limit_price: f64) -> Self {
        self.order_kind = OrderKind::StopLimit;
        self.stop_price = Some(stop_price);
        self.limit_price = Some(limit_price);
        self
    }

    pub fn with_trailing_stop(mut self, trail_offset: f64) -> Self {
        self.order_kind = OrderKind::TrailingStop;
        self.trail_offset = Some(trail_offset);
        self
    }

    pub fn with_immediate_fill(mut self) -> Self {
        self.immediate_fill = true;
        self
    }

    /// Immediate variants force a same-bar fill attempt.
    pub fn wants_immediate_fill(&self) -> bool {
        self.immediate_fill || self.kind.forces_immediate()
    }
}

/// Every message the simulation passes between components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Market(MarketEvent),
    Signal(SignalEvent),
    Order(OrderRequest),
    CancelOrder { order_id: OrderId },
    Fill(Fill),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Market(_) => EventKind::Market,
            Event::Signal(_) => EventKind::Signal,
            Event::Order(_) => EventKind::Order,
            Event::CancelOrder { .. } => EventKind::CancelOrder,
            Event::Fill(_) => EventKind::Fill,
        }
    }
}

/// Event tag, used for logging and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Market,
    Signal,
    Order,
    CancelOrder,
    Fill,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            EventKind::Market => "MARKET",
            EventKind::Signal => "SIGNAL",
            EventKind::Order => "ORDER",
            EventKind::CancelOrder => "CANCEL_ORDER",
            EventKind::Fill => "FILL",
        };
        f.write_str(tag)
    }
}
