//! Strategy trait: the pluggable signal generator.
//!
//! A strategy sees each market step after matching and the portfolio
//! snapshot have run, so the state it reads is already marked to the new
//! bar. It talks back only through the bus: `Signal` events to trade and
//! `CancelOrder` events to pull resting orders.

use crate::data::BarSource;
use crate::engine::OrderBook;
use crate::events::{EventBus, MarketEvent};
use crate::portfolio::Portfolio;

/// Read-only view of the simulation handed to a strategy each step.
pub struct StrategyContext<'a> {
    pub bars: &'a dyn BarSource,
    pub portfolio: &'a Portfolio,
    pub orders: &'a OrderBook,
}

pub trait Strategy {
    fn name(&self) -> &str;

    /// React to one market step by enqueueing zero or more events.
    fn calculate_signals(
        &mut self,
        market: &MarketEvent,
        ctx: &StrategyContext<'_>,
        bus: &mut EventBus,
    );
}
