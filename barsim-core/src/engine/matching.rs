//! Order-matching engine: the exchange simulator.
//!
//! Owns the resting-order set. On every market step each resting order whose
//! symbol has a bar is evaluated by the execution engine; fills go onto the
//! bus and fully filled orders leave the book.
//!
//! `fill_immediate` is a direct call, not a queued event. The driver invokes
//! it synchronously right after submitting an order flagged for a same-bar
//! fill, so the fill lands on the bus ahead of anything queued later.

use crate::data::BarMap;
use crate::domain::{Bar, Fill, IdGen, Order, OrderError, OrderId, OrderRequest};
use crate::engine::execution::ExecutionEngine;
use crate::engine::order_book::{OrderBook, OrderBookError};
use crate::events::{Event, EventBus};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum MatchingError {
    #[error("order rejected: {0}")]
    Rejected(#[from] OrderError),

    #[error(transparent)]
    Book(#[from] OrderBookError),

    #[error("order {0} is not resting")]
    UnknownOrder(OrderId),

    #[error("no bar for '{symbol}' to fill order {order_id}")]
    NoBar { order_id: OrderId, symbol: String },
}

#[derive(Debug)]
pub struct MatchingEngine {
    book: OrderBook,
    id_gen: IdGen,
    execution: ExecutionEngine,
}

impl MatchingEngine {
    pub fn new(execution: ExecutionEngine) -> Self {
        Self {
            book: OrderBook::new(),
            id_gen: IdGen::default(),
            execution,
        }
    }

    /// Validate and register an order. Rejected requests never rest and do
    /// not consume an id.
    pub fn submit(&mut self, request: &OrderRequest) -> Result<OrderId, MatchingError> {
        if let Err(e) = request.validate() {
            warn!(symbol = %request.symbol, kind = %request.kind, error = %e, "order rejected");
            return Err(e.into());
        }
        let id = self.id_gen.next_order_id();
        let order = Order::from_request(id, request)?;
        self.book.insert(order)?;
        debug!(
            order_id = %id,
            symbol = %request.symbol,
            side = %request.side,
            kind = %request.kind,
            quantity = request.quantity,
            "order resting"
        );
        Ok(id)
    }

    /// Remove a resting order. Returns false if the id was not resting.
    pub fn cancel(&mut self, id: OrderId) -> bool {
        let removed = self.book.remove(id).is_some();
        if removed {
            debug!(order_id = %id, "order cancelled");
        } else {
            debug!(order_id = %id, "cancel ignored, order not resting");
        }
        removed
    }

    /// Evaluate every resting order against the new bars.
    ///
    /// Orders on symbols without a bar this step are left untouched. Returns
    /// the number of fills put on the bus.
    pub fn on_market(&mut self, bars: &BarMap<'_>, bus: &mut EventBus) -> usize {
        let mut fills = 0;
        for id in self.book.ids() {
            let Some(order) = self.book.get_mut(id) else {
                continue;
            };
            if order.remaining_quantity() == 0 {
                self.book.remove(id);
                continue;
            }
            let Some(bar) = bars.get(order.symbol.as_str()) else {
                continue;
            };
            if let Some(fill) = self.execute(id, bar) {
                bus.put(Event::Fill(fill));
                fills += 1;
            }
        }
        fills
    }

    /// Same-bar fill attempt for one named order.
    ///
    /// Returns the fill, if any, for the caller to enqueue. An order that does
    /// not fill stays resting for the next market step.
    pub fn fill_immediate(
        &mut self,
        id: OrderId,
        bars: &BarMap<'_>,
    ) -> Result<Option<Fill>, MatchingError> {
        let order = self.book.get(id).ok_or(MatchingError::UnknownOrder(id))?;
        let bar = bars
            .get(order.symbol.as_str())
            .copied()
            .ok_or_else(|| MatchingError::NoBar {
                order_id: id,
                symbol: order.symbol.clone(),
            })?;
        Ok(self.execute(id, bar))
    }

    /// Run the execution engine on one order and retire it once filled.
    fn execute(&mut self, id: OrderId, bar: &Bar) -> Option<Fill> {
        let order = self.book.get_mut(id)?;
        let fill = self.execution.execute(order, bar)?;
        debug!(
            order_id = %id,
            quantity = fill.quantity,
            price = fill.fill_price,
            partial = fill.partial_fill,
            "fill"
        );
        if order.is_filled() {
            self.book.remove(id);
        }
        Some(fill)
    }

    /// Read-only view of the resting set.
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn resting(&self, id: OrderId) -> Option<&Order> {
        self.book.get(id)
    }

    pub fn into_book(self) -> OrderBook {
        self.book
    }
}
