//! Resting-order set.
//!
//! The book is the only owner of live `Order` records from submission until
//! they are fully filled or cancelled. Every entry satisfies
//! `filled_quantity < quantity`; entries are keyed by id so iteration is in
//! submission order.
//!
//! The order book does NOT compute fill prices or apply slippage. That is the
//! execution engine's job. The book tracks order state only.

use crate::domain::{Order, OrderId};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from order book operations.
#[derive(Debug, Error, PartialEq)]
pub enum OrderBookError {
    #[error("order {0} is already resting")]
    DuplicateOrder(OrderId),

    #[error("order {0} has no remaining quantity")]
    NothingRemaining(OrderId),
}

/// Resting orders keyed by id.
#[derive(Debug, Default)]
pub struct OrderBook {
    orders: BTreeMap<OrderId, Order>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Public API ─────────────────────────────────────────────────────

    /// Add an order to the resting set.
    pub fn insert(&mut self, order: Order) -> Result<(), OrderBookError> {
        if order.is_filled() {
            return Err(OrderBookError::NothingRemaining(order.id));
        }
        if self.orders.contains_key(&order.id) {
            return Err(OrderBookError::DuplicateOrder(order.id));
        }
        self.orders.insert(order.id, order);
        Ok(())
    }

    /// Remove an order, returning it if it was resting.
    pub fn remove(&mut self, id: OrderId) -> Option<Order> {
        self.orders.remove(&id)
    }

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: OrderId) -> Option<&mut Order> {
        self.orders.get_mut(&id)
    }

    pub fn contains(&self, id: OrderId) -> bool {
        self.orders.contains_key(&id)
    }

    /// Resting order ids in ascending (submission) order.
    pub fn ids(&self) -> Vec<OrderId> {
        self.orders.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    /// Resting orders for one symbol, in submission order.
    pub fn orders_for_symbol<'a>(&'a self, symbol: &'a str) -> impl Iterator<Item = &'a Order> {
        self.orders.values().filter(move |o| o.symbol == symbol)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Drain the book, returning whatever is still resting.
    pub fn into_orders(self) -> Vec<Order> {
        self.orders.into_values().collect()
    }
}
