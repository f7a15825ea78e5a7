//! Lot reconciliation: turns fills into open lots and closed trades.
//!
//! Each symbol has at most one open lot. A fill in the lot's direction
//! extends it at a size-weighted price; a fill against it closes up to the
//! lot's quantity and any excess opens a fresh lot the other way.

use crate::domain::trade::gross_pnl;
use crate::domain::{ClosedTrade, Fill, OpenLot, TradeDirection};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct LotBook {
    open: BTreeMap<String, OpenLot>,
    closed: Vec<ClosedTrade>,
}

impl LotBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_lot(&self, symbol: &str) -> Option<&OpenLot> {
        self.open.get(symbol)
    }

    pub fn open_lots(&self) -> &BTreeMap<String, OpenLot> {
        &self.open
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        &self.closed
    }

    /// Reconcile one fill against the symbol's open lot.
    pub fn apply_fill(&mut self, fill: &Fill) {
        if fill.quantity == 0 {
            return;
        }
        let direction = TradeDirection::from_side(fill.side);

        match self.open.remove(&fill.symbol) {
            None => {
                self.open.insert(
                    fill.symbol.clone(),
                    OpenLot {
                        entry_time: fill.timestamp,
                        entry_price: fill.fill_price,
                        quantity: fill.quantity,
                        direction,
                        entry_commission: fill.commission,
                    },
                );
            }
            Some(mut lot) if lot.direction == direction => {
                let new_qty = lot.quantity + fill.quantity;
                lot.entry_price = (lot.entry_price * lot.quantity as f64
                    + fill.fill_price * fill.quantity as f64)
                    / new_qty as f64;
                lot.quantity = new_qty;
                lot.entry_commission += fill.commission;
                self.open.insert(fill.symbol.clone(), lot);
            }
            Some(lot) => self.close_against(lot, fill),
        }
    }

    /// Close `min(fill, lot)` shares of an opposing lot; open the excess.
    fn close_against(&mut self, mut lot: OpenLot, fill: &Fill) {
        let closed_qty = fill.quantity.min(lot.quantity);
        let entry_share = lot.entry_commission * closed_qty as f64 / lot.quantity as f64;
        let exit_share = fill.commission * closed_qty as f64 / fill.quantity as f64;
        let pnl = gross_pnl(lot.direction, lot.entry_price, fill.fill_price, closed_qty)
            - entry_share
            - exit_share;

        let trade = ClosedTrade {
            symbol: fill.symbol.clone(),
            entry_time: lot.entry_time,
            exit_time: fill.timestamp,
            entry_price: lot.entry_price,
            exit_price: fill.fill_price,
            quantity: closed_qty,
            direction: lot.direction,
            pnl,
            commission: entry_share + exit_share,
            duration_days: (fill.timestamp - lot.entry_time).num_days(),
        };
        debug!(
            symbol = %trade.symbol,
            direction = %trade.direction,
            quantity = trade.quantity,
            pnl = trade.pnl,
            "trade closed"
        );
        self.closed.push(trade);

        lot.quantity -= closed_qty;
        lot.entry_commission -= entry_share;
        if lot.quantity > 0 {
            self.open.insert(fill.symbol.clone(), lot);
        }

        let excess = fill.quantity - closed_qty;
        if excess > 0 {
            // Reversal: the remainder of this fill opens the other side, carrying
            // its quantity-proportional share of the fill's commission.
            self.open.insert(
                fill.symbol.clone(),
                OpenLot {
                    entry_time: fill.timestamp,
                    entry_price: fill.fill_price,
                    quantity: excess,
                    direction: TradeDirection::from_side(fill.side),
                    entry_commission: fill.commission * excess as f64 / fill.quantity as f64,
                },
            );
        }
    }
}
