//! Portfolio ledger: positions, cash, snapshots, and realized trades.
//!
//! The portfolio consumes three things from the driver:
//! - market steps, which append one position and one holdings snapshot
//!   marked at the new bar's close (before that bar's orders are matched);
//! - signals, which it sizes into at most one order request;
//! - fills, which move position and cash and reconcile the open lot.

pub mod equity;
pub mod lots;
pub mod sizing;

pub use equity::equity_curve;
pub use lots::LotBook;
pub use sizing::order_quantity;

use crate::data::BarMap;
use crate::domain::{
    ClosedTrade, EquityPoint, Fill, HoldingsSnapshot, OpenLot, OrderRequest, OrderSide,
    PositionSnapshot,
};
use crate::events::{SignalEvent, SignalKind};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq)]
pub enum PortfolioError {
    #[error("no bar available for '{symbol}'")]
    NoBar { symbol: String },
}

#[derive(Debug, Clone)]
pub struct Portfolio {
    initial_capital: f64,
    default_quantity: u64,
    positions: BTreeMap<String, i64>,
    cash: f64,
    commission: f64,
    slippage: f64,
    /// Last known close per symbol, carried forward across bars without a quote.
    last_close: HashMap<String, f64>,
    all_positions: Vec<PositionSnapshot>,
    all_holdings: Vec<HoldingsSnapshot>,
    lots: LotBook,
}

impl Portfolio {
    /// A flat portfolio over `symbols`.
    ///
    /// When `start` is given, an initial snapshot row (all cash) is recorded
    /// there so the equity curve starts at `initial_capital`. The driver
    /// passes the source's opening time, one interval before the first bar.
    pub fn new(
        symbols: &[String],
        initial_capital: f64,
        default_quantity: u64,
        start: Option<NaiveDateTime>,
    ) -> Self {
        let positions: BTreeMap<String, i64> = symbols.iter().map(|s| (s.clone(), 0)).collect();
        let mut portfolio = Self {
            initial_capital,
            default_quantity,
            positions,
            cash: initial_capital,
            commission: 0.0,
            slippage: 0.0,
            last_close: HashMap::new(),
            all_positions: Vec::new(),
            all_holdings: Vec::new(),
            lots: LotBook::new(),
        };
        if let Some(t) = start {
            portfolio.record_snapshot(t);
        }
        portfolio
    }

    // ── Event handlers ────────────────────────────────────────────────

    /// Mark to the new bars and append one snapshot row.
    pub fn on_market(&mut self, timestamp: NaiveDateTime, bars: &BarMap<'_>) {
        for (symbol, bar) in bars {
            if !bar.is_void() {
                self.last_close.insert((*symbol).to_string(), bar.close);
            }
        }
        self.record_snapshot(timestamp);
    }

    /// Size a signal into an order request.
    ///
    /// Entries only fire while flat and exits only while holding; anything
    /// else, or an entry that sizes to zero shares, yields `Ok(None)`.
    pub fn on_signal(
        &self,
        signal: &SignalEvent,
        bars: &BarMap<'_>,
    ) -> Result<Option<OrderRequest>, PortfolioError> {
        let bar = bars
            .get(signal.symbol.as_str())
            .ok_or_else(|| PortfolioError::NoBar {
                symbol: signal.symbol.clone(),
            })?;
        let position = self.position(&signal.symbol);

        let (side, quantity) = match signal.kind.base() {
            SignalKind::Long | SignalKind::Short if position != 0 => {
                debug!(symbol = %signal.symbol, position, "entry signal ignored, not flat");
                return Ok(None);
            }
            SignalKind::Exit if position == 0 => {
                debug!(symbol = %signal.symbol, "exit signal ignored, already flat");
                return Ok(None);
            }
            SignalKind::Exit => {
                let side = if position > 0 {
                    OrderSide::Sell
                } else {
                    OrderSide::Buy
                };
                (side, position.unsigned_abs())
            }
            kind => {
                let side = if kind == SignalKind::Long {
                    OrderSide::Buy
                } else {
                    OrderSide::Sell
                };
                let qty = order_quantity(
                    signal.sizing,
                    self.total_equity(),
                    bar.close,
                    self.default_quantity,
                );
                (side, qty)
            }
        };

        if quantity == 0 {
            warn!(symbol = %signal.symbol, sizing = ?signal.sizing, "signal sized to zero shares, dropped");
            return Ok(None);
        }

        Ok(Some(OrderRequest {
            symbol: signal.symbol.clone(),
            kind: signal.order_kind,
            quantity,
            side,
            limit_price: signal.limit_price,
            stop_price: signal.stop_price,
            trail_offset: signal.trail_offset,
            immediate_fill: signal.wants_immediate_fill(),
        }))
    }

    /// Book a fill: position, cash, commission, then lot reconciliation.
    pub fn on_fill(&mut self, fill: &Fill) {
        *self.positions.entry(fill.symbol.clone()).or_insert(0) += fill.signed_quantity();
        self.cash += fill.cash_delta();
        self.commission += fill.commission;
        self.slippage += fill.slippage;
        self.lots.apply_fill(fill);
        debug!(
            symbol = %fill.symbol,
            side = %fill.side,
            quantity = fill.quantity,
            cash = self.cash,
            "fill booked"
        );
    }

    fn record_snapshot(&mut self, timestamp: NaiveDateTime) {
        let market_values: BTreeMap<String, f64> = self
            .positions
            .iter()
            .map(|(s, &qty)| (s.clone(), self.market_value(s, qty)))
            .collect();
        let total = self.cash + market_values.values().sum::<f64>();

        self.all_positions.push(PositionSnapshot {
            timestamp,
            positions: self.positions.clone(),
        });
        self.all_holdings.push(HoldingsSnapshot {
            timestamp,
            cash: self.cash,
            commission: self.commission,
            market_values,
            total,
        });
    }

    fn market_value(&self, symbol: &str, qty: i64) -> f64 {
        if qty == 0 {
            return 0.0;
        }
        self.last_close.get(symbol).map_or(0.0, |&c| qty as f64 * c)
    }

    // ── Accessors ─────────────────────────────────────────────────────

    pub fn position(&self, symbol: &str) -> i64 {
        self.positions.get(symbol).copied().unwrap_or(0)
    }

    pub fn positions(&self) -> &BTreeMap<String, i64> {
        &self.positions
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Cumulative commission paid.
    pub fn commission(&self) -> f64 {
        self.commission
    }

    /// Cumulative slippage cost, already reflected in cash.
    pub fn slippage(&self) -> f64 {
        self.slippage
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    /// Cash plus positions marked at the last known closes.
    pub fn total_equity(&self) -> f64 {
        self.cash
            + self
                .positions
                .iter()
                .map(|(s, &q)| self.market_value(s, q))
                .sum::<f64>()
    }

    pub fn open_lot(&self, symbol: &str) -> Option<&OpenLot> {
        self.lots.open_lot(symbol)
    }

    pub fn open_lots(&self) -> &BTreeMap<String, OpenLot> {
        self.lots.open_lots()
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        self.lots.closed_trades()
    }

    /// Sum of closed-trade PnL, net of commissions.
    pub fn realized_pnl(&self) -> f64 {
        self.closed_trades().iter().map(|t| t.pnl).sum()
    }

    /// Open lots marked at the last known closes, before commissions.
    pub fn unrealized_pnl(&self) -> f64 {
        self.open_lots()
            .iter()
            .filter_map(|(s, lot)| self.last_close.get(s).map(|&c| lot.unrealized_pnl(c)))
            .sum()
    }

    pub fn position_history(&self) -> &[PositionSnapshot] {
        &self.all_positions
    }

    pub fn holdings_history(&self) -> &[HoldingsSnapshot] {
        &self.all_holdings
    }

    pub fn equity_curve(&self) -> Vec<EquityPoint> {
        equity_curve(&self.all_holdings, self.initial_capital)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, OrderId, OrderKind};
    use crate::events::Sizing;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            symbol: "AAPL".into(),
            timestamp: ts(day),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000_000.0,
        }
    }

    fn fill(day: u32, side: OrderSide, qty: u64, price: f64, commission: f64) -> Fill {
        Fill {
            timestamp: ts(day),
            symbol: "AAPL".into(),
            quantity: qty,
            side,
            fill_price: price,
            fill_cost: price * qty as f64,
            commission,
            slippage: 0.0,
            gap_through: false,
            order_id: OrderId(1),
            partial_fill: false,
        }
    }

    fn portfolio() -> Portfolio {
        Portfolio::new(&["AAPL".to_string()], 100_000.0, 100, Some(ts(1)))
    }

    #[test]
    fn initial_row_is_all_cash() {
        let p = portfolio();
        assert_eq!(p.holdings_history().len(), 1);
        assert_eq!(p.holdings_history()[0].total, 100_000.0);
        assert_eq!(p.position_history()[0].positions["AAPL"], 0);
    }

    #[test]
    fn slippage_accumulates_across_fills() {
        let mut p = portfolio();
        let mut buy = fill(1, OrderSide::Buy, 100, 100.1, 0.0);
        buy.slippage = 10.0;
        let mut sell = fill(2, OrderSide::Sell, 100, 104.9, 0.0);
        sell.slippage = 10.0;
        p.on_fill(&buy);
        p.on_fill(&sell);
        assert!((p.slippage() - 20.0).abs() < 1e-9);
        assert!((p.cash() - (100_000.0 - 10_010.0 + 10_490.0)).abs() < 1e-6);
    }

    #[test]
    fn snapshot_marks_at_close() {
        let mut p = portfolio();
        p.on_fill(&fill(1, OrderSide::Buy, 100, 100.0, 1.0));
        let b = bar(2, 105.0);
        p.on_market(ts(2), &HashMap::from([("AAPL", &b)]));
        let h = p.holdings_history().last().unwrap();
        assert_eq!(h.market_values["AAPL"], 10_500.0);
        assert_eq!(h.cash, 100_000.0 - 10_000.0 - 1.0);
        assert_eq!(h.total, h.cash + 10_500.0);
        assert_eq!(h.commission, 1.0);
    }

    #[test]
    fn missing_quote_carries_last_close() {
        let mut p = portfolio();
        let b = bar(2, 50.0);
        p.on_market(ts(2), &HashMap::from([("AAPL", &b)]));
        p.on_fill(&fill(2, OrderSide::Buy, 10, 50.0, 0.0));
        p.on_market(ts(3), &HashMap::new());
        assert_eq!(p.holdings_history().last().unwrap().market_values["AAPL"], 500.0);
    }

    #[test]
    fn long_signal_sizes_default_quantity() {
        let p = portfolio();
        let b = bar(1, 100.0);
        let sig = SignalEvent::new("AAPL", ts(1), SignalKind::Long);
        let req = p.on_signal(&sig, &HashMap::from([("AAPL", &b)])).unwrap().unwrap();
        assert_eq!(req.side, OrderSide::Buy);
        assert_eq!(req.quantity, 100);
        assert_eq!(req.kind, OrderKind::Market);
        assert!(!req.immediate_fill);
    }

    #[test]
    fn entry_ignored_while_holding() {
        let mut p = portfolio();
        p.on_fill(&fill(1, OrderSide::Buy, 100, 100.0, 0.0));
        let b = bar(2, 100.0);
        let sig = SignalEvent::new("AAPL", ts(2), SignalKind::Short);
        assert_eq!(p.on_signal(&sig, &HashMap::from([("AAPL", &b)])), Ok(None));
    }

    #[test]
    fn exit_closes_short_with_buy() {
        let mut p = portfolio();
        p.on_fill(&fill(1, OrderSide::Sell, 40, 100.0, 0.0));
        let b = bar(2, 100.0);
        let sig = SignalEvent::new("AAPL", ts(2), SignalKind::MktImmediateExit)
            .with_sizing(Sizing::FixedShares(999));
        let req = p.on_signal(&sig, &HashMap::from([("AAPL", &b)])).unwrap().unwrap();
        assert_eq!(req.side, OrderSide::Buy);
        assert_eq!(req.quantity, 40);
        assert!(req.immediate_fill);
    }

    #[test]
    fn exit_while_flat_is_ignored() {
        let p = portfolio();
        let b = bar(1, 100.0);
        let sig = SignalEvent::new("AAPL", ts(1), SignalKind::Exit);
        assert_eq!(p.on_signal(&sig, &HashMap::from([("AAPL", &b)])), Ok(None));
    }

    #[test]
    fn zero_sized_signal_is_dropped() {
        let p = portfolio();
        let b = bar(1, 100.0);
        let sig = SignalEvent::new("AAPL", ts(1), SignalKind::Long)
            .with_sizing(Sizing::FixedCapital(50.0));
        assert_eq!(p.on_signal(&sig, &HashMap::from([("AAPL", &b)])), Ok(None));
    }

    #[test]
    fn signal_without_bar_is_an_error() {
        let p = portfolio();
        let sig = SignalEvent::new("AAPL", ts(1), SignalKind::Long);
        assert_eq!(
            p.on_signal(&sig, &HashMap::new()),
            Err(PortfolioError::NoBar {
                symbol: "AAPL".into()
            })
        );
    }

    #[test]
    fn signal_order_fields_carry_through() {
        let p = portfolio();
        let b = bar(1, 100.0);
        let sig = SignalEvent::new("AAPL", ts(1), SignalKind::Long).with_stop_limit(101.0, 102.0);
        let req = p.on_signal(&sig, &HashMap::from([("AAPL", &b)])).unwrap().unwrap();
        assert_eq!(req.kind, OrderKind::StopLimit);
        assert_eq!(req.stop_price, Some(101.0));
        assert_eq!(req.limit_price, Some(102.0));
    }

    #[test]
    fn flat_after_round_trip_realized_matches_equity_change() {
        let mut p = portfolio();
        p.on_fill(&fill(1, OrderSide::Buy, 100, 100.0, 0.35));
        p.on_fill(&fill(2, OrderSide::Sell, 100, 103.0, 0.35));
        assert_eq!(p.position("AAPL"), 0);
        assert!(p.open_lot("AAPL").is_none());
        assert!((p.realized_pnl() - (p.total_equity() - 100_000.0)).abs() < 1e-9);
        assert!((p.commission() - 0.70).abs() < 1e-12);
    }
}
