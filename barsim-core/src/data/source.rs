//! Bar source trait and structured error types.
//!
//! The simulation only ever talks to bars through `BarSource`, so historical
//! files, synthetic series, and test fixtures are interchangeable. A source
//! never exposes a bar past the step it most recently advanced to.

use crate::domain::Bar;
use crate::events::EventBus;
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;
use thiserror::Error;

/// Latest bar per quoted symbol for the current step.
pub type BarMap<'a> = HashMap<&'a str, &'a Bar>;

/// Errors raised while building a bar source. All of them are terminal:
/// the run aborts before the event loop starts.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no symbols requested")]
    NoSymbols,

    #[error("no bars available for symbol '{symbol}'")]
    NoData { symbol: String },

    #[error("bars for '{symbol}' are not strictly increasing at {timestamp}")]
    Unsorted {
        symbol: String,
        timestamp: NaiveDateTime,
    },

    #[error("invalid OHLCV bar for '{symbol}' at {timestamp}")]
    InvalidBar {
        symbol: String,
        timestamp: NaiveDateTime,
    },

    #[error("bar tagged '{found}' supplied under symbol '{symbol}'")]
    SymbolMismatch { symbol: String, found: String },
}

/// Supplies bars to the simulation one step at a time.
pub trait BarSource {
    /// Symbols this source quotes, in a stable order.
    fn symbols(&self) -> &[String];

    /// False once any symbol has run out of bars.
    fn continue_backtest(&self) -> bool;

    /// Advance one step and enqueue one `Market` event, or clear the
    /// continue flag when exhausted.
    fn update_bars(&mut self, bus: &mut EventBus);

    /// Timestamp of the first step, before anything is published.
    fn start_time(&self) -> Option<NaiveDateTime>;

    /// Stamp for the all-cash row recorded before the first step.
    ///
    /// One bar interval ahead of `start_time` so it never collides with the
    /// first bar's row. Defaults to a daily interval.
    fn opening_time(&self) -> Option<NaiveDateTime> {
        self.start_time().map(|t| t - Duration::days(1))
    }

    /// Timestamp of the most recently published step.
    fn current_time(&self) -> Option<NaiveDateTime>;

    /// Published bars for `symbol` within `[start, end]`, keeping the last `n`.
    fn get_bars(
        &self,
        symbol: &str,
        n: Option<usize>,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> &[Bar];

    /// The last `n` published bars for `symbol`, oldest first.
    fn get_latest_bars(&self, symbol: &str, n: usize) -> &[Bar] {
        self.get_bars(symbol, Some(n), None, None)
    }

    fn latest_bar(&self, symbol: &str) -> Option<&Bar> {
        self.get_latest_bars(symbol, 1).last()
    }

    /// Latest bar for every symbol that has one.
    fn latest_bar_map(&self) -> BarMap<'_> {
        self.symbols()
            .iter()
            .filter_map(|s| self.latest_bar(s).map(|b| (s.as_str(), b)))
            .collect()
    }
}
