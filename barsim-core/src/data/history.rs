//! In-memory historical bar source.

use super::align::{align_symbols, AlignedData};
use super::source::{BarSource, SourceError};
use crate::domain::Bar;
use crate::events::{Event, EventBus, MarketEvent};
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;
use tracing::debug;

/// Replays pre-loaded bars one aligned step at a time.
#[derive(Debug)]
pub struct HistoricalBars {
    symbols: Vec<String>,
    aligned: AlignedData,
    /// Number of timeline steps published so far.
    published: usize,
    continue_backtest: bool,
}

impl HistoricalBars {
    /// Validate and align the given series.
    ///
    /// Every symbol in `symbols` must have at least one bar; series must be
    /// strictly increasing in time and pass the OHLCV sanity check.
    pub fn new(
        symbols: Vec<String>,
        data: HashMap<String, Vec<Bar>>,
    ) -> Result<Self, SourceError> {
        if symbols.is_empty() {
            return Err(SourceError::NoSymbols);
        }
        for symbol in &symbols {
            let bars = data
                .get(symbol)
                .filter(|b| !b.is_empty())
                .ok_or_else(|| SourceError::NoData {
                    symbol: symbol.clone(),
                })?;
            validate_series(symbol, bars)?;
        }

        let wanted: HashMap<String, Vec<Bar>> = data
            .into_iter()
            .filter(|(s, _)| symbols.contains(s))
            .collect();
        let aligned = align_symbols(&wanted);
        debug!(
            symbols = symbols.len(),
            steps = aligned.timeline.len(),
            "historical bars aligned"
        );

        Ok(Self {
            symbols,
            aligned,
            published: 0,
            continue_backtest: true,
        })
    }

    /// Total number of steps this source will publish.
    pub fn len(&self) -> usize {
        self.aligned.timeline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aligned.timeline.is_empty()
    }

    /// Bars for `symbol` published up to now.
    fn published_bars(&self, symbol: &str) -> &[Bar] {
        let (Some(bars), Some(&first)) = (
            self.aligned.bars.get(symbol),
            self.aligned.first_index.get(symbol),
        ) else {
            return &[];
        };
        let visible = self.published.saturating_sub(first).min(bars.len());
        &bars[..visible]
    }
}

fn validate_series(symbol: &str, bars: &[Bar]) -> Result<(), SourceError> {
    for (i, bar) in bars.iter().enumerate() {
        if bar.symbol != symbol {
            return Err(SourceError::SymbolMismatch {
                symbol: symbol.to_string(),
                found: bar.symbol.clone(),
            });
        }
        if !bar.is_sane() {
            return Err(SourceError::InvalidBar {
                symbol: symbol.to_string(),
                timestamp: bar.timestamp,
            });
        }
        if i > 0 && bars[i - 1].timestamp >= bar.timestamp {
            return Err(SourceError::Unsorted {
                symbol: symbol.to_string(),
                timestamp: bar.timestamp,
            });
        }
    }
    Ok(())
}

impl BarSource for HistoricalBars {
    fn symbols(&self) -> &[String] {
        &self.symbols
    }

    fn continue_backtest(&self) -> bool {
        self.continue_backtest
    }

    fn update_bars(&mut self, bus: &mut EventBus) {
        let Some(&timestamp) = self.aligned.timeline.get(self.published) else {
            self.continue_backtest = false;
            return;
        };
        self.published += 1;
        bus.put(Event::Market(MarketEvent { timestamp }));
    }

    fn start_time(&self) -> Option<NaiveDateTime> {
        self.aligned.timeline.first().copied()
    }

    fn opening_time(&self) -> Option<NaiveDateTime> {
        let timeline = &self.aligned.timeline;
        let first = *timeline.first()?;
        let interval = match timeline.get(1) {
            Some(&second) => second - first,
            None => Duration::days(1),
        };
        Some(first - interval)
    }

    fn current_time(&self) -> Option<NaiveDateTime> {
        self.published
            .checked_sub(1)
            .and_then(|i| self.aligned.timeline.get(i).copied())
    }

    fn get_bars(
        &self,
        symbol: &str,
        n: Option<usize>,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> &[Bar] {
        let bars = self.published_bars(symbol);
        let lo = start.map_or(0, |s| bars.partition_point(|b| b.timestamp < s));
        let hi = end.map_or(bars.len(), |e| bars.partition_point(|b| b.timestamp <= e));
        if lo >= hi {
            return &[];
        }
        let window = &bars[lo..hi];
        match n {
            Some(n) => &window[window.len().saturating_sub(n)..],
            None => window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn bar(symbol: &str, day: u32, close: f64) -> Bar {
        Bar {
            symbol: symbol.into(),
            timestamp: ts(day),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    fn source(days: u32) -> HistoricalBars {
        let bars = (1..=days).map(|d| bar("AAPL", d, 100.0 + d as f64)).collect();
        let mut data = HashMap::new();
        data.insert("AAPL".to_string(), bars);
        HistoricalBars::new(vec!["AAPL".into()], data).unwrap()
    }

    #[test]
    fn nothing_visible_before_first_update() {
        let src = source(3);
        assert!(src.latest_bar("AAPL").is_none());
        assert_eq!(src.current_time(), None);
        assert_eq!(src.start_time(), Some(ts(1)));
    }

    #[test]
    fn opening_time_is_one_interval_before_start() {
        let src = source(3);
        assert_eq!(src.opening_time(), Some(ts(1) - Duration::days(1)));

        let bars = vec![
            bar("AAPL", 1, 100.0),
            Bar {
                timestamp: ts(1) + Duration::hours(1),
                ..bar("AAPL", 1, 101.0)
            },
        ];
        let hourly = HistoricalBars::new(
            vec!["AAPL".into()],
            HashMap::from([("AAPL".to_string(), bars)]),
        )
        .unwrap();
        assert_eq!(hourly.opening_time(), Some(ts(1) - Duration::hours(1)));
    }

    #[test]
    fn each_update_publishes_one_market_event() {
        let mut src = source(3);
        let mut bus = EventBus::new();
        src.update_bars(&mut bus);
        assert_eq!(bus.len(), 1);
        assert_eq!(
            bus.get(),
            Some(Event::Market(MarketEvent { timestamp: ts(1) }))
        );
        assert_eq!(src.latest_bar("AAPL").unwrap().close, 101.0);
    }

    #[test]
    fn exhaustion_clears_flag_without_event() {
        let mut src = source(2);
        let mut bus = EventBus::new();
        src.update_bars(&mut bus);
        src.update_bars(&mut bus);
        assert!(src.continue_backtest());
        src.update_bars(&mut bus);
        assert!(!src.continue_backtest());
        assert_eq!(bus.len(), 2);
    }

    #[test]
    fn never_reads_ahead() {
        let mut src = source(5);
        let mut bus = EventBus::new();
        src.update_bars(&mut bus);
        src.update_bars(&mut bus);
        let all = src.get_bars("AAPL", None, None, None);
        assert_eq!(all.len(), 2);
        assert_eq!(all.last().unwrap().timestamp, ts(2));
    }

    #[test]
    fn get_bars_windows_and_tail() {
        let mut src = source(5);
        let mut bus = EventBus::new();
        for _ in 0..5 {
            src.update_bars(&mut bus);
        }
        let window = src.get_bars("AAPL", None, Some(ts(2)), Some(ts(4)));
        assert_eq!(window.len(), 3);
        let tail = src.get_bars("AAPL", Some(2), Some(ts(2)), Some(ts(4)));
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].timestamp, ts(3));
        assert_eq!(src.get_latest_bars("AAPL", 10).len(), 5);
        assert!(src.get_bars("MSFT", None, None, None).is_empty());
    }

    #[test]
    fn missing_symbol_is_terminal() {
        let err = HistoricalBars::new(vec!["MSFT".into()], HashMap::new()).unwrap_err();
        assert!(matches!(err, SourceError::NoData { .. }));
    }

    #[test]
    fn no_symbols_is_terminal() {
        let err = HistoricalBars::new(vec![], HashMap::new()).unwrap_err();
        assert!(matches!(err, SourceError::NoSymbols));
    }

    #[test]
    fn unsorted_series_is_rejected() {
        let mut data = HashMap::new();
        data.insert(
            "AAPL".to_string(),
            vec![bar("AAPL", 2, 100.0), bar("AAPL", 1, 101.0)],
        );
        let err = HistoricalBars::new(vec!["AAPL".into()], data).unwrap_err();
        assert!(matches!(err, SourceError::Unsorted { .. }));
    }

    #[test]
    fn latest_bar_map_covers_quoted_symbols() {
        let mut data = HashMap::new();
        data.insert("A".to_string(), vec![bar("A", 1, 10.0), bar("A", 2, 11.0)]);
        data.insert("B".to_string(), vec![bar("B", 2, 20.0)]);
        let mut src = HistoricalBars::new(vec!["A".into(), "B".into()], data).unwrap();
        let mut bus = EventBus::new();

        src.update_bars(&mut bus);
        let map = src.latest_bar_map();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("A"));

        src.update_bars(&mut bus);
        assert_eq!(src.latest_bar_map().len(), 2);
    }
}
