//! Reference strategies selectable from a run configuration.

use crate::config::StrategyConfig;
use barsim_core::events::{Event, EventBus, MarketEvent, SignalEvent, SignalKind};
use barsim_core::{Strategy, StrategyContext};
use tracing::debug;

/// Instantiate the strategy a config names.
pub fn build_strategy(config: &StrategyConfig) -> Box<dyn Strategy> {
    match *config {
        StrategyConfig::BuyAndHold { hold_bars } => Box::new(BuyAndHold::new(hold_bars)),
        StrategyConfig::MaCrossover {
            short_period,
            long_period,
            allow_short,
        } => Box::new(MaCrossover::new(short_period, long_period, allow_short)),
    }
}

fn emit(bus: &mut EventBus, symbol: &str, market: &MarketEvent, kind: SignalKind) {
    debug!(symbol, ?kind, timestamp = %market.timestamp, "signal");
    bus.put(Event::Signal(SignalEvent::new(symbol, market.timestamp, kind)));
}

// ── Buy and hold ─────────────────────────────────────────────────────

/// Goes long on each symbol's first bar and exits `hold_bars` bars later.
#[derive(Debug, Clone)]
pub struct BuyAndHold {
    hold_bars: usize,
}

impl BuyAndHold {
    /// A zero holding period is raised to one bar.
    pub fn new(hold_bars: usize) -> Self {
        Self {
            hold_bars: hold_bars.max(1),
        }
    }
}

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn calculate_signals(&mut self, market: &MarketEvent, ctx: &StrategyContext<'_>, bus: &mut EventBus) {
        for symbol in ctx.bars.symbols() {
            // Bars this symbol has published, including the current one.
            let seen = ctx.bars.get_latest_bars(symbol, usize::MAX).len();
            if seen == 1 {
                emit(bus, symbol, market, SignalKind::Long);
            } else if seen == self.hold_bars + 1 {
                emit(bus, symbol, market, SignalKind::Exit);
            }
        }
    }
}

// ── Moving-average crossover ─────────────────────────────────────────

/// Trend follower on two simple moving averages of the close.
///
/// Flat: long when the short average is above the long one, short when it
/// is below and shorting is allowed. Holding: exit when the averages cross
/// against the position. Symbols with a resting order are left alone until
/// it resolves.
#[derive(Debug, Clone)]
pub struct MaCrossover {
    short_period: usize,
    long_period: usize,
    allow_short: bool,
}

impl MaCrossover {
    pub fn new(short_period: usize, long_period: usize, allow_short: bool) -> Self {
        Self {
            short_period,
            long_period,
            allow_short,
        }
    }
}

impl Strategy for MaCrossover {
    fn name(&self) -> &str {
        "ma_crossover"
    }

    fn calculate_signals(&mut self, market: &MarketEvent, ctx: &StrategyContext<'_>, bus: &mut EventBus) {
        for symbol in ctx.bars.symbols() {
            let bars = ctx.bars.get_latest_bars(symbol, self.long_period);
            // Degenerate periods (zero, or short longer than long) never signal.
            if bars.len() < self.long_period
                || self.short_period == 0
                || self.short_period > bars.len()
            {
                continue;
            }
            if ctx.orders.orders_for_symbol(symbol).next().is_some() {
                continue;
            }

            let long_sma = bars.iter().map(|b| b.close).sum::<f64>() / bars.len() as f64;
            let short_sma = bars[bars.len() - self.short_period..]
                .iter()
                .map(|b| b.close)
                .sum::<f64>()
                / self.short_period as f64;
            let spread = short_sma - long_sma;

            let position = ctx.portfolio.position(symbol);
            let kind = match position.signum() {
                0 if spread > 0.0 => SignalKind::Long,
                0 if spread < 0.0 && self.allow_short => SignalKind::Short,
                1 if spread < 0.0 => SignalKind::Exit,
                -1 if spread > 0.0 => SignalKind::Exit,
                _ => continue,
            };
            emit(bus, symbol, market, kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barsim_core::domain::{Bar, TradeDirection};
    use barsim_core::engine::CommissionConfig;
    use barsim_core::{run_simulation, RunResult, SimulationConfig};
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use std::collections::HashMap;

    fn ts(i: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::days(i as i64)
    }

    fn bars_from(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                symbol: "SPY".into(),
                timestamp: ts(i),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000_000.0,
            })
            .collect()
    }

    fn run(strategy: Box<dyn Strategy>, closes: &[f64]) -> RunResult {
        let config = SimulationConfig {
            commission: CommissionConfig::Zero,
            ..SimulationConfig::default()
        };
        run_simulation(
            &config,
            vec!["SPY".into()],
            HashMap::from([("SPY".to_string(), bars_from(closes))]),
            strategy,
        )
        .unwrap()
    }

    /// 100..=129 then back down to 100.
    fn peak_and_fall() -> Vec<f64> {
        let up = (0..30).map(|i| 100.0 + i as f64);
        let down = (1..30).map(|i| 129.0 - i as f64);
        up.chain(down).collect()
    }

    // ── BuyAndHold ──

    #[test]
    fn buy_and_hold_round_trip() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let result = run(build_strategy(&StrategyConfig::BuyAndHold { hold_bars: 3 }), &closes);
        let trades = result.closed_trades();
        assert_eq!(trades.len(), 1);
        // LONG on bar 0 fills at bar 1's open; EXIT on bar 3 fills at bar 4's open.
        assert_eq!(trades[0].entry_time, ts(1));
        assert_eq!(trades[0].exit_time, ts(4));
        assert_eq!(trades[0].pnl, 300.0);
        assert_eq!(result.counters.signals, 2);
    }

    // ── MaCrossover ──

    #[test]
    fn crossover_rides_the_trend_then_exits() {
        let result = run(Box::new(MaCrossover::new(3, 5, false)), &peak_and_fall());
        let trades = result.closed_trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].direction, TradeDirection::Long);
        assert!(trades[0].is_winner());
        assert_eq!(result.portfolio.position("SPY"), 0);
    }

    #[test]
    fn crossover_reverses_into_short_when_allowed() {
        let result = run(Box::new(MaCrossover::new(3, 5, true)), &peak_and_fall());
        assert_eq!(result.closed_trades().len(), 1);
        let lot = result.portfolio.open_lot("SPY").unwrap();
        assert_eq!(lot.direction, TradeDirection::Short);
        assert_eq!(result.portfolio.position("SPY"), -100);
    }

    #[test]
    fn crossover_waits_for_long_window() {
        let result = run(Box::new(MaCrossover::new(3, 50, false)), &peak_and_fall()[..40]);
        assert_eq!(result.counters.signals, 0);
    }

    #[test]
    fn zero_hold_bars_still_exits() {
        let closes: Vec<f64> = (0..6).map(|i| 100.0 + i as f64).collect();
        let result = run(Box::new(BuyAndHold::new(0)), &closes);
        let trades = result.closed_trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].entry_time, ts(1));
        assert_eq!(trades[0].exit_time, ts(2));
        assert_eq!(result.portfolio.position("SPY"), 0);
    }

    #[test]
    fn inverted_periods_do_not_panic() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let result = run(Box::new(MaCrossover::new(10, 5, false)), &closes);
        assert_eq!(result.counters.signals, 0);
        assert_eq!(result.counters.bars, 20);

        let result = run(Box::new(MaCrossover::new(0, 5, true)), &closes);
        assert_eq!(result.counters.signals, 0);
    }

    #[test]
    fn names() {
        assert_eq!(BuyAndHold::new(1).name(), "buy_and_hold");
        assert_eq!(MaCrossover::new(1, 2, false).name(), "ma_crossover");
    }
}
