//! Simulation driver: the event loop.
//!
//! One step per bar:
//! 1. Ask the source to advance; it enqueues one `Market` event (or halts).
//! 2. Drain the bus to empty, dispatching each event to its owner:
//!    - `Market`: matching pass, then portfolio snapshot, then strategy
//!    - `Signal`: portfolio sizing, possibly enqueueing an `Order`
//!    - `Order`: matching engine registers it, plus a direct same-bar fill
//!      attempt when `immediate_fill` is set
//!    - `CancelOrder`: matching engine drops the order if resting
//!    - `Fill`: portfolio ledger update
//!
//! Everything a market step cascades into is drained before the next bar is
//! requested. A failure while handling one event is logged and counted; the
//! loop carries on with the next event.

use crate::data::{BarSource, HistoricalBars, SourceError};
use crate::domain::{Bar, Fill};
use crate::engine::execution::ExecutionEngine;
use crate::engine::matching::{MatchingEngine, MatchingError};
use crate::engine::state::{ConfigError, RunCounters, RunResult, SimulationConfig, SimulationState};
use crate::events::{Event, EventBus, MarketEvent};
use crate::portfolio::{Portfolio, PortfolioError};
use crate::strategy::{Strategy, StrategyContext};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, error, info};

/// Terminal errors: the run never starts.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("bar source failed to initialise: {0}")]
    Source(#[from] SourceError),

    #[error("bar source has no bars to replay")]
    NoBars,
}

/// Failure while handling one dequeued event.
#[derive(Debug, Error)]
pub enum EventError {
    #[error(transparent)]
    Matching(#[from] MatchingError),

    #[error(transparent)]
    Portfolio(#[from] PortfolioError),
}

/// One simulation run over a bar source and a strategy.
pub struct Backtest<B: BarSource> {
    source: B,
    strategy: Box<dyn Strategy>,
    matching: MatchingEngine,
    portfolio: Portfolio,
    bus: EventBus,
    state: SimulationState,
    current_market: Option<MarketEvent>,
    counters: RunCounters,
}

impl<B: BarSource> Backtest<B> {
    pub fn new(
        config: &SimulationConfig,
        source: B,
        strategy: Box<dyn Strategy>,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        let opening = source.opening_time().ok_or(SimulationError::NoBars)?;

        let execution = ExecutionEngine::new(config.execution, config.commission.build());
        let portfolio = Portfolio::new(
            source.symbols(),
            config.initial_capital,
            config.default_quantity,
            Some(opening),
        );

        Ok(Self {
            source,
            strategy,
            matching: MatchingEngine::new(execution),
            portfolio,
            bus: EventBus::new(),
            state: SimulationState::Running,
            current_market: None,
            counters: RunCounters::default(),
        })
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn matching(&self) -> &MatchingEngine {
        &self.matching
    }

    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    /// Enqueue an event from outside the loop (tests, manual stepping).
    pub fn put(&mut self, event: Event) {
        self.bus.put(event);
    }

    /// Advance one bar and drain everything it cascades into.
    ///
    /// Returns false once the source is exhausted and the bus is empty.
    pub fn step(&mut self) -> bool {
        if self.state == SimulationState::Halted {
            self.drain();
            return false;
        }
        if self.source.continue_backtest() {
            self.source.update_bars(&mut self.bus);
        }
        if !self.source.continue_backtest() {
            self.state = SimulationState::Halted;
            info!(bars = self.counters.bars, "bar source exhausted, halting");
        }
        self.drain();
        self.state == SimulationState::Running
    }

    /// Run to completion.
    pub fn run(mut self) -> RunResult {
        info!(
            strategy = self.strategy.name(),
            symbols = self.source.symbols().len(),
            capital = self.portfolio.initial_capital(),
            "simulation started"
        );
        while self.step() {}

        info!(
            bars = self.counters.bars,
            fills = self.counters.fills,
            trades = self.portfolio.closed_trades().len(),
            event_errors = self.counters.event_errors,
            "simulation finished"
        );
        RunResult {
            resting_orders: self.matching.into_book().into_orders(),
            portfolio: self.portfolio,
            counters: self.counters,
            state: self.state,
        }
    }

    /// Process queued events without advancing the source.
    pub fn drain(&mut self) {
        while let Some(event) = self.bus.get() {
            let kind = event.kind();
            if let Err(e) = self.dispatch(event) {
                self.counters.event_errors += 1;
                error!(event = %kind, error = %e, "event handling failed");
            }
        }
    }

    fn dispatch(&mut self, event: Event) -> Result<(), EventError> {
        match event {
            Event::Market(market) => {
                self.on_market(market);
                Ok(())
            }
            Event::Signal(signal) => {
                self.counters.signals += 1;
                let bars = self.source.latest_bar_map();
                if let Some(request) = self.portfolio.on_signal(&signal, &bars)? {
                    self.bus.put(Event::Order(request));
                }
                Ok(())
            }
            Event::Order(request) => {
                let id = match self.matching.submit(&request) {
                    Ok(id) => id,
                    Err(e) => {
                        self.counters.rejected_orders += 1;
                        return Err(e.into());
                    }
                };
                self.counters.orders += 1;
                if request.immediate_fill {
                    // Direct call against the current bar; the fill is queued
                    // ahead of anything the next step produces.
                    let bars = self.source.latest_bar_map();
                    if let Some(fill) = self.matching.fill_immediate(id, &bars)? {
                        self.bus.put(Event::Fill(fill));
                    }
                }
                Ok(())
            }
            Event::CancelOrder { order_id } => {
                if self.matching.cancel(order_id) {
                    self.counters.cancels += 1;
                }
                Ok(())
            }
            Event::Fill(fill) => {
                self.on_fill(&fill);
                Ok(())
            }
        }
    }

    fn on_market(&mut self, market: MarketEvent) {
        self.counters.bars += 1;
        self.current_market = Some(market);
        debug!(timestamp = %market.timestamp, "market step");

        let bars = self.source.latest_bar_map();
        self.matching.on_market(&bars, &mut self.bus);
        self.portfolio.on_market(market.timestamp, &bars);

        let ctx = StrategyContext {
            bars: &self.source,
            portfolio: &self.portfolio,
            orders: self.matching.book(),
        };
        self.strategy.calculate_signals(&market, &ctx, &mut self.bus);
    }

    fn on_fill(&mut self, fill: &Fill) {
        self.counters.fills += 1;
        self.portfolio.on_fill(fill);
    }

    /// Timestamp of the market event currently being processed.
    pub fn current_time(&self) -> Option<NaiveDateTime> {
        self.current_market.map(|m| m.timestamp)
    }
}

/// Build a historical source from in-memory bars and run to completion.
pub fn run_simulation(
    config: &SimulationConfig,
    symbols: Vec<String>,
    data: HashMap<String, Vec<Bar>>,
    strategy: Box<dyn Strategy>,
) -> Result<RunResult, SimulationError> {
    let source = HistoricalBars::new(symbols, data)?;
    Ok(Backtest::new(config, source, strategy)?.run())
}
