//! barsim core: event-driven bar-by-bar backtest kernel.
//!
//! This crate contains the heart of the simulator:
//! - Domain types (bars, orders, fills, lots, closed trades, snapshots)
//! - The closed event model and the per-run FIFO bus
//! - The bar-source trait and an in-memory historical source
//! - The order-matching engine (MKT, LMT, STP, STP_LMT, TRAIL) with
//!   liquidity-capped partial fills, slippage, and same-bar fills
//! - The portfolio ledger with lot reconciliation and the equity curve
//! - The strategy trait and the simulation driver

pub mod data;
pub mod domain;
pub mod engine;
pub mod events;
pub mod portfolio;
pub mod strategy;

pub use data::{BarSource, HistoricalBars};
pub use engine::{run_simulation, Backtest, RunResult, SimulationConfig};
pub use events::{Event, EventBus};
pub use portfolio::Portfolio;
pub use strategy::{Strategy, StrategyContext};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: run inputs and outputs can cross threads, so a
    /// caller can fan independent runs out to workers.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Order>();
        require_sync::<domain::Order>();
        require_send::<domain::Fill>();
        require_sync::<domain::Fill>();
        require_send::<domain::ClosedTrade>();
        require_sync::<domain::ClosedTrade>();
        require_send::<events::Event>();
        require_sync::<events::Event>();

        require_send::<SimulationConfig>();
        require_sync::<SimulationConfig>();
        require_send::<Portfolio>();
        require_sync::<Portfolio>();
        require_send::<RunResult>();
        require_sync::<RunResult>();
        require_send::<HistoricalBars>();
        require_sync::<HistoricalBars>();
        require_send::<engine::MatchingEngine>();
        require_sync::<engine::MatchingEngine>();
    }
}
