//! Simulation engine: execution rules, the resting-order book, the matching
//! engine, and the event-loop driver.

pub mod execution;
pub mod loop_runner;
pub mod matching;
pub mod order_book;
pub mod state;

pub use execution::{
    CommissionConfig, CommissionModel, CostModel, ExecutionConfig, ExecutionEngine,
    LiquidityPolicy, StopFillPolicy,
};
pub use loop_runner::{run_simulation, Backtest, EventError, SimulationError};
pub use matching::{MatchingEngine, MatchingError};
pub use order_book::{OrderBook, OrderBookError};
pub use state::{ConfigError, RunCounters, RunResult, SimulationConfig, SimulationState};
