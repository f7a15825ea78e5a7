//! barsim runner: orchestration around the simulation kernel.
//!
//! This crate builds on `barsim-core` to provide:
//! - TOML run configuration with a content-addressed run id
//! - CSV bar loading with a seeded synthetic fallback
//! - Reference strategies (buy-and-hold, moving-average crossover)
//! - Performance metrics over the equity curve and trade log
//! - Run directory export and import

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod strategies;

pub use config::{BacktestConfig, ConfigError, RunId, StrategyConfig, SyntheticConfig};
pub use data_loader::{generate_synthetic_bars, load_bars, read_csv, write_csv, LoadError, LoadedData};
pub use export::{load_run, save_run, ExportError, SavedRun};
pub use metrics::PerformanceMetrics;
pub use runner::{
    run_backtest_from_data, run_single_backtest, BacktestOutcome, RunError, RunParams,
};
pub use strategies::{build_strategy, BuyAndHold, MaCrossover};
