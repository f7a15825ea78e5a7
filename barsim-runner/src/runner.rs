//! Backtest runner: wires config, data, strategy, simulation and metrics.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads data per the config, then runs. Used by the CLI.
//! - `run_backtest_from_data()`: takes pre-loaded bars. No I/O.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use barsim_core::engine::{RunCounters, SimulationError};
use barsim_core::{run_simulation, RunResult};

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{load_bars, LoadError, LoadedData};
use crate::export::{save_run, ExportError};
use crate::metrics::PerformanceMetrics;
use crate::strategies::build_strategy;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
    #[error("export error: {0}")]
    Export(#[from] ExportError),
}

/// Everything kept in `params.json` so a saved run can be traced back to its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    pub run_id: RunId,
    pub config: BacktestConfig,
    pub dataset_hash: String,
    pub synthetic: bool,
    pub counters: RunCounters,
}

/// A finished run plus its derived metrics.
#[derive(Debug)]
pub struct BacktestOutcome {
    pub params: RunParams,
    pub result: RunResult,
    pub metrics: PerformanceMetrics,
}

impl BacktestOutcome {
    /// Write the run under `<output_dir>/<name>_<short run id>/`.
    pub fn save(&self, output_dir: &Path) -> Result<PathBuf, RunError> {
        let name = self.params.config.run_dir_name()?;
        Ok(save_run(output_dir, &name, &self.result, &self.params, &self.metrics)?)
    }
}

/// Load bars per the config and run to completion.
pub fn run_single_backtest(config: &BacktestConfig) -> Result<BacktestOutcome, RunError> {
    config.validate()?;
    let loaded = load_bars(config)?;
    run_backtest_from_data(config, loaded)
}

/// Run with pre-loaded bars.
pub fn run_backtest_from_data(
    config: &BacktestConfig,
    loaded: LoadedData,
) -> Result<BacktestOutcome, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    info!(name = %config.name, run_id = %&run_id[..12], "starting run");

    let strategy = build_strategy(&config.strategy);
    let result = run_simulation(&config.simulation, loaded.symbols, loaded.bars, strategy)?;
    let metrics = PerformanceMetrics::from_result(&result);

    info!(
        final_equity = result.final_equity(),
        total_return = metrics.total_return,
        trades = metrics.trade_count,
        "run complete"
    );

    Ok(BacktestOutcome {
        params: RunParams {
            run_id,
            config: config.clone(),
            dataset_hash: loaded.dataset_hash,
            synthetic: loaded.synthetic,
            counters: result.counters,
        },
        result,
        metrics,
    })
}
