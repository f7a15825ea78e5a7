//! Serializable backtest configuration, loaded from TOML.
//!
//! ```toml
//! name = "aapl_ma"
//! data_dir = "data"
//! symbols = ["AAPL"]
//! start = "2023-01-01"
//!
//! [simulation]
//! initial_capital = 100000.0
//!
//! [simulation.execution]
//! slippage_bps = 5.0
//! participation_pct = 0.1
//!
//! [simulation.commission]
//! type = "PER_SHARE"
//! rate = 0.0035
//! minimum = 0.35
//!
//! [strategy]
//! type = "MA_CROSSOVER"
//! short_period = 10
//! long_period = 30
//! ```

use barsim_core::SimulationConfig;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid simulation settings: {0}")]
    Simulation(#[from] barsim_core::engine::ConfigError),

    #[error("config lists no symbols")]
    NoSymbols,

    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid strategy parameters: {0}")]
    Strategy(String),

    #[error("synthetic data needs at least one bar")]
    EmptySynthetic,

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Everything needed to reproduce one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Human-readable run name; prefixes the output directory.
    pub name: String,

    /// Directory holding one `<SYMBOL>.csv` per symbol.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    pub symbols: Vec<String>,

    /// Inclusive date window applied to loaded bars.
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,

    #[serde(default)]
    pub simulation: SimulationConfig,

    pub strategy: StrategyConfig,

    /// Generate bars instead of reading `data_dir`.
    #[serde(default)]
    pub synthetic: Option<SyntheticConfig>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Reference strategy selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyConfig {
    /// Long on the first bar, exit after `hold_bars` bars.
    BuyAndHold {
        #[serde(default = "default_hold_bars")]
        hold_bars: usize,
    },

    /// Simple moving average crossover.
    MaCrossover {
        short_period: usize,
        long_period: usize,
        /// Go short on a death cross instead of only exiting.
        #[serde(default)]
        allow_short: bool,
    },
}

fn default_hold_bars() -> usize {
    5
}

/// Seeded random-walk bars, one series per symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub bars: usize,
    #[serde(default)]
    pub seed: u64,
}

impl BacktestConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::NoSymbols);
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(ConfigError::InvalidRange { start, end });
            }
        }
        self.simulation.validate()?;
        match self.strategy {
            StrategyConfig::BuyAndHold { hold_bars } if hold_bars == 0 => {
                return Err(ConfigError::Strategy("hold_bars must be positive".into()));
            }
            StrategyConfig::MaCrossover {
                short_period,
                long_period,
                ..
            } if short_period == 0 || short_period >= long_period => {
                return Err(ConfigError::Strategy(format!(
                    "need 0 < short_period < long_period, got {short_period} / {long_period}"
                )));
            }
            _ => {}
        }
        if matches!(self.synthetic, Some(SyntheticConfig { bars: 0, .. })) {
            return Err(ConfigError::EmptySynthetic);
        }
        Ok(())
    }

    /// Deterministic hash of this configuration.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    /// `<name>_<first 12 hex chars of run_id>`.
    pub fn run_dir_name(&self) -> Result<String, ConfigError> {
        let id = self.run_id()?;
        Ok(format!("{}_{}", self.name, &id[..12]))
    }
}
