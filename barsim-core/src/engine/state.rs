//! Simulation configuration, driver state, and run result types.

use crate::domain::{ClosedTrade, EquityPoint, HoldingsSnapshot, Order, PositionSnapshot};
use crate::engine::execution::{CommissionConfig, ExecutionConfig};
use crate::portfolio::Portfolio;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("initial capital must be positive, got {0}")]
    InvalidCapital(f64),

    #[error("participation_pct must be in (0, 1], got {0}")]
    InvalidParticipation(f64),

    #[error("slippage_bps must be finite and non-negative, got {0}")]
    InvalidSlippage(f64),

    #[error("commission parameters must be finite and non-negative")]
    InvalidCommission,
}

/// Configuration for a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub initial_capital: f64,
    /// Shares ordered when a signal carries no sizing.
    pub default_quantity: u64,
    pub execution: ExecutionConfig,
    pub commission: CommissionConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            default_quantity: 100,
            execution: ExecutionConfig::default(),
            commission: CommissionConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(ConfigError::InvalidCapital(self.initial_capital));
        }
        let pct = self.execution.participation_pct;
        if !(pct > 0.0 && pct <= 1.0) {
            return Err(ConfigError::InvalidParticipation(pct));
        }
        let slip = self.execution.slippage_bps;
        if !slip.is_finite() || slip < 0.0 {
            return Err(ConfigError::InvalidSlippage(slip));
        }
        if !self.commission.is_valid() {
            return Err(ConfigError::InvalidCommission);
        }
        Ok(())
    }
}

/// Driver state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimulationState {
    Running,
    Halted,
}

/// Event counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    /// Market events processed.
    pub bars: usize,
    pub signals: usize,
    /// Orders accepted into the resting set.
    pub orders: usize,
    pub rejected_orders: usize,
    pub fills: usize,
    /// Cancel requests that removed a resting order.
    pub cancels: usize,
    /// Events whose handling failed and was logged.
    pub event_errors: usize,
}

/// Result of a complete simulation run.
#[derive(Debug)]
pub struct RunResult {
    pub portfolio: Portfolio,
    /// Orders still resting when the source ran out.
    pub resting_orders: Vec<Order>,
    pub counters: RunCounters,
    pub state: SimulationState,
}

impl RunResult {
    pub fn position_history(&self) -> &[PositionSnapshot] {
        self.portfolio.position_history()
    }

    pub fn holdings_history(&self) -> &[HoldingsSnapshot] {
        self.portfolio.holdings_history()
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        self.portfolio.closed_trades()
    }

    pub fn equity_curve(&self) -> Vec<EquityPoint> {
        self.portfolio.equity_curve()
    }

    /// Total of the last holdings row, or initial capital if none.
    pub fn final_equity(&self) -> f64 {
        self.holdings_history()
            .last()
            .map_or(self.portfolio.initial_capital(), |h| h.total)
    }
}
