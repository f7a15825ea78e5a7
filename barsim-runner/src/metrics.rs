//! Performance metrics: pure functions that compute run statistics.
//!
//! Every metric is a pure function: equity values and/or closed trades in,
//! scalar out. Ratios are fractions (0.12 is 12%), annualized at 252 bars
//! per year with a zero risk-free rate.

use barsim_core::domain::{ClosedTrade, EquityPoint, PositionSnapshot};
use barsim_core::RunResult;
use serde::{Deserialize, Serialize};

const BARS_PER_YEAR: f64 = 252.0;

/// Aggregate performance metrics for a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub cagr: f64,
    pub annualized_volatility: f64,
    pub sharpe: f64,
    pub sortino: f64,
    /// Negative fraction, e.g. -0.15 for a 15% drawdown.
    pub max_drawdown: f64,
    /// Calendar days from the peak to the deepest trough.
    pub max_drawdown_duration_days: i64,
    pub calmar: f64,
    pub trade_count: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_trade_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    /// `|avg_win / avg_loss|`, capped at 100.0 when there are no losses.
    pub avg_win_loss_ratio: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub avg_duration_days: f64,
    pub avg_win_duration_days: f64,
    pub avg_loss_duration_days: f64,
    /// Calendar days with a non-zero position, summed over symbols.
    pub market_exposure_days: i64,
    pub total_commission: f64,
}

impl PerformanceMetrics {
    pub fn from_result(result: &RunResult) -> Self {
        Self::compute(&result.equity_curve(), result.closed_trades(), result.position_history())
    }

    /// Compute all metrics from an equity curve, the closed-trade log and
    /// the position history.
    pub fn compute(
        curve: &[EquityPoint],
        trades: &[ClosedTrade],
        positions: &[PositionSnapshot],
    ) -> Self {
        let avg_win = mean_f64(&pnls(trades, |p| p > 0.0));
        let avg_loss = mean_f64(&pnls(trades, |p| p < 0.0));
        let equity: Vec<f64> = curve.iter().map(|p| p.equity).collect();
        // The first row is the all-cash opening, so periods = rows - 1.
        let bars = equity.len().saturating_sub(1);
        Self {
            total_return: total_return(&equity),
            cagr: cagr(&equity, bars),
            annualized_volatility: annualized_volatility(&equity),
            sharpe: sharpe_ratio(&equity),
            sortino: sortino_ratio(&equity),
            max_drawdown: max_drawdown(&equity),
            max_drawdown_duration_days: max_drawdown_duration_days(curve),
            calmar: calmar_ratio(&equity, bars),
            trade_count: trades.len(),
            winning_trades: trades.iter().filter(|t| t.pnl > 0.0).count(),
            losing_trades: trades.iter().filter(|t| t.pnl < 0.0).count(),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            avg_trade_pnl: mean_f64(&trades.iter().map(|t| t.pnl).collect::<Vec<_>>()),
            avg_win,
            avg_loss,
            avg_win_loss_ratio: win_loss_ratio(avg_win, avg_loss),
            max_consecutive_wins: max_consecutive(trades, true),
            max_consecutive_losses: max_consecutive(trades, false),
            avg_duration_days: avg_duration_days(trades),
            avg_win_duration_days: avg_duration_days_where(trades, |p| p > 0.0),
            avg_loss_duration_days: avg_duration_days_where(trades, |p| p < 0.0),
            market_exposure_days: market_exposure_days(positions),
            total_commission: trades.iter().map(|t| t.commission).sum(),
        }
    }
}

// ── Equity metrics ───────────────────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity: &[f64]) -> f64 {
    let (Some(&initial), Some(&last)) = (equity.first(), equity.last()) else {
        return 0.0;
    };
    if equity.len() < 2 || initial <= 0.0 {
        return 0.0;
    }
    (last - initial) / initial
}

/// Compound annual growth rate over `bars` return periods.
pub fn cagr(equity: &[f64], bars: usize) -> f64 {
    let (Some(&initial), Some(&last)) = (equity.first(), equity.last()) else {
        return 0.0;
    };
    if bars == 0 || initial <= 0.0 || last <= 0.0 {
        return 0.0;
    }
    let years = bars as f64 / BARS_PER_YEAR;
    (last / initial).powf(1.0 / years) - 1.0
}

/// Sample standard deviation of bar returns, annualized.
pub fn annualized_volatility(equity: &[f64]) -> f64 {
    let returns = bar_returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    std_dev(&returns) * BARS_PER_YEAR.sqrt()
}

/// Annualized Sharpe ratio from bar returns.
///
/// Returns 0.0 if variance is zero or there are fewer than 2 returns.
pub fn sharpe_ratio(equity: &[f64]) -> f64 {
    let returns = bar_returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / std * BARS_PER_YEAR.sqrt()
}

/// Annualized Sortino ratio (downside deviation only).
pub fn sortino_ratio(equity: &[f64]) -> f64 {
    let returns = bar_returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    let downside_sq: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / downside_std * BARS_PER_YEAR.sqrt()
}

/// Maximum drawdown as a negative fraction.
///
/// Returns 0.0 if equity never falls below a prior peak.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    drawdown_trough(equity).map_or(0.0, |(_, _, dd)| dd)
}

/// Days between the peak and the trough of the deepest drawdown.
pub fn max_drawdown_duration_days(curve: &[EquityPoint]) -> i64 {
    let equity: Vec<f64> = curve.iter().map(|p| p.equity).collect();
    drawdown_trough(&equity).map_or(0, |(peak, trough, _)| {
        (curve[trough].timestamp - curve[peak].timestamp).num_days()
    })
}

/// Calmar ratio: CAGR / |max drawdown|.
pub fn calmar_ratio(equity: &[f64], bars: usize) -> f64 {
    let c = cagr(equity, bars);
    let dd = max_drawdown(equity);
    if dd >= 0.0 || c <= 0.0 {
        return 0.0;
    }
    c / dd.abs()
}

/// (peak index, trough index, drawdown) of the deepest drawdown.
fn drawdown_trough(equity: &[f64]) -> Option<(usize, usize, f64)> {
    let mut peak_idx = 0;
    let mut worst: Option<(usize, usize, f64)> = None;
    for (i, &eq) in equity.iter().enumerate() {
        if eq > equity[peak_idx] {
            peak_idx = i;
        }
        let peak = equity[peak_idx];
        if peak > 0.0 {
            let dd = (eq - peak) / peak;
            if dd < worst.map_or(0.0, |w| w.2) {
                worst = Some((peak_idx, i, dd));
            }
        }
    }
    worst
}

// ── Trade metrics ────────────────────────────────────────────────────

/// Fraction of trades with positive net pnl.
pub fn win_rate(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Gross profits / gross losses, capped at 100.0 when there are no losses.
pub fn profit_factor(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = pnls(trades, |p| p > 0.0).iter().sum();
    let gross_loss: f64 = pnls(trades, |p| p < 0.0).iter().map(|p| p.abs()).sum();
    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

pub fn avg_duration_days(trades: &[ClosedTrade]) -> f64 {
    avg_duration_days_where(trades, |_| true)
}

/// Mean holding period of the trades whose pnl passes `keep`.
pub fn avg_duration_days_where(trades: &[ClosedTrade], keep: impl Fn(f64) -> bool) -> f64 {
    let durations: Vec<f64> = trades
        .iter()
        .filter(|t| keep(t.pnl))
        .map(|t| t.duration_days as f64)
        .collect();
    mean_f64(&durations)
}

pub fn win_loss_ratio(avg_win: f64, avg_loss: f64) -> f64 {
    if avg_loss.abs() < 1e-10 {
        return if avg_win > 0.0 { 100.0 } else { 0.0 };
    }
    (avg_win / avg_loss).abs().min(100.0)
}

/// Days spent holding a position, summed over symbols.
///
/// A row with a non-zero position counts the calendar days until the next row.
pub fn market_exposure_days(positions: &[PositionSnapshot]) -> i64 {
    positions
        .windows(2)
        .map(|w| {
            let held = w[0].positions.values().filter(|&&q| q != 0).count() as i64;
            held * (w[1].timestamp - w[0].timestamp).num_days()
        })
        .sum()
}

/// Longest run of winners (`winners = true`) or non-winners.
pub fn max_consecutive(trades: &[ClosedTrade], winners: bool) -> usize {
    let mut max = 0;
    let mut current = 0;
    for t in trades {
        if t.is_winner() == winners {
            current += 1;
            max = max.max(current);
        } else {
            current = 0;
        }
    }
    max
}

fn pnls(trades: &[ClosedTrade], keep: impl Fn(f64) -> bool) -> Vec<f64> {
    trades.iter().map(|t| t.pnl).filter(|&p| keep(p)).collect()
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Simple returns between consecutive equity values.
pub fn bar_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use barsim_core::domain::TradeDirection;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn ts(day: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::days(day)
    }

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| EquityPoint {
                timestamp: ts(i as i64),
                total: v,
                returns: None,
                equity: v,
            })
            .collect()
    }

    fn trade(pnl: f64, duration_days: i64) -> ClosedTrade {
        ClosedTrade {
            symbol: "SPY".into(),
            entry_time: ts(0),
            exit_time: ts(duration_days),
            entry_price: 100.0,
            exit_price: 100.0 + pnl / 10.0,
            quantity: 10,
            direction: TradeDirection::Long,
            pnl,
            commission: 1.0,
            duration_days,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // ── Returns ──

    #[test]
    fn total_return_basic() {
        assert!(approx(total_return(&[100.0, 110.0, 121.0]), 0.21));
        assert_eq!(total_return(&[100.0]), 0.0);
        assert_eq!(total_return(&[]), 0.0);
    }

    #[test]
    fn cagr_one_year_of_bars() {
        let mut eq = vec![100.0; 252];
        eq[251] = 110.0;
        assert!(approx(cagr(&eq, 252), 0.10));
    }

    #[test]
    fn flat_equity_has_no_risk() {
        let eq = [100.0; 20];
        assert_eq!(annualized_volatility(&eq), 0.0);
        assert_eq!(sharpe_ratio(&eq), 0.0);
        assert_eq!(sortino_ratio(&eq), 0.0);
    }

    #[test]
    fn volatility_uses_sample_std() {
        // Returns +10%, -10%: mean 0, sample std = sqrt(0.02)
        let eq = [100.0, 110.0, 99.0];
        let expected = 0.02_f64.sqrt() * 252.0_f64.sqrt();
        assert!(approx(annualized_volatility(&eq), expected));
        assert!(approx(sharpe_ratio(&eq), 0.0));
    }

    // ── Drawdown ──

    #[test]
    fn max_drawdown_finds_deepest_trough() {
        let eq = [100.0, 120.0, 90.0, 130.0, 117.0];
        assert!(approx(max_drawdown(&eq), -0.25));
        assert_eq!(max_drawdown(&[100.0, 101.0, 102.0]), 0.0);
    }

    #[test]
    fn drawdown_duration_measures_peak_to_trough() {
        let c = curve(&[100.0, 120.0, 110.0, 90.0, 130.0]);
        assert_eq!(max_drawdown_duration_days(&c), 2);
        assert_eq!(max_drawdown_duration_days(&curve(&[1.0, 2.0])), 0);
    }

    #[test]
    fn calmar_requires_drawdown_and_growth() {
        assert_eq!(calmar_ratio(&[100.0, 101.0, 102.0], 3), 0.0);
        let eq = [100.0, 120.0, 90.0, 130.0];
        assert!(calmar_ratio(&eq, 4) > 0.0);
    }

    // ── Trades ──

    #[test]
    fn trade_statistics() {
        let trades = vec![trade(100.0, 2), trade(-50.0, 4), trade(30.0, 6), trade(-10.0, 8)];
        assert!(approx(win_rate(&trades), 0.5));
        assert!(approx(profit_factor(&trades), 130.0 / 60.0));
        assert!(approx(avg_duration_days(&trades), 5.0));

        let m = PerformanceMetrics::compute(&curve(&[100.0, 101.0]), &trades, &[]);
        assert_eq!(m.trade_count, 4);
        assert_eq!(m.winning_trades, 2);
        assert_eq!(m.losing_trades, 2);
        assert!(approx(m.avg_trade_pnl, 17.5));
        assert!(approx(m.avg_win, 65.0));
        assert!(approx(m.avg_loss, -30.0));
        assert!(approx(m.total_commission, 4.0));
        assert!(approx(m.avg_win_loss_ratio, 65.0 / 30.0));
        assert!(approx(m.avg_win_duration_days, 4.0));
        assert!(approx(m.avg_loss_duration_days, 6.0));
    }

    #[test]
    fn win_loss_ratio_caps_without_losses() {
        assert_eq!(win_loss_ratio(50.0, 0.0), 100.0);
        assert_eq!(win_loss_ratio(0.0, 0.0), 0.0);
        assert!(approx(win_loss_ratio(20.0, -40.0), 0.5));
    }

    #[test]
    fn exposure_counts_days_held_per_symbol() {
        let row = |day: i64, spy: i64, qqq: i64| PositionSnapshot {
            timestamp: ts(day),
            positions: [("SPY".to_string(), spy), ("QQQ".to_string(), qqq)].into(),
        };
        // SPY held day 1 -> 5 (4 days), QQQ short day 3 -> 5 (2 days).
        let rows = [row(0, 0, 0), row(1, 10, 0), row(3, 10, -5), row(5, 0, 0), row(6, 0, 0)];
        assert_eq!(market_exposure_days(&rows), 6);
        assert_eq!(market_exposure_days(&rows[..1]), 0);

        let m = PerformanceMetrics::compute(&curve(&[100.0, 101.0]), &[], &rows);
        assert_eq!(m.market_exposure_days, 6);
    }

    #[test]
    fn profit_factor_caps_without_losses() {
        assert_eq!(profit_factor(&[trade(10.0, 1)]), 100.0);
        assert_eq!(profit_factor(&[]), 0.0);
    }

    #[test]
    fn consecutive_streaks() {
        let trades: Vec<_> = [1.0, 1.0, -1.0, 0.0, -1.0, 1.0]
            .iter()
            .map(|&p| trade(p, 1))
            .collect();
        assert_eq!(max_consecutive(&trades, true), 2);
        // Break-even counts as a non-winner.
        assert_eq!(max_consecutive(&trades, false), 3);
    }

    #[test]
    fn empty_inputs_are_zero() {
        let m = PerformanceMetrics::compute(&[], &[], &[]);
        assert_eq!(m.total_return, 0.0);
        assert_eq!(m.trade_count, 0);
        assert_eq!(m.max_drawdown_duration_days, 0);
        assert_eq!(m.avg_duration_days, 0.0);
        assert_eq!(m.avg_win_loss_ratio, 0.0);
        assert_eq!(m.market_exposure_days, 0);
    }
}
