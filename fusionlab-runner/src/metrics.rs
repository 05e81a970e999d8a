//! Performance metrics: running equity tracking plus pure statistics.
//!
//! [`MetricsCalculator`] accumulates one [`EquityPoint`] per bar. The summary
//! and detailed statistics are pure functions of the equity values and the
//! trade list. Degenerate inputs (no trades, flat equity, a single bar) give
//! 0 rather than NaN or infinity; every value is finite.

use fusionlab_core::domain::{EquityPoint, PositionState, Trade};
use serde::{Deserialize, Serialize};

/// Headline statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub final_value: f64,
    pub total_return: f64,
    pub annual_return: f64,
    /// Per-period Sharpe: `(mean(r) - rf / periods) / stdev(r)`.
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough decline as a positive fraction.
    pub max_drawdown: f64,
    /// Completed round trips.
    pub total_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedMetrics {
    pub sharpe_annualized: f64,
    pub sortino: f64,
    pub calmar: f64,
    pub volatility_annualized: f64,
    pub avg_win: f64,
    /// Mean PnL of losing trades (negative or 0).
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub avg_hold_bars: f64,
    /// Fraction of bars spent in a position.
    pub exposure: f64,
    pub total_fees: f64,
    pub total_slippage: f64,
    pub realized_pnl: f64,
    pub best_period_return: f64,
    pub worst_period_return: f64,
}

/// Inputs that are not derivable from the curve or the trades.
#[derive(Debug, Clone, Copy)]
pub struct MetricsParams {
    pub initial_capital: f64,
    pub risk_free_rate: f64,
    pub annualization_periods: f64,
}

/// Running equity curve with peak and drawdown tracking.
#[derive(Debug, Clone)]
pub struct MetricsCalculator {
    initial_capital: f64,
    peak: f64,
    points: Vec<EquityPoint>,
}

impl MetricsCalculator {
    pub fn new(initial_capital: f64) -> Self {
        Self::with_capacity(initial_capital, 0)
    }

    pub fn with_capacity(initial_capital: f64, bars: usize) -> Self {
        Self {
            initial_capital,
            peak: initial_capital,
            points: Vec::with_capacity(bars),
        }
    }

    /// Append the point for one bar. The peak starts at the initial capital
    /// and never decreases.
    pub fn record(&mut self, timestamp: i64, total_value: f64, position_state: PositionState) {
        self.peak = self.peak.max(total_value);
        let drawdown = if self.peak > 0.0 {
            ((self.peak - total_value) / self.peak).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let cumulative_return = if self.initial_capital > 0.0 {
            total_value / self.initial_capital - 1.0
        } else {
            0.0
        };
        self.points.push(EquityPoint {
            timestamp,
            total_value,
            cumulative_return,
            peak_equity: self.peak,
            drawdown,
            position_state,
        });
    }

    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<EquityPoint> {
        self.points
    }
}

impl SummaryMetrics {
    pub fn compute(curve: &[EquityPoint], trades: &[Trade], params: &MetricsParams) -> Self {
        let values = equity_values(curve);
        let final_value = values.last().copied().unwrap_or(params.initial_capital);
        let tr = total_return(params.initial_capital, final_value);
        Self {
            final_value: finite_or_zero(final_value),
            total_return: tr,
            annual_return: annual_return(tr, values.len(), params.annualization_periods),
            sharpe_ratio: sharpe_ratio(&values, params.risk_free_rate, params.annualization_periods),
            max_drawdown: max_drawdown(curve),
            total_trades: closed_pnls(trades).len(),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
        }
    }
}

impl DetailedMetrics {
    pub fn compute(
        curve: &[EquityPoint],
        trades: &[Trade],
        params: &MetricsParams,
        total_fees: f64,
        total_slippage: f64,
    ) -> Self {
        let values = equity_values(curve);
        let returns = period_returns(&values);
        let periods = params.annualization_periods;
        let sharpe = sharpe_ratio(&values, params.risk_free_rate, periods);
        let final_value = values.last().copied().unwrap_or(params.initial_capital);
        let annual = annual_return(total_return(params.initial_capital, final_value), values.len(), periods);
        let pnls = closed_pnls(trades);
        let wins: Vec<f64> = pnls.iter().copied().filter(|p| *p > 0.0).collect();
        let losses: Vec<f64> = pnls.iter().copied().filter(|p| *p < 0.0).collect();
        let hold_bars: Vec<f64> = trades.iter().filter_map(|t| t.hold_bars).map(|b| b as f64).collect();

        Self {
            sharpe_annualized: finite_or_zero(sharpe * periods.sqrt()),
            sortino: sortino_ratio(&values, params.risk_free_rate, periods),
            calmar: calmar_ratio(annual, max_drawdown(curve)),
            volatility_annualized: finite_or_zero(std_dev(&returns) * periods.sqrt()),
            avg_win: mean_f64(&wins),
            avg_loss: mean_f64(&losses),
            largest_win: wins.iter().copied().fold(0.0, f64::max),
            largest_loss: losses.iter().copied().fold(0.0, f64::min),
            max_consecutive_wins: max_consecutive(&pnls, true),
            max_consecutive_losses: max_consecutive(&pnls, false),
            avg_hold_bars: mean_f64(&hold_bars),
            exposure: exposure(curve),
            total_fees: finite_or_zero(total_fees),
            total_slippage: finite_or_zero(total_slippage),
            realized_pnl: finite_or_zero(pnls.iter().sum()),
            best_period_return: returns.iter().copied().fold(0.0, f64::max),
            worst_period_return: returns.iter().copied().fold(0.0, f64::min),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// `final / initial - 1`; 0 when the initial capital is not positive.
pub fn total_return(initial_capital: f64, final_value: f64) -> f64 {
    if initial_capital <= 0.0 {
        return 0.0;
    }
    finite_or_zero(final_value / initial_capital - 1.0)
}

/// `(1 + total_return)^(periods / num_periods) - 1`.
///
/// 0 with no periods; -1 when everything was lost.
pub fn annual_return(total_return: f64, num_periods: usize, annualization_periods: f64) -> f64 {
    if num_periods == 0 || annualization_periods <= 0.0 {
        return 0.0;
    }
    let growth = 1.0 + total_return;
    if growth <= 0.0 {
        return -1.0;
    }
    finite_or_zero(growth.powf(annualization_periods / num_periods as f64) - 1.0)
}

/// Per-period Sharpe ratio. 0 with fewer than two returns or zero variance.
pub fn sharpe_ratio(equity: &[f64], risk_free_rate: f64, annualization_periods: f64) -> f64 {
    let returns = period_returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    let rf = risk_free_rate / annualization_periods;
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    finite_or_zero((mean_f64(&returns) - rf) / std)
}

/// Annualized Sortino ratio (downside deviation only).
///
/// Returns 0.0 if there is no downside or fewer than 2 returns.
pub fn sortino_ratio(equity: &[f64], risk_free_rate: f64, annualization_periods: f64) -> f64 {
    let returns = period_returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    let rf = risk_free_rate / annualization_periods;
    let excess: Vec<f64> = returns.iter().map(|r| r - rf).collect();
    let downside_sq: f64 = excess.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    finite_or_zero(mean_f64(&excess) / downside_std * annualization_periods.sqrt())
}

/// Annual return over max drawdown; 0 when there was no drawdown.
pub fn calmar_ratio(annual_return: f64, max_drawdown: f64) -> f64 {
    if max_drawdown <= 0.0 {
        return 0.0;
    }
    finite_or_zero(annual_return / max_drawdown)
}

/// Largest drawdown on the curve, in [0, 1].
pub fn max_drawdown(curve: &[EquityPoint]) -> f64 {
    curve.iter().map(|p| p.drawdown).fold(0.0, f64::max)
}

/// Winning round trips over all round trips.
pub fn win_rate(trades: &[Trade]) -> f64 {
    let pnls = closed_pnls(trades);
    if pnls.is_empty() {
        return 0.0;
    }
    pnls.iter().filter(|p| **p > 0.0).count() as f64 / pnls.len() as f64
}

/// Gross profit over gross loss; 0 when nothing was lost.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let pnls = closed_pnls(trades);
    let gross_profit: f64 = pnls.iter().filter(|p| **p > 0.0).sum();
    let gross_loss: f64 = pnls.iter().filter(|p| **p < 0.0).map(|p| p.abs()).sum();
    if gross_loss == 0.0 {
        return 0.0;
    }
    finite_or_zero(gross_profit / gross_loss)
}

/// Fraction of equity points spent outside Flat.
pub fn exposure(curve: &[EquityPoint]) -> f64 {
    if curve.is_empty() {
        return 0.0;
    }
    let invested = curve
        .iter()
        .filter(|p| p.position_state != PositionState::Flat)
        .count();
    invested as f64 / curve.len() as f64
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns between consecutive equity values.
pub fn period_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

fn equity_values(curve: &[EquityPoint]) -> Vec<f64> {
    curve.iter().map(|p| p.total_value).collect()
}

/// PnL of every closing trade, in execution order.
fn closed_pnls(trades: &[Trade]) -> Vec<f64> {
    trades.iter().filter_map(|t| t.pnl).collect()
}

pub(crate) fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn max_consecutive(pnls: &[f64], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for &pnl in pnls {
        if (pnl > 0.0) == winners {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusionlab_core::domain::{ExitReason, TradeSide};

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        let mut calc = MetricsCalculator::new(values[0]);
        for (i, &v) in values.iter().enumerate() {
            calc.record(i as i64, v, PositionState::Flat);
        }
        calc.into_points()
    }

    fn close(pnl: f64) -> Trade {
        Trade {
            side: TradeSide::Sell,
            bar_index: 5,
            timestamp: 5,
            price: 100.0,
            shares: 10,
            cost: 1000.0,
            fees: 0.0,
            slippage: 0.0,
            pnl: Some(pnl),
            hold_duration: Some(3),
            hold_bars: Some(3),
            exit_reason: Some(ExitReason::Signal),
        }
    }

    fn params() -> MetricsParams {
        MetricsParams {
            initial_capital: 100.0,
            risk_free_rate: 0.0,
            annualization_periods: 252.0,
        }
    }

    // ── Equity tracking ──

    #[test]
    fn drawdown_follows_running_peak() {
        let points = curve(&[100.0, 120.0, 90.0, 130.0, 117.0]);
        assert_eq!(points[1].peak_equity, 120.0);
        assert!((points[2].drawdown - 0.25).abs() < 1e-12);
        assert_eq!(points[3].drawdown, 0.0);
        assert!((points[4].drawdown - 0.1).abs() < 1e-12);
        assert!((max_drawdown(&points) - 0.25).abs() < 1e-12);
        for w in points.windows(2) {
            assert!(w[1].peak_equity >= w[0].peak_equity);
        }
    }

    #[test]
    fn cumulative_return_is_relative_to_initial_capital() {
        let points = curve(&[100.0, 110.0]);
        assert!((points[1].cumulative_return - 0.1).abs() < 1e-12);
    }

    // ── Returns ──

    #[test]
    fn annual_return_scales_by_periods() {
        // 10% over 126 periods of a 252-period year → 1.1^2 - 1
        assert!((annual_return(0.1, 126, 252.0) - 0.21).abs() < 1e-12);
        assert_eq!(annual_return(0.1, 0, 252.0), 0.0);
        assert_eq!(annual_return(-1.0, 10, 252.0), -1.0);
    }

    #[test]
    fn total_return_guards_zero_capital() {
        assert_eq!(total_return(0.0, 100.0), 0.0);
        assert!((total_return(100.0, 108.6) - 0.086).abs() < 1e-12);
    }

    // ── Sharpe ──

    #[test]
    fn sharpe_constant_equity_is_zero() {
        assert_eq!(sharpe_ratio(&[100.0; 50], 0.0, 252.0), 0.0);
    }

    #[test]
    fn sharpe_needs_two_returns() {
        assert_eq!(sharpe_ratio(&[100.0, 110.0], 0.0, 252.0), 0.0);
    }

    #[test]
    fn sharpe_known_value() {
        // returns: +10%, -10%, +10% → mean 1/30, sample std sqrt(0.04/3)
        let eq = [100.0, 110.0, 99.0, 108.9];
        let expected = (0.1 / 3.0) / (0.04_f64 / 3.0).sqrt();
        assert!((sharpe_ratio(&eq, 0.0, 252.0) - expected).abs() < 1e-9);
    }

    #[test]
    fn sharpe_subtracts_per_period_risk_free() {
        let eq = [100.0, 110.0, 99.0, 108.9];
        assert!(sharpe_ratio(&eq, 2.52, 252.0) < sharpe_ratio(&eq, 0.0, 252.0));
    }

    // ── Trades ──

    #[test]
    fn no_trades_gives_zeros() {
        assert_eq!(win_rate(&[]), 0.0);
        assert_eq!(profit_factor(&[]), 0.0);
        let s = SummaryMetrics::compute(&curve(&[100.0, 100.0]), &[], &params());
        assert_eq!(s.total_trades, 0);
        assert_eq!(s.sharpe_ratio, 0.0);
    }

    #[test]
    fn profit_factor_and_win_rate() {
        let trades = [close(30.0), close(-10.0), close(20.0), close(-5.0)];
        assert!((profit_factor(&trades) - 50.0 / 15.0).abs() < 1e-12);
        assert!((win_rate(&trades) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn profit_factor_without_losses_is_zero() {
        assert_eq!(profit_factor(&[close(10.0), close(5.0)]), 0.0);
    }

    #[test]
    fn streaks() {
        let pnls = [1.0, 2.0, -1.0, 3.0, 4.0, 5.0, -1.0, -2.0];
        assert_eq!(max_consecutive(&pnls, true), 3);
        assert_eq!(max_consecutive(&pnls, false), 2);
    }

    #[test]
    fn detailed_metrics_from_trades() {
        let trades = [close(30.0), close(-10.0), close(20.0)];
        let d = DetailedMetrics::compute(&curve(&[100.0, 130.0, 120.0, 140.0]), &trades, &params(), 1.5, 0.5);
        assert!((d.avg_win - 25.0).abs() < 1e-12);
        assert!((d.avg_loss + 10.0).abs() < 1e-12);
        assert_eq!(d.largest_win, 30.0);
        assert_eq!(d.largest_loss, -10.0);
        assert!((d.realized_pnl - 40.0).abs() < 1e-12);
        assert_eq!(d.avg_hold_bars, 3.0);
        assert_eq!(d.total_fees, 1.5);
        assert!((d.best_period_return - 0.3).abs() < 1e-12);
        assert!(d.worst_period_return < 0.0);
        assert_eq!(d.exposure, 0.0);
        assert!(d.calmar > 0.0);
    }

    #[test]
    fn sortino_without_downside_is_zero() {
        assert_eq!(sortino_ratio(&[100.0, 101.0, 102.0, 103.0], 0.0, 252.0), 0.0);
    }
}
