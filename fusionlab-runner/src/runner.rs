//! Backtest runner: the per-bar loop wiring strategy, risk policy, simulator
//! and metrics together.
//!
//! Per bar, in order:
//! 1. cancellation check
//! 2. exit-level check while Long, for strategies that use exit levels
//! 3. strategy signal (from `strategy.lookback()` on)
//! 4. sizing and execution
//! 5. forced close on the last bar
//! 6. equity point
//!
//! Inputs are never mutated. Bars are validated up front; any integrity
//! problem aborts the run before a single trade.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fusionlab_core::domain::{validate_series, Action, DataIntegrityError, ExitReason, MarketBar};
use fusionlab_core::providers::SignalContext;
use fusionlab_core::risk::ExitLevels;
use fusionlab_core::rng::{RngHierarchy, RngStream};
use fusionlab_core::simulation::PortfolioSimulator;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{BacktestConfig, ConfigError};
use crate::metrics::{DetailedMetrics, MetricsCalculator, MetricsParams, SummaryMetrics};
use crate::result::{BacktestResult, RunDiagnostics, SCHEMA_VERSION};
use crate::strategy::StrategyProvider;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Data(#[from] DataIntegrityError),
    #[error("run cancelled at bar {bar_index}")]
    Cancelled { bar_index: usize },
}

/// Runs one strategy over one bar series under one config.
#[derive(Debug, Clone, Copy)]
pub struct BacktestRunner<'a> {
    config: &'a BacktestConfig,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> BacktestRunner<'a> {
    pub fn new(config: &'a BacktestConfig) -> Self {
        Self { config, cancel: None }
    }

    /// Stop at the next bar boundary once `flag` is set.
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|f| f.load(Ordering::Relaxed))
    }

    pub fn run<S: StrategyProvider + ?Sized>(
        &self,
        bars: &[MarketBar],
        strategy: &S,
    ) -> Result<BacktestResult, RunError> {
        let config = self.config;
        config.validate()?;
        validate_series(bars)?;
        if self.cancelled() {
            return Err(RunError::Cancelled { bar_index: 0 });
        }

        let symbol: Arc<str> = Arc::from(config.backtest.symbol.as_str());
        let shared: Arc<[MarketBar]> = Arc::from(bars);
        let lookback = strategy.lookback();
        let expected_sources = strategy.sources();
        let policy = &config.risk;
        let exits_enabled = policy.enforce_exit_levels && strategy.uses_exit_levels();
        let initial_capital = config.backtest.initial_capital;

        info!(
            symbol = %symbol,
            strategy = strategy.name(),
            bars = bars.len(),
            lookback,
            "backtest started"
        );

        let rng = RngHierarchy::new(config.backtest.random_seed).rng_for(&symbol, RngStream::SlippageJitter);
        let mut sim = PortfolioSimulator::new(initial_capital, config.costs.clone(), rng);
        let mut metrics = MetricsCalculator::with_capacity(initial_capital, bars.len());
        let mut trades = Vec::new();
        let mut levels: Option<ExitLevels> = None;
        let mut diagnostics = RunDiagnostics {
            bar_count: bars.len(),
            warmup_bars: lookback.min(bars.len()),
            missing_source_bars: expected_sources.iter().map(|s| (s.clone(), 0)).collect(),
            ..RunDiagnostics::default()
        };
        let last = bars.len() - 1;

        for (i, bar) in bars.iter().enumerate() {
            if self.cancelled() {
                warn!(symbol = %symbol, bar = i, "backtest cancelled");
                return Err(RunError::Cancelled { bar_index: i });
            }

            if exits_enabled && sim.position().is_long() {
                if let Some(reason) = levels.and_then(|l| l.long_exit(bar.close)) {
                    if let Some(trade) = sim.close(bar, i, reason) {
                        info!(bar = i, price = trade.price, pnl = trade.pnl, ?reason, "position closed");
                        match reason {
                            ExitReason::StopLoss => diagnostics.stop_loss_exits += 1,
                            ExitReason::TakeProfit => diagnostics.take_profit_exits += 1,
                            _ => {}
                        }
                        trades.push(trade);
                        levels = None;
                    }
                }
            }

            if i >= lookback {
                let ctx = SignalContext::new(Arc::clone(&symbol), Arc::clone(&shared), i);
                match strategy.signal(&ctx) {
                    Ok(signal) => {
                        diagnostics.decision_bars += 1;
                        for source in &expected_sources {
                            if !signal.contributing_sources.contains(source) {
                                *diagnostics.missing_source_bars.entry(source.clone()).or_default() += 1;
                            }
                        }
                        debug!(
                            bar = i,
                            action = %signal.action,
                            raw_score = signal.raw_score,
                            confidence = signal.confidence,
                            "decision"
                        );

                        if let Some(intent) = policy.size(&signal, bar.close) {
                            match intent.direction {
                                Action::Buy if sim.position().is_flat() => match sim.try_open(&intent, bar, i) {
                                    Ok(trade) => {
                                        info!(bar = i, price = trade.price, shares = trade.shares, "position opened");
                                        levels = Some(policy.exit_levels(Action::Buy, trade.price));
                                        trades.push(trade);
                                    }
                                    Err(reason) => {
                                        debug!(bar = i, %reason, "open skipped");
                                        diagnostics.rejected_opens += 1;
                                    }
                                },
                                Action::Sell if sim.position().is_long() => {
                                    if let Some(trade) = sim.close(bar, i, ExitReason::Signal) {
                                        info!(bar = i, price = trade.price, pnl = trade.pnl, "position closed on signal");
                                        levels = None;
                                        trades.push(trade);
                                    }
                                }
                                _ => {}
                            }
                        }
                    }
                    Err(err) => {
                        warn!(bar = i, error = %err, "signal rejected, holding");
                        diagnostics.rejected_signals += 1;
                    }
                }
            }

            if i == last {
                if let Some(trade) = sim.close(bar, i, ExitReason::EndOfData) {
                    info!(bar = i, price = trade.price, pnl = trade.pnl, "position closed at end of data");
                    trades.push(trade);
                }
            }

            metrics.record(bar.timestamp, sim.value(bar), sim.position().state());
        }

        let params = MetricsParams {
            initial_capital,
            risk_free_rate: config.backtest.risk_free_rate,
            annualization_periods: config.backtest.annualization_periods,
        };
        let curve = metrics.into_points();
        let summary = SummaryMetrics::compute(&curve, &trades, &params);
        let detailed = DetailedMetrics::compute(&curve, &trades, &params, sim.total_fees(), sim.total_slippage());

        info!(
            symbol = %symbol,
            final_value = summary.final_value,
            total_return = summary.total_return,
            trades = summary.total_trades,
            "backtest finished"
        );

        Ok(BacktestResult {
            schema_version: SCHEMA_VERSION,
            symbol: symbol.to_string(),
            strategy: strategy.name().to_string(),
            summary,
            detailed,
            trades,
            equity_curve: curve,
            config_snapshot: config.clone(),
            config_fingerprint: config.fingerprint()?,
            diagnostics,
        })
    }
}

/// Run a backtest without cancellation.
pub fn run_backtest<S: StrategyProvider + ?Sized>(
    bars: &[MarketBar],
    strategy: &S,
    config: &BacktestConfig,
) -> Result<BacktestResult, RunError> {
    BacktestRunner::new(config).run(bars, strategy)
}
