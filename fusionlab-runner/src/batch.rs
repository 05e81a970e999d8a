//! Parallel batches of independent backtests.
//!
//! Jobs run on the rayon pool; each owns its bars, strategy and config, so no
//! state is shared between runs. Results come back in job order. Each job's
//! slippage stream is seeded from the master seed and the job's symbol, so a
//! batch is reproducible regardless of thread count.

use std::sync::atomic::{AtomicBool, Ordering};

use fusionlab_core::domain::MarketBar;
use rayon::prelude::*;
use tracing::info;

use crate::config::BacktestConfig;
use crate::result::BacktestResult;
use crate::runner::{BacktestRunner, RunError};
use crate::strategy::StrategyProvider;

/// One (symbol, config) pair to run.
#[derive(Debug, Clone)]
pub struct BatchJob<S> {
    pub symbol: String,
    pub bars: Vec<MarketBar>,
    pub strategy: S,
    pub config: BacktestConfig,
}

impl<S: StrategyProvider> BatchJob<S> {
    /// The job's config is re-targeted at `symbol`.
    pub fn new(symbol: impl Into<String>, bars: Vec<MarketBar>, strategy: S, config: &BacktestConfig) -> Self {
        let symbol = symbol.into();
        let config = config.for_symbol(&symbol);
        Self {
            symbol,
            bars,
            strategy,
            config,
        }
    }

    fn run(&self, cancel: Option<&AtomicBool>) -> Result<BacktestResult, RunError> {
        let runner = BacktestRunner::new(&self.config);
        match cancel {
            Some(flag) => runner.with_cancel(flag).run(&self.bars, &self.strategy),
            None => runner.run(&self.bars, &self.strategy),
        }
    }
}

/// Run every job in parallel. Output position `i` belongs to `jobs[i]`.
///
/// Once `cancel` is set, running jobs stop at their next bar and jobs not yet
/// started return `Cancelled { bar_index: 0 }`.
pub fn run_batch<S: StrategyProvider>(
    jobs: &[BatchJob<S>],
    cancel: Option<&AtomicBool>,
) -> Vec<Result<BacktestResult, RunError>> {
    info!(jobs = jobs.len(), "batch started");
    let results: Vec<_> = jobs
        .par_iter()
        .map(|job| {
            if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
                return Err(RunError::Cancelled { bar_index: 0 });
            }
            job.run(cancel)
        })
        .collect();
    let failed = results.iter().filter(|r| r.is_err()).count();
    info!(jobs = jobs.len(), failed, "batch finished");
    results
}

/// Sequential variant, for callers that already run inside a parallel context.
pub fn run_batch_sequential<S: StrategyProvider>(
    jobs: &[BatchJob<S>],
    cancel: Option<&AtomicBool>,
) -> Vec<Result<BacktestResult, RunError>> {
    jobs.iter()
        .map(|job| {
            if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
                return Err(RunError::Cancelled { bar_index: 0 });
            }
            job.run(cancel)
        })
        .collect()
}
