//! FusionLab Runner: backtest orchestration on top of `fusionlab-core`.
//!
//! - TOML configuration with validation and fingerprinting
//! - Built-in strategies behind the `StrategyProvider` trait
//! - The per-bar backtest loop and its result type
//! - Summary and detailed performance metrics
//! - Parallel batches with cooperative cancellation

pub mod batch;
pub mod config;
pub mod metrics;
pub mod result;
pub mod runner;
pub mod strategy;

pub use batch::{run_batch, run_batch_sequential, BatchJob};
pub use config::{BacktestConfig, BacktestSection, ConfigError, ModelSettings, SentimentSettings, StrategyConfig};
pub use metrics::{DetailedMetrics, MetricsCalculator, MetricsParams, SummaryMetrics};
pub use result::{BacktestResult, RunDiagnostics};
pub use runner::{run_backtest, BacktestRunner, RunError};
pub use strategy::{BuyAndHold, ProviderStrategy, SignalInputs, Strategy, StrategyProvider};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn result_types_are_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
        assert_send::<SummaryMetrics>();
        assert_sync::<SummaryMetrics>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
    }

    #[test]
    fn strategies_are_send_sync() {
        assert_send::<Strategy>();
        assert_sync::<Strategy>();
        assert_send::<BatchJob<Strategy>>();
        assert_sync::<BatchJob<Strategy>>();
    }

    #[test]
    fn run_error_is_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
