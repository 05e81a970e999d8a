//! FusionLab Core: domain types, indicators, signal providers, ensembling,
//! risk sizing and the portfolio simulator.
//!
//! Everything here is synchronous and free of I/O. A bar loop that wires these
//! pieces together lives in `fusionlab-runner`.
//!
//! - Domain types (bars, signals, positions, trades, equity points)
//! - Indicators as pure functions with NaN warm-up
//! - Signal providers behind the `SignalProvider` trait
//! - Weighted multi-source fusion (`SignalEnsembler`)
//! - Position sizing and exit levels (`RiskPolicy`)
//! - Cost model and `PortfolioSimulator`

pub mod domain;
pub mod ensemble;
pub mod indicators;
pub mod providers;
pub mod risk;
pub mod rng;
pub mod simulation;

pub use domain::{
    Action, EnsembleSignal, EquityPoint, ExitReason, MarketBar, Position, PositionState, Signal, SourceId, Trade,
    TradeSide,
};
pub use ensemble::{EnsembleConfig, EnsembleError, SignalEnsembler};
pub use providers::{ProviderError, SignalContext, SignalProvider};
pub use risk::{ExitLevels, OrderIntent, RiskError, RiskPolicy};
pub use simulation::{CostError, CostModel, OpenRejection, PortfolioSimulator};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed to batch workers are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::MarketBar>();
        require_sync::<domain::MarketBar>();
        require_send::<domain::Signal>();
        require_sync::<domain::Signal>();
        require_send::<domain::EnsembleSignal>();
        require_sync::<domain::EnsembleSignal>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::EquityPoint>();
        require_sync::<domain::EquityPoint>();

        require_send::<SignalEnsembler>();
        require_sync::<SignalEnsembler>();
        require_send::<RiskPolicy>();
        require_sync::<RiskPolicy>();
        require_send::<PortfolioSimulator>();
        require_sync::<PortfolioSimulator>();
        require_send::<SignalContext>();
        require_sync::<SignalContext>();
        require_send::<rng::RngHierarchy>();
        require_sync::<rng::RngHierarchy>();

        require_send::<providers::TechnicalProvider>();
        require_sync::<providers::TechnicalProvider>();
        require_send::<providers::SentimentProvider>();
        require_sync::<providers::SentimentProvider>();
        require_send::<providers::ModelProvider<providers::SeriesModel>>();
        require_sync::<providers::ModelProvider<providers::SeriesModel>>();
        require_send::<providers::TimeoutProvider<providers::TechnicalProvider>>();
        require_sync::<providers::TimeoutProvider<providers::TechnicalProvider>>();
    }

    /// Providers only ever see bars up to the current index.
    #[test]
    fn provider_context_has_no_future_bars() {
        let bars: Vec<MarketBar> = (0..10).map(|i| MarketBar::from_close(i, 100.0 + i as f64)).collect();
        let ctx = SignalContext::new("X".into(), bars.into(), 4);
        assert_eq!(ctx.history().len(), 5);
        assert_eq!(ctx.history().last().map(|b| b.timestamp), Some(4));
    }
}
