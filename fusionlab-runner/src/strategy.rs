//! Strategies: turn the bar history at one index into an ensemble signal.
//!
//! Every built-in strategy routes its sources through a [`SignalEnsembler`],
//! so single-source strategies obey the same thresholds and contract checks
//! as the full ensemble.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use fusionlab_core::domain::{EnsembleSignal, Signal, SourceId};
use fusionlab_core::ensemble::{EnsembleConfig, EnsembleError, SignalEnsembler};
use fusionlab_core::providers::{
    predict_or_unavailable, MomentumModel, ModelProvider, SentimentProvider, SeriesModel, SignalContext,
    SignalProvider, TechnicalProvider, TimeoutProvider,
};

use crate::config::{BacktestConfig, ConfigError, StrategyConfig};

/// Anything that can produce one decision per bar.
pub trait StrategyProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Decisions start at bar index `lookback()`.
    fn lookback(&self) -> usize;

    /// Sources this strategy expects to hear from on every decision bar.
    fn sources(&self) -> Vec<SourceId>;

    /// Decision for `ctx.index()`. Must not read past the current bar.
    fn signal(&self, ctx: &SignalContext) -> Result<EnsembleSignal, EnsembleError>;

    /// Whether the runner may close this strategy's positions at the
    /// intent's stop-loss and take-profit levels.
    fn uses_exit_levels(&self) -> bool {
        true
    }
}

/// External per-timestamp series a strategy may draw on.
#[derive(Debug, Clone, Default)]
pub struct SignalInputs {
    /// P(up) per bar timestamp.
    pub model_probabilities: Option<BTreeMap<i64, f64>>,
    /// Sentiment polarity in [-1, 1] per bar timestamp.
    pub sentiment: Option<BTreeMap<i64, f64>>,
}

/// Always long: a full-strength Buy from the first decision bar on.
#[derive(Debug, Clone)]
pub struct BuyAndHold {
    ensembler: SignalEnsembler,
}

impl BuyAndHold {
    pub const SOURCE: &'static str = "buy_and_hold";

    pub fn new() -> Self {
        Self {
            ensembler: SignalEnsembler::single(SourceId::new(Self::SOURCE)),
        }
    }
}

impl Default for BuyAndHold {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyProvider for BuyAndHold {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn lookback(&self) -> usize {
        1
    }

    fn sources(&self) -> Vec<SourceId> {
        vec![SourceId::new(Self::SOURCE)]
    }

    fn signal(&self, _ctx: &SignalContext) -> Result<EnsembleSignal, EnsembleError> {
        self.ensembler.combine(&[Signal::buy(SourceId::new(Self::SOURCE), 1.0)])
    }

    /// Held to the last bar regardless of exit levels.
    fn uses_exit_levels(&self) -> bool {
        false
    }
}

/// A set of providers fused by an ensembler.
pub struct ProviderStrategy {
    name: String,
    providers: Vec<Box<dyn SignalProvider>>,
    ensembler: SignalEnsembler,
}

impl ProviderStrategy {
    pub fn new(name: impl Into<String>, providers: Vec<Box<dyn SignalProvider>>, ensembler: SignalEnsembler) -> Self {
        Self {
            name: name.into(),
            providers,
            ensembler,
        }
    }

    pub fn ensembler(&self) -> &SignalEnsembler {
        &self.ensembler
    }

    /// Raw per-source signals for the bar, unavailable ones included.
    pub fn source_signals(&self, ctx: &SignalContext) -> Vec<Signal> {
        self.providers
            .iter()
            .map(|p| predict_or_unavailable(p.as_ref(), ctx))
            .collect()
    }
}

impl std::fmt::Debug for ProviderStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderStrategy")
            .field("name", &self.name)
            .field("sources", &self.sources())
            .finish()
    }
}

impl StrategyProvider for ProviderStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    /// The longest provider warm-up, so every source can speak from the
    /// first decision bar.
    fn lookback(&self) -> usize {
        self.providers.iter().map(|p| p.lookback()).max().unwrap_or(0)
    }

    fn sources(&self) -> Vec<SourceId> {
        self.providers.iter().map(|p| p.source()).collect()
    }

    fn signal(&self, ctx: &SignalContext) -> Result<EnsembleSignal, EnsembleError> {
        let signals = self.source_signals(ctx);
        self.ensembler.combine(&signals)
    }
}

/// Built-in strategies, dispatched statically.
#[derive(Debug)]
pub enum Strategy {
    BuyAndHold(BuyAndHold),
    Technical(ProviderStrategy),
    Ensemble(ProviderStrategy),
}

impl Strategy {
    /// Build the strategy a config selects. The config is validated first.
    ///
    /// Model probabilities from `inputs` replace the momentum model; without a
    /// sentiment series the sentiment source is left out and the remaining
    /// weights are renormalized per bar.
    pub fn from_config(config: &BacktestConfig, inputs: SignalInputs) -> Result<Self, ConfigError> {
        config.validate()?;
        let timeout = config.backtest.provider_timeout_ms.map(Duration::from_millis);
        match &config.strategy {
            StrategyConfig::BuyAndHold => Ok(Strategy::BuyAndHold(BuyAndHold::new())),
            StrategyConfig::Technical { technical } => {
                let providers = vec![wrap(TechnicalProvider::new(technical.clone()), timeout)];
                let ensembler = SignalEnsembler::new(EnsembleConfig {
                    weights: [(SourceId::technical(), 1.0)].into_iter().collect(),
                    ..config.ensemble.clone()
                })?;
                Ok(Strategy::Technical(ProviderStrategy::new("technical", providers, ensembler)))
            }
            StrategyConfig::Ensemble {
                technical,
                model,
                sentiment,
            } => {
                let mut providers = vec![wrap(TechnicalProvider::new(technical.clone()), timeout)];
                match inputs.model_probabilities {
                    Some(series) => providers.push(wrap(
                        ModelProvider::with_cutoffs(SeriesModel::new(series), model.buy_above, model.sell_below),
                        timeout,
                    )),
                    None => providers.push(wrap(
                        ModelProvider::with_cutoffs(
                            MomentumModel::new(model.momentum_lookback, model.momentum_sensitivity),
                            model.buy_above,
                            model.sell_below,
                        ),
                        timeout,
                    )),
                }
                if let Some(series) = inputs.sentiment {
                    providers.push(wrap(SentimentProvider::new(series, sentiment.neutral_band), timeout));
                }
                let ensembler = SignalEnsembler::new(config.ensemble.clone())?;
                Ok(Strategy::Ensemble(ProviderStrategy::new("ensemble", providers, ensembler)))
            }
        }
    }

    fn inner(&self) -> &dyn StrategyProvider {
        match self {
            Strategy::BuyAndHold(s) => s,
            Strategy::Technical(s) | Strategy::Ensemble(s) => s,
        }
    }
}

fn wrap<P: SignalProvider + 'static>(provider: P, timeout: Option<Duration>) -> Box<dyn SignalProvider> {
    match timeout {
        Some(t) => Box::new(TimeoutProvider::new(provider, t)),
        None => Box::new(provider),
    }
}

impl StrategyProvider for Strategy {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn lookback(&self) -> usize {
        self.inner().lookback()
    }

    fn sources(&self) -> Vec<SourceId> {
        self.inner().sources()
    }

    fn signal(&self, ctx: &SignalContext) -> Result<EnsembleSignal, EnsembleError> {
        self.inner().signal(ctx)
    }

    fn uses_exit_levels(&self) -> bool {
        self.inner().uses_exit_levels()
    }
}

impl<S: StrategyProvider + ?Sized> StrategyProvider for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn lookback(&self) -> usize {
        (**self).lookback()
    }

    fn sources(&self) -> Vec<SourceId> {
        (**self).sources()
    }

    fn signal(&self, ctx: &SignalContext) -> Result<EnsembleSignal, EnsembleError> {
        (**self).signal(ctx)
    }

    fn uses_exit_levels(&self) -> bool {
        (**self).uses_exit_levels()
    }
}
