//! Signal providers: independent prediction sources.
//!
//! A provider sees the bar history up to and including the current bar and
//! returns one [`Signal`] for it, or a [`ProviderError`] when it has nothing
//! to say. Errors never abort a run: [`predict_or_unavailable`] turns them into
//! an unavailable signal, which the ensembler excludes for that bar only.

pub mod model;
pub mod sentiment;
pub mod technical;
pub mod timeout;

pub use model::{MomentumModel, ModelProvider, ProbabilityModel, SeriesModel};
pub use sentiment::SentimentProvider;
pub use technical::{TechnicalConfig, TechnicalProvider};
pub use timeout::TimeoutProvider;

use crate::domain::{MarketBar, Signal, SourceId};
use std::sync::Arc;
use thiserror::Error;

/// Why a provider produced no signal for a bar.
///
/// Fields are named `source_id` because thiserror reserves `source` for the
/// underlying error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("{source_id} unavailable: {reason}")]
    Unavailable { source_id: SourceId, reason: String },

    #[error("{source_id} timed out after {timeout_ms} ms")]
    Timeout { source_id: SourceId, timeout_ms: u64 },

    #[error("{source_id} failed: {message}")]
    Failed { source_id: SourceId, message: String },
}

impl ProviderError {
    pub fn unavailable(source: SourceId, reason: impl Into<String>) -> Self {
        ProviderError::Unavailable {
            source_id: source,
            reason: reason.into(),
        }
    }

    pub fn source_id(&self) -> &SourceId {
        match self {
            ProviderError::Unavailable { source_id, .. }
            | ProviderError::Timeout { source_id, .. }
            | ProviderError::Failed { source_id, .. } => source_id,
        }
    }
}

/// What a provider may look at when predicting bar `index`.
///
/// Owns shared handles to the symbol and the full series so it can be moved to
/// a worker thread, but only exposes bars up to `index`.
#[derive(Debug, Clone)]
pub struct SignalContext {
    symbol: Arc<str>,
    bars: Arc<[MarketBar]>,
    index: usize,
}

impl SignalContext {
    /// `index` must be a valid position in `bars`.
    pub fn new(symbol: Arc<str>, bars: Arc<[MarketBar]>, index: usize) -> Self {
        debug_assert!(index < bars.len(), "context index out of range");
        Self {
            symbol,
            bars,
            index,
        }
    }

    /// The same series positioned at another bar.
    pub fn at(&self, index: usize) -> Self {
        Self::new(Arc::clone(&self.symbol), Arc::clone(&self.bars), index)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Bars `0..=index`. Nothing after the current bar is reachable.
    pub fn history(&self) -> &[MarketBar] {
        &self.bars[..=self.index]
    }

    pub fn current(&self) -> &MarketBar {
        &self.bars[self.index]
    }
}

/// One prediction source.
pub trait SignalProvider: Send + Sync {
    /// Source this provider reports as.
    fn source(&self) -> SourceId;

    /// Bars of history needed before predictions are meaningful.
    fn lookback(&self) -> usize {
        0
    }

    fn predict(&self, ctx: &SignalContext) -> Result<Signal, ProviderError>;
}

impl<P: SignalProvider + ?Sized> SignalProvider for Box<P> {
    fn source(&self) -> SourceId {
        (**self).source()
    }

    fn lookback(&self) -> usize {
        (**self).lookback()
    }

    fn predict(&self, ctx: &SignalContext) -> Result<Signal, ProviderError> {
        (**self).predict(ctx)
    }
}

impl<P: SignalProvider + ?Sized> SignalProvider for Arc<P> {
    fn source(&self) -> SourceId {
        (**self).source()
    }

    fn lookback(&self) -> usize {
        (**self).lookback()
    }

    fn predict(&self, ctx: &SignalContext) -> Result<Signal, ProviderError> {
        (**self).predict(ctx)
    }
}

/// Run a provider, mapping any error to an unavailable signal.
pub fn predict_or_unavailable<P: SignalProvider + ?Sized>(provider: &P, ctx: &SignalContext) -> Signal {
    match provider.predict(ctx) {
        Ok(signal) => signal,
        Err(err @ ProviderError::Unavailable { .. }) => {
            tracing::debug!(bar = ctx.index(), error = %err, "provider unavailable");
            Signal::unavailable(provider.source())
        }
        Err(err) => {
            tracing::warn!(bar = ctx.index(), error = %err, "provider error");
            Signal::unavailable(provider.source())
        }
    }
}

#[cfg(test)]
pub(crate) fn context_from_closes(closes: &[f64]) -> SignalContext {
    let bars: Vec<MarketBar> = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| MarketBar::from_close(i as i64, c))
        .collect();
    let index = bars.len() - 1;
    SignalContext::new(Arc::from("TEST"), Arc::from(bars), index)
}
