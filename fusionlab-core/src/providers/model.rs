//! Model-based provider: maps a probability of an up move to a signal.
//!
//! `p > buy_above` → Buy, `p < sell_below` → Sell, otherwise Hold, with
//! `strength = |p - 0.5| * 2`. The probability comes from any
//! [`ProbabilityModel`]; two are built in.

use super::{ProviderError, SignalContext, SignalProvider};
use crate::domain::{Action, Signal, SourceId};
use std::collections::BTreeMap;

/// Something that estimates P(next move is up) at the current bar.
pub trait ProbabilityModel: Send + Sync {
    fn name(&self) -> &str;

    fn lookback(&self) -> usize {
        0
    }

    /// `None` when the model has no estimate for this bar.
    fn probability_up(&self, ctx: &SignalContext) -> Option<f64>;
}

#[derive(Debug, Clone)]
pub struct ModelProvider<M> {
    model: M,
    buy_above: f64,
    sell_below: f64,
}

impl<M: ProbabilityModel> ModelProvider<M> {
    pub fn new(model: M) -> Self {
        Self::with_cutoffs(model, 0.6, 0.4)
    }

    pub fn with_cutoffs(model: M, buy_above: f64, sell_below: f64) -> Self {
        Self {
            model,
            buy_above,
            sell_below,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M: ProbabilityModel> SignalProvider for ModelProvider<M> {
    fn source(&self) -> SourceId {
        SourceId::model()
    }

    fn lookback(&self) -> usize {
        self.model.lookback()
    }

    fn predict(&self, ctx: &SignalContext) -> Result<Signal, ProviderError> {
        let p = self.model.probability_up(ctx).ok_or_else(|| {
            ProviderError::unavailable(self.source(), format!("{} has no estimate", self.model.name()))
        })?;
        if !(0.0..=1.0).contains(&p) {
            return Err(ProviderError::Failed {
                source_id: self.source(),
                message: format!("{} returned probability {p}", self.model.name()),
            });
        }
        let action = if p > self.buy_above {
            Action::Buy
        } else if p < self.sell_below {
            Action::Sell
        } else {
            Action::Hold
        };
        Ok(Signal::new(self.source(), action, (p - 0.5).abs() * 2.0))
    }
}

/// Precomputed probabilities keyed by bar timestamp.
#[derive(Debug, Clone, Default)]
pub struct SeriesModel {
    probabilities: BTreeMap<i64, f64>,
}

impl SeriesModel {
    pub fn new(probabilities: BTreeMap<i64, f64>) -> Self {
        Self { probabilities }
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }
}

impl FromIterator<(i64, f64)> for SeriesModel {
    fn from_iter<I: IntoIterator<Item = (i64, f64)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl ProbabilityModel for SeriesModel {
    fn name(&self) -> &str {
        "series"
    }

    fn probability_up(&self, ctx: &SignalContext) -> Option<f64> {
        self.probabilities.get(&ctx.current().timestamp).copied()
    }
}

/// Logistic model over the mean of the last `lookback` close-to-close returns:
/// `p = 1 / (1 + exp(-sensitivity * mean_return))`.
#[derive(Debug, Clone)]
pub struct MomentumModel {
    lookback: usize,
    sensitivity: f64,
}

impl MomentumModel {
    pub fn new(lookback: usize, sensitivity: f64) -> Self {
        assert!(lookback >= 1, "momentum lookback must be >= 1");
        Self {
            lookback,
            sensitivity,
        }
    }
}

impl Default for MomentumModel {
    fn default() -> Self {
        Self::new(10, 50.0)
    }
}

impl ProbabilityModel for MomentumModel {
    fn name(&self) -> &str {
        "momentum"
    }

    fn lookback(&self) -> usize {
        self.lookback
    }

    fn probability_up(&self, ctx: &SignalContext) -> Option<f64> {
        let history = ctx.history();
        if history.len() <= self.lookback {
            return None;
        }
        let recent = &history[history.len() - self.lookback - 1..];
        let mean_return = recent
            .windows(2)
            .map(|w| w[1].close / w[0].close - 1.0)
            .sum::<f64>()
            / self.lookback as f64;
        let p = 1.0 / (1.0 + (-self.sensitivity * mean_return).exp());
        p.is_finite().then_some(p)
    }
}
