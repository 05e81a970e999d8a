//! Sentiment provider over a polarity series in [-1, 1].

use super::{ProviderError, SignalContext, SignalProvider};
use crate::domain::{Signal, SourceId};
use std::collections::BTreeMap;

/// Polarity keyed by bar timestamp. `|polarity| <= neutral_band` holds;
/// otherwise the sign picks the action and `|polarity|` is the strength.
#[derive(Debug, Clone, Default)]
pub struct SentimentProvider {
    polarity: BTreeMap<i64, f64>,
    neutral_band: f64,
}

impl SentimentProvider {
    pub fn new(polarity: BTreeMap<i64, f64>, neutral_band: f64) -> Self {
        Self {
            polarity,
            neutral_band,
        }
    }

    pub fn neutral_band(&self) -> f64 {
        self.neutral_band
    }
}

impl SignalProvider for SentimentProvider {
    fn source(&self) -> SourceId {
        SourceId::sentiment()
    }

    fn predict(&self, ctx: &SignalContext) -> Result<Signal, ProviderError> {
        let ts = ctx.current().timestamp;
        let polarity = *self
            .polarity
            .get(&ts)
            .ok_or_else(|| ProviderError::unavailable(self.source(), format!("no reading at {ts}")))?;
        if !(-1.0..=1.0).contains(&polarity) {
            return Err(ProviderError::Failed {
                source_id: self.source(),
                message: format!("polarity {polarity} outside [-1, 1]"),
            });
        }
        if polarity.abs() <= self.neutral_band {
            return Ok(Signal::hold(self.source()));
        }
        let signal = if polarity > 0.0 {
            Signal::buy(self.source(), polarity)
        } else {
            Signal::sell(self.source(), -polarity)
        };
        Ok(signal)
    }
}
