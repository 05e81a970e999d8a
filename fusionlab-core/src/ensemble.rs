//! Weighted fusion of per-source signals into one decision.
//!
//! 1. Keep signals that are available and whose source has a configured weight.
//! 2. Renormalize the kept weights to sum to 1.
//! 3. `raw_score = Σ w·score`, `confidence = Σ w·strength`.
//! 4. `raw_score > buy_threshold` → Buy, `< sell_threshold` → Sell, else Hold;
//!    `strength = |raw_score|`.
//!
//! With nothing usable the result is [`EnsembleSignal::neutral`].

use crate::domain::{Action, EnsembleSignal, Signal, SourceId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnsembleError {
    #[error("signal from {source_id} has strength {strength} outside [0, 1]")]
    SignalOutOfRange { source_id: SourceId, strength: f64 },

    #[error("source {source_id} appears more than once")]
    DuplicateSource { source_id: SourceId },

    #[error("weight for {source_id} must be finite and non-negative, got {weight}")]
    InvalidWeight { source_id: SourceId, weight: f64 },

    #[error("thresholds must satisfy -1 <= sell ({sell}) < buy ({buy}) <= 1")]
    InvalidThresholds { buy: f64, sell: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Per-source weights. Sources without an entry are ignored.
    pub weights: BTreeMap<SourceId, f64>,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        let weights = [
            (SourceId::model(), 0.4),
            (SourceId::technical(), 0.35),
            (SourceId::sentiment(), 0.25),
        ]
        .into_iter()
        .collect();
        Self {
            weights,
            buy_threshold: 0.3,
            sell_threshold: -0.3,
        }
    }
}

impl EnsembleConfig {
    /// Only `source` counts, with weight 1.
    pub fn single(source: SourceId) -> Self {
        Self {
            weights: [(source, 1.0)].into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), EnsembleError> {
        for (source, &weight) in &self.weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(EnsembleError::InvalidWeight {
                    source_id: source.clone(),
                    weight,
                });
            }
        }
        let (buy, sell) = (self.buy_threshold, self.sell_threshold);
        let ordered = sell < buy && (-1.0..=1.0).contains(&sell) && (-1.0..=1.0).contains(&buy);
        if !ordered {
            return Err(EnsembleError::InvalidThresholds { buy, sell });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SignalEnsembler {
    config: EnsembleConfig,
}

impl SignalEnsembler {
    pub fn new(config: EnsembleConfig) -> Result<Self, EnsembleError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Ensembler that listens to `source` alone, with default thresholds.
    pub fn single(source: SourceId) -> Self {
        Self {
            config: EnsembleConfig::single(source),
        }
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    /// Fuse one bar's signals. Order of `signals` does not affect the result.
    pub fn combine(&self, signals: &[Signal]) -> Result<EnsembleSignal, EnsembleError> {
        let mut seen = BTreeSet::new();
        let mut usable: BTreeMap<&SourceId, (f64, &Signal)> = BTreeMap::new();

        for signal in signals {
            if !seen.insert(&signal.source) {
                return Err(EnsembleError::DuplicateSource {
                    source_id: signal.source.clone(),
                });
            }
            if !signal.available {
                continue;
            }
            if !(0.0..=1.0).contains(&signal.strength) {
                return Err(EnsembleError::SignalOutOfRange {
                    source_id: signal.source.clone(),
                    strength: signal.strength,
                });
            }
            match self.config.weights.get(&signal.source) {
                Some(&w) if w > 0.0 => {
                    usable.insert(&signal.source, (w, signal));
                }
                Some(_) => {}
                None => tracing::debug!(source = %signal.source, "ignoring signal from unweighted source"),
            }
        }

        let total: f64 = usable.values().map(|(w, _)| w).sum();
        if usable.is_empty() || total <= 0.0 {
            return Ok(EnsembleSignal::neutral());
        }

        let mut raw_score = 0.0;
        let mut confidence = 0.0;
        for (w, signal) in usable.values() {
            let w = w / total;
            raw_score += w * signal.score();
            confidence += w * signal.strength;
        }
        let raw_score = raw_score.clamp(-1.0, 1.0);
        let confidence = confidence.clamp(0.0, 1.0);

        let action = if raw_score > self.config.buy_threshold {
            Action::Buy
        } else if raw_score < self.config.sell_threshold {
            Action::Sell
        } else {
            Action::Hold
        };

        Ok(EnsembleSignal {
            action,
            strength: raw_score.abs(),
            confidence,
            contributing_sources: usable.keys().map(|s| (*s).clone()).collect(),
            raw_score,
        })
    }
}

impl Default for SignalEnsembler {
    fn default() -> Self {
        Self {
            config: EnsembleConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    #[test]
    fn single_available_source_sets_confidence() {
        let ensembler = SignalEnsembler::default();
        let out = ensembler
            .combine(&[
                Signal::buy(SourceId::technical(), 0.7),
                Signal::unavailable(SourceId::model()),
                Signal::unavailable(SourceId::sentiment()),
            ])
            .unwrap();
        approx(out.confidence, 0.7);
        approx(out.raw_score, 0.7);
        assert_eq!(out.action, Action::Buy);
        assert_eq!(out.contributing_sources, vec![SourceId::technical()]);
    }

    #[test]
    fn weighted_mix() {
        // model buy 1.0 (0.4), technical sell 0.5 (0.35), sentiment hold (0.25)
        let out = SignalEnsembler::default()
            .combine(&[
                Signal::buy(SourceId::model(), 1.0),
                Signal::sell(SourceId::technical(), 0.5),
                Signal::hold(SourceId::sentiment()),
            ])
            .unwrap();
        approx(out.raw_score, 0.4 - 0.175);
        approx(out.confidence, 0.4 + 0.175);
        assert_eq!(out.action, Action::Hold);
        approx(out.strength, 0.225);
        assert_eq!(out.contributing_sources.len(), 3);
    }

    #[test]
    fn strong_sell_consensus() {
        let out = SignalEnsembler::default()
            .combine(&[
                Signal::sell(SourceId::model(), 0.9),
                Signal::sell(SourceId::technical(), 0.6),
            ])
            .unwrap();
        assert_eq!(out.action, Action::Sell);
        assert!(out.raw_score < -0.3);
    }

    #[test]
    fn nothing_available_is_neutral() {
        let out = SignalEnsembler::default()
            .combine(&[Signal::unavailable(SourceId::model())])
            .unwrap();
        assert_eq!(out, EnsembleSignal::neutral());
        assert_eq!(SignalEnsembler::default().combine(&[]).unwrap(), EnsembleSignal::neutral());
    }

    #[test]
    fn out_of_range_strength_is_rejected() {
        let err = SignalEnsembler::default()
            .combine(&[Signal::buy(SourceId::model(), 1.5)])
            .unwrap_err();
        assert_eq!(
            err,
            EnsembleError::SignalOutOfRange {
                source_id: SourceId::model(),
                strength: 1.5
            }
        );
        let nan = SignalEnsembler::default().combine(&[Signal::buy(SourceId::model(), f64::NAN)]);
        assert!(matches!(nan, Err(EnsembleError::SignalOutOfRange { .. })));
    }

    #[test]
    fn unavailable_out_of_range_is_not_checked() {
        let mut signal = Signal::unavailable(SourceId::model());
        signal.strength = 7.0;
        assert!(SignalEnsembler::default().combine(&[signal]).is_ok());
    }

    #[test]
    fn duplicate_source_is_rejected() {
        let err = SignalEnsembler::default()
            .combine(&[
                Signal::buy(SourceId::model(), 0.5),
                Signal::sell(SourceId::model(), 0.5),
            ])
            .unwrap_err();
        assert!(matches!(err, EnsembleError::DuplicateSource { .. }));
    }

    #[test]
    fn unweighted_source_is_ignored() {
        let out = SignalEnsembler::default()
            .combine(&[
                Signal::buy(SourceId::new("astrology"), 1.0),
                Signal::sell(SourceId::model(), 0.8),
            ])
            .unwrap();
        assert_eq!(out.contributing_sources, vec![SourceId::model()]);
        approx(out.raw_score, -0.8);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let mut config = EnsembleConfig::default();
        config.weights.insert(SourceId::model(), -0.1);
        assert!(matches!(
            SignalEnsembler::new(config),
            Err(EnsembleError::InvalidWeight { .. })
        ));

        let config = EnsembleConfig {
            buy_threshold: -0.5,
            ..EnsembleConfig::default()
        };
        assert!(matches!(
            SignalEnsembler::new(config),
            Err(EnsembleError::InvalidThresholds { .. })
        ));
    }

    #[test]
    fn threshold_is_exclusive() {
        let ensembler = SignalEnsembler::new(EnsembleConfig::single(SourceId::model())).unwrap();
        let out = ensembler.combine(&[Signal::buy(SourceId::model(), 0.3)]).unwrap();
        assert_eq!(out.action, Action::Hold);
    }
}
