//! Position sizing and exit levels.
//!
//! `size_fraction = max_position_fraction * confidence`, halved when the
//! configured reward/risk ratio (`take_profit_pct / stop_loss_pct`) falls
//! below `min_risk_reward`. Sizing is a pure function of the signal, the
//! reference price and the policy.

use crate::domain::{Action, EnsembleSignal, ExitReason};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    #[error("max_position_fraction must be in (0, 1], got {0}")]
    InvalidPositionFraction(f64),

    #[error("stop_loss_pct must be in (0, 1), got {0}")]
    InvalidStopLoss(f64),

    #[error("take_profit_pct must be finite and positive, got {0}")]
    InvalidTakeProfit(f64),

    #[error("min_risk_reward must be finite and non-negative, got {0}")]
    InvalidRiskReward(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskPolicy {
    pub max_position_fraction: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub min_risk_reward: f64,
    /// Close a Long when a later bar's close crosses the intent's levels.
    pub enforce_exit_levels: bool,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            max_position_fraction: 0.95,
            stop_loss_pct: 0.05,
            take_profit_pct: 0.10,
            min_risk_reward: 2.0,
            enforce_exit_levels: true,
        }
    }
}

/// Stop-loss and take-profit prices attached to an intent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitLevels {
    pub stop_loss_price: f64,
    pub take_profit_price: f64,
}

impl ExitLevels {
    /// Exit triggered by `close` for a Long position, stop checked first.
    pub fn long_exit(&self, close: f64) -> Option<ExitReason> {
        if close <= self.stop_loss_price {
            Some(ExitReason::StopLoss)
        } else if close >= self.take_profit_price {
            Some(ExitReason::TakeProfit)
        } else {
            None
        }
    }
}

/// A sized, directional order request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub direction: Action,
    /// Fraction of current cash to commit, in (0, 1].
    pub size_fraction: f64,
    pub stop_loss_price: f64,
    pub take_profit_price: f64,
}

impl RiskPolicy {
    pub fn validate(&self) -> Result<(), RiskError> {
        let f = self.max_position_fraction;
        if !(f > 0.0 && f <= 1.0) {
            return Err(RiskError::InvalidPositionFraction(f));
        }
        if !(self.stop_loss_pct > 0.0 && self.stop_loss_pct < 1.0) {
            return Err(RiskError::InvalidStopLoss(self.stop_loss_pct));
        }
        if !(self.take_profit_pct.is_finite() && self.take_profit_pct > 0.0) {
            return Err(RiskError::InvalidTakeProfit(self.take_profit_pct));
        }
        if !(self.min_risk_reward.is_finite() && self.min_risk_reward >= 0.0) {
            return Err(RiskError::InvalidRiskReward(self.min_risk_reward));
        }
        Ok(())
    }

    pub fn risk_reward(&self) -> f64 {
        self.take_profit_pct / self.stop_loss_pct
    }

    /// Turn a fused signal into an order intent at `reference_price`.
    ///
    /// Hold signals and zero confidence produce nothing.
    pub fn size(&self, signal: &EnsembleSignal, reference_price: f64) -> Option<OrderIntent> {
        if signal.action == Action::Hold || signal.confidence <= 0.0 {
            return None;
        }
        let mut size_fraction = self.max_position_fraction * signal.confidence;
        if self.risk_reward() < self.min_risk_reward {
            size_fraction *= 0.5;
        }
        let levels = self.exit_levels(signal.action, reference_price);
        Some(OrderIntent {
            direction: signal.action,
            size_fraction: size_fraction.min(1.0),
            stop_loss_price: levels.stop_loss_price,
            take_profit_price: levels.take_profit_price,
        })
    }

    /// Stop and target around `entry_price`: below/above for Buy, mirrored
    /// for Sell.
    pub fn exit_levels(&self, direction: Action, entry_price: f64) -> ExitLevels {
        match direction {
            Action::Buy => ExitLevels {
                stop_loss_price: entry_price * (1.0 - self.stop_loss_pct),
                take_profit_price: entry_price * (1.0 + self.take_profit_pct),
            },
            _ => ExitLevels {
                stop_loss_price: entry_price * (1.0 + self.stop_loss_pct),
                take_profit_price: entry_price * (1.0 - self.take_profit_pct),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(action: Action, confidence: f64) -> EnsembleSignal {
        EnsembleSignal {
            action,
            strength: confidence,
            confidence,
            contributing_sources: Vec::new(),
            raw_score: action.sign() * confidence,
        }
    }

    #[test]
    fn buy_intent_levels_and_size() {
        let intent = RiskPolicy::default().size(&signal(Action::Buy, 0.5), 100.0).unwrap();
        assert_eq!(intent.direction, Action::Buy);
        assert!((intent.size_fraction - 0.475).abs() < 1e-12);
        assert!((intent.stop_loss_price - 95.0).abs() < 1e-9);
        assert!((intent.take_profit_price - 110.0).abs() < 1e-9);
    }

    #[test]
    fn sell_levels_are_mirrored() {
        let intent = RiskPolicy::default().size(&signal(Action::Sell, 1.0), 100.0).unwrap();
        assert!((intent.stop_loss_price - 105.0).abs() < 1e-9);
        assert!((intent.take_profit_price - 90.0).abs() < 1e-9);
    }

    #[test]
    fn poor_reward_ratio_halves_size() {
        let policy = RiskPolicy {
            take_profit_pct: 0.05,
            ..RiskPolicy::default()
        };
        let intent = policy.size(&signal(Action::Buy, 1.0), 100.0).unwrap();
        assert!((intent.size_fraction - 0.475).abs() < 1e-12);
    }

    #[test]
    fn hold_and_zero_confidence_produce_nothing() {
        let policy = RiskPolicy::default();
        assert!(policy.size(&signal(Action::Hold, 0.9), 100.0).is_none());
        assert!(policy.size(&signal(Action::Buy, 0.0), 100.0).is_none());
    }

    #[test]
    fn exit_levels_follow_the_entry_price() {
        let levels = RiskPolicy::default().exit_levels(Action::Buy, 101.0);
        assert!((levels.stop_loss_price - 95.95).abs() < 1e-9);
        assert!((levels.take_profit_price - 111.1).abs() < 1e-9);
    }

    #[test]
    fn long_exit_levels() {
        let levels = ExitLevels {
            stop_loss_price: 95.0,
            take_profit_price: 110.0,
        };
        assert_eq!(levels.long_exit(94.0), Some(ExitReason::StopLoss));
        assert_eq!(levels.long_exit(95.0), Some(ExitReason::StopLoss));
        assert_eq!(levels.long_exit(110.0), Some(ExitReason::TakeProfit));
        assert_eq!(levels.long_exit(100.0), None);
    }

    #[test]
    fn validation() {
        assert!(RiskPolicy::default().validate().is_ok());
        let bad = RiskPolicy {
            max_position_fraction: 1.5,
            ..RiskPolicy::default()
        };
        assert_eq!(bad.validate(), Err(RiskError::InvalidPositionFraction(1.5)));
        let bad = RiskPolicy {
            stop_loss_pct: 0.0,
            ..RiskPolicy::default()
        };
        assert!(matches!(bad.validate(), Err(RiskError::InvalidStopLoss(_))));
    }
}
