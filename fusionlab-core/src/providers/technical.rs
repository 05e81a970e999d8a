//! Technical-rule provider: RSI, MACD histogram and Bollinger %B vote.
//!
//! Each indicator casts +1 (buy), -1 (sell) or 0 at the current bar:
//! - RSI below `rsi_oversold` buys, above `rsi_overbought` sells
//! - MACD histogram sign
//! - %B below `percent_b_low` buys, above `percent_b_high` sells
//!
//! The signal is the mean vote: its sign picks the action, its magnitude is
//! the strength. Indicators are computed over a trailing window of `window`
//! bars, so EMA-based values depend on where that window starts.

use super::{ProviderError, SignalContext, SignalProvider};
use crate::domain::{Action, Signal, SourceId};
use crate::indicators::{bollinger_of_series, macd_of_series, rsi_of_series, RsiSmoothing};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalConfig {
    pub rsi_period: usize,
    pub rsi_smoothing: RsiSmoothing,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_multiplier: f64,
    pub percent_b_low: f64,
    pub percent_b_high: f64,
    /// Trailing bars fed to the indicators on each prediction.
    pub window: usize,
}

impl Default for TechnicalConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_smoothing: RsiSmoothing::Simple,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_multiplier: 2.0,
            percent_b_low: 0.2,
            percent_b_high: 0.8,
            window: 200,
        }
    }
}

impl TechnicalConfig {
    /// Bars before every indicator has a value.
    pub fn lookback(&self) -> usize {
        let macd = (self.macd_slow + self.macd_signal).saturating_sub(2);
        self.rsi_period
            .max(macd)
            .max(self.bollinger_period.saturating_sub(1))
    }

    /// Human-readable problems with the parameters, empty when valid.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.rsi_period == 0 || self.bollinger_period == 0 || self.macd_signal == 0 {
            problems.push("indicator periods must be >= 1".to_string());
        }
        if self.macd_fast == 0 || self.macd_fast >= self.macd_slow {
            problems.push(format!(
                "macd_fast ({}) must be >= 1 and below macd_slow ({})",
                self.macd_fast, self.macd_slow
            ));
        }
        if self.rsi_oversold >= self.rsi_overbought {
            problems.push("rsi_oversold must be below rsi_overbought".to_string());
        }
        if self.percent_b_low >= self.percent_b_high {
            problems.push("percent_b_low must be below percent_b_high".to_string());
        }
        if !(self.bollinger_multiplier.is_finite() && self.bollinger_multiplier > 0.0) {
            problems.push("bollinger_multiplier must be positive".to_string());
        }
        problems
    }
}

#[derive(Debug, Clone, Default)]
pub struct TechnicalProvider {
    config: TechnicalConfig,
}

impl TechnicalProvider {
    pub fn new(config: TechnicalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TechnicalConfig {
        &self.config
    }

    fn votes(&self, closes: &[f64]) -> Vec<f64> {
        let c = &self.config;
        let last = closes.len() - 1;
        let mut votes = Vec::with_capacity(3);

        let rsi = rsi_of_series(closes, c.rsi_period, c.rsi_smoothing)[last];
        if !rsi.is_nan() {
            votes.push(if rsi < c.rsi_oversold {
                1.0
            } else if rsi > c.rsi_overbought {
                -1.0
            } else {
                0.0
            });
        }

        let hist = macd_of_series(closes, c.macd_fast, c.macd_slow, c.macd_signal).histogram[last];
        if !hist.is_nan() {
            votes.push(if hist > 0.0 {
                1.0
            } else if hist < 0.0 {
                -1.0
            } else {
                0.0
            });
        }

        let pct_b = bollinger_of_series(closes, c.bollinger_period, c.bollinger_multiplier)[last].percent_b;
        if !pct_b.is_nan() {
            votes.push(if pct_b < c.percent_b_low {
                1.0
            } else if pct_b > c.percent_b_high {
                -1.0
            } else {
                0.0
            });
        }
        votes
    }
}

impl SignalProvider for TechnicalProvider {
    fn source(&self) -> SourceId {
        SourceId::technical()
    }

    fn lookback(&self) -> usize {
        self.config.lookback()
    }

    fn predict(&self, ctx: &SignalContext) -> Result<Signal, ProviderError> {
        let history = ctx.history();
        let span = self.config.window.max(self.lookback() + 1);
        let start = history.len().saturating_sub(span);
        let closes: Vec<f64> = history[start..].iter().map(|b| b.close).collect();

        let votes = self.votes(&closes);
        if votes.is_empty() {
            return Err(ProviderError::unavailable(self.source(), "indicators warming up"));
        }
        let mean = votes.iter().sum::<f64>() / votes.len() as f64;
        let action = if mean > 0.0 {
            Action::Buy
        } else if mean < 0.0 {
            Action::Sell
        } else {
            Action::Hold
        };
        Ok(Signal::new(self.source(), action, mean.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::context_from_closes;

    #[test]
    fn default_lookback_is_macd_signal_warmup() {
        assert_eq!(TechnicalConfig::default().lookback(), 33);
        assert!(TechnicalConfig::default().problems().is_empty());
    }

    #[test]
    fn too_short_history_is_unavailable() {
        let ctx = context_from_closes(&[100.0; 5]);
        let err = TechnicalProvider::default().predict(&ctx).unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable { .. }));
    }

    #[test]
    fn crash_after_flat_votes_buy() {
        // Long flat stretch then a steep drop: RSI oversold and %B below the
        // lower band, MACD histogram negative.
        let mut closes = vec![100.0; 60];
        closes.extend((1..=8).map(|i| 100.0 - 4.0 * i as f64));
        let signal = TechnicalProvider::default()
            .predict(&context_from_closes(&closes))
            .unwrap();
        assert_eq!(signal.action, Action::Buy);
        assert!((signal.strength - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn rally_after_flat_votes_sell() {
        let mut closes = vec![100.0; 60];
        closes.extend((1..=8).map(|i| 100.0 + 4.0 * i as f64));
        let signal = TechnicalProvider::default()
            .predict(&context_from_closes(&closes))
            .unwrap();
        assert_eq!(signal.action, Action::Sell);
        assert!(signal.strength > 0.0 && signal.strength <= 1.0);
    }

    #[test]
    fn flat_market_holds() {
        let signal = TechnicalProvider::default()
            .predict(&context_from_closes(&[100.0; 80]))
            .unwrap();
        assert_eq!(signal.action, Action::Hold);
        assert_eq!(signal.strength, 0.0);
    }

    #[test]
    fn inverted_thresholds_are_reported() {
        let config = TechnicalConfig {
            rsi_oversold: 80.0,
            ..TechnicalConfig::default()
        };
        assert_eq!(config.problems().len(), 1);
    }
}
