//! Relative Strength Index (RSI).
//!
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss), over `period` price changes.
//! Two smoothings:
//! - `Simple` (default): rolling arithmetic mean of gains and losses.
//! - `Wilder`: seed with the simple mean, then `avg = (prev * (p-1) + x) / p`.
//!
//! Lookback: period.
//! Edge cases: no movement → 50; avg_loss == 0 → 100; avg_gain == 0 → 0.

use super::{closes, Indicator};
use crate::domain::MarketBar;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiSmoothing {
    #[default]
    Simple,
    Wilder,
}

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    smoothing: RsiSmoothing,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self::with_smoothing(period, RsiSmoothing::Simple)
    }

    pub fn with_smoothing(period: usize, smoothing: RsiSmoothing) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        let tag = match smoothing {
            RsiSmoothing::Simple => "",
            RsiSmoothing::Wilder => "_wilder",
        };
        Self {
            period,
            smoothing,
            name: format!("rsi{tag}_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[MarketBar]) -> Vec<f64> {
        rsi_of_series(&closes(bars), self.period, self.smoothing)
    }
}

pub fn rsi_of_series(values: &[f64], period: usize, smoothing: RsiSmoothing) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return result;
    }

    // changes[i] = values[i] - values[i-1]; changes[0] is undefined
    let changes: Vec<f64> = std::iter::once(f64::NAN)
        .chain(values.windows(2).map(|w| w[1] - w[0]))
        .collect();

    match smoothing {
        RsiSmoothing::Simple => {
            for i in period..n {
                let window = &changes[i + 1 - period..=i];
                if window.iter().any(|c| c.is_nan()) {
                    continue;
                }
                let (gain, loss) = split_changes(window);
                result[i] = compute_rsi(gain / period as f64, loss / period as f64);
            }
        }
        RsiSmoothing::Wilder => {
            let seed = &changes[1..=period];
            if seed.iter().any(|c| c.is_nan()) {
                return result;
            }
            let (gain, loss) = split_changes(seed);
            let mut avg_gain = gain / period as f64;
            let mut avg_loss = loss / period as f64;
            result[period] = compute_rsi(avg_gain, avg_loss);

            let p = period as f64;
            for i in (period + 1)..n {
                let ch = changes[i];
                if ch.is_nan() {
                    return result;
                }
                avg_gain = (avg_gain * (p - 1.0) + ch.max(0.0)) / p;
                avg_loss = (avg_loss * (p - 1.0) + (-ch).max(0.0)) / p;
                result[i] = compute_rsi(avg_gain, avg_loss);
            }
        }
    }
    result
}

/// Sum of positive changes and sum of absolute negative changes.
fn split_changes(changes: &[f64]) -> (f64, f64) {
    changes.iter().fold((0.0, 0.0), |(g, l), &c| {
        if c > 0.0 {
            (g + c, l)
        } else {
            (g, l - c)
        }
    })
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
