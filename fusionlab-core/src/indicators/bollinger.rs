//! Bollinger Bands: moving average +/- standard deviation multiplier.
//!
//! - Middle: SMA(close, period)
//! - Upper/Lower: middle +/- mult * stddev(close, period)
//! - PercentB: (close - lower) / (upper - lower), 0.5 when the band has no width
//!
//! Uses sample stddev (divide by N - 1); a period of 1 has zero width.
//! Lookback: period - 1.

use super::{closes, Indicator};
use crate::domain::MarketBar;

/// Which band an `Indicator` instance exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
    PercentB,
}

/// All band values at one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerPoint {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub percent_b: f64,
}

impl BollingerPoint {
    fn nan() -> Self {
        Self {
            upper: f64::NAN,
            middle: f64::NAN,
            lower: f64::NAN,
            percent_b: f64::NAN,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64, band: BollingerBand) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        let tag = match band {
            BollingerBand::Upper => "upper",
            BollingerBand::Middle => "middle",
            BollingerBand::Lower => "lower",
            BollingerBand::PercentB => "pctb",
        };
        Self {
            period,
            multiplier,
            band,
            name: format!("bollinger_{tag}_{period}_{multiplier}"),
        }
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[MarketBar]) -> Vec<f64> {
        bollinger_of_series(&closes(bars), self.period, self.multiplier)
            .into_iter()
            .map(|p| match self.band {
                BollingerBand::Upper => p.upper,
                BollingerBand::Middle => p.middle,
                BollingerBand::Lower => p.lower,
                BollingerBand::PercentB => p.percent_b,
            })
            .collect()
    }
}

pub fn bollinger_of_series(values: &[f64], period: usize, multiplier: f64) -> Vec<BollingerPoint> {
    let n = values.len();
    let mut result = vec![BollingerPoint::nan(); n];
    if period == 0 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = window.iter().sum::<f64>() / period as f64;
        let stddev = if period > 1 {
            let ss: f64 = window.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (period - 1) as f64).sqrt()
        } else {
            0.0
        };
        let upper = mean + multiplier * stddev;
        let lower = mean - multiplier * stddev;
        let width = upper - lower;
        let percent_b = if width > 0.0 {
            (values[i] - lower) / width
        } else {
            0.5
        };
        result[i] = BollingerPoint {
            upper,
            middle: mean,
            lower,
            percent_b,
        };
    }
    result
}
