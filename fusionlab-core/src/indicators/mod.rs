//! Technical indicators as pure functions.
//!
//! Every indicator maps a bar series to an output series of the same length.
//! Warm-up positions hold `f64::NAN`; a value at bar t never depends on bars
//! after t. Each indicator also exposes a `*_of_series` function over plain
//! close prices so providers and tests can use them without building bars.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use bollinger::{bollinger_of_series, Bollinger, BollingerBand, BollingerPoint};
pub use ema::{ema_of_series, Ema};
pub use macd::{macd_of_series, Macd, MacdLine, MacdSeries};
pub use rsi::{rsi_of_series, Rsi, RsiSmoothing};
pub use sma::{sma_of_series, Sma};

use crate::domain::MarketBar;

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
/// Every indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "rsi_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[MarketBar]) -> Vec<f64>;
}

/// Close prices of a bar slice.
pub fn closes(bars: &[MarketBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Create synthetic bars from close prices for testing.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<MarketBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            MarketBar {
                timestamp: i as i64,
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
