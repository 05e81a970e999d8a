//! MarketBar: the fundamental market data unit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for a single instrument over one fixed interval.
///
/// `timestamp` is an opaque monotonic integer supplied by the caller (epoch
/// seconds or milliseconds); the engine only compares and subtracts it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketBar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Why a single bar is malformed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("non-finite price or volume")]
    NonFinite,
    #[error("non-positive price")]
    NonPositivePrice,
    #[error("negative volume {0}")]
    NegativeVolume(f64),
    #[error("high {high} below low {low}")]
    HighBelowLow { high: f64, low: f64 },
    #[error("timestamp {current} does not follow previous timestamp {previous}")]
    NonMonotonicTimestamp { previous: i64, current: i64 },
    #[error("bar series is empty")]
    EmptySeries,
}

/// A malformed bar, reported with its position in the series.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("data integrity error at bar {index}: {kind}")]
pub struct DataIntegrityError {
    pub index: usize,
    pub kind: BarError,
}

impl MarketBar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// A flat bar where every price equals `close`. Handy for close-only feeds.
    pub fn from_close(timestamp: i64, close: f64) -> Self {
        Self::new(timestamp, close, close, close, close, 0.0)
    }

    /// Per-bar sanity check. Does not look at neighbouring bars.
    pub fn validate(&self) -> Result<(), BarError> {
        let fields = [
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
        ];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(BarError::NonFinite);
        }
        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0 {
            return Err(BarError::NonPositivePrice);
        }
        if self.volume < 0.0 {
            return Err(BarError::NegativeVolume(self.volume));
        }
        if self.high < self.low {
            return Err(BarError::HighBelowLow {
                high: self.high,
                low: self.low,
            });
        }
        Ok(())
    }
}

/// Validate a whole series: every bar sane, timestamps strictly increasing.
///
/// The engine never reorders or deduplicates; the first offending bar aborts.
pub fn validate_series(bars: &[MarketBar]) -> Result<(), DataIntegrityError> {
    if bars.is_empty() {
        return Err(DataIntegrityError {
            index: 0,
            kind: BarError::EmptySeries,
        });
    }
    for (index, bar) in bars.iter().enumerate() {
        bar.validate()
            .map_err(|kind| DataIntegrityError { index, kind })?;
        if index > 0 {
            let previous = bars[index - 1].timestamp;
            if bar.timestamp <= previous {
                return Err(DataIntegrityError {
                    index,
                    kind: BarError::NonMonotonicTimestamp {
                        previous,
                        current: bar.timestamp,
                    },
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> MarketBar {
        MarketBar::new(1_700_000_000, 100.0, 105.0, 98.0, 103.0, 50_000.0)
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().validate().is_ok());
    }

    #[test]
    fn bar_detects_nan() {
        let mut bar = sample_bar();
        bar.open = f64::NAN;
        assert_eq!(bar.validate(), Err(BarError::NonFinite));
    }

    #[test]
    fn bar_detects_negative_price() {
        let mut bar = sample_bar();
        bar.low = -1.0;
        assert_eq!(bar.validate(), Err(BarError::NonPositivePrice));
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar();
        bar.high = 97.0; // below low
        assert!(matches!(bar.validate(), Err(BarError::HighBelowLow { .. })));
    }

    #[test]
    fn series_rejects_repeated_timestamp() {
        let bars = vec![sample_bar(), sample_bar()];
        let err = validate_series(&bars).unwrap_err();
        assert_eq!(err.index, 1);
        assert!(matches!(err.kind, BarError::NonMonotonicTimestamp { .. }));
    }

    #[test]
    fn series_reports_offending_index() {
        let mut bars: Vec<MarketBar> = (0..5)
            .map(|i| MarketBar::from_close(i, 100.0 + i as f64))
            .collect();
        bars[3].close = 0.0;
        let err = validate_series(&bars).unwrap_err();
        assert_eq!(err.index, 3);
        assert_eq!(err.kind, BarError::NonPositivePrice);
    }

    #[test]
    fn empty_series_is_an_error() {
        assert_eq!(validate_series(&[]).unwrap_err().kind, BarError::EmptySeries);
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let deser: MarketBar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
