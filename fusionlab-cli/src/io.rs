//! CSV input for bars and external signal series.
//!
//! Timestamps may be plain integers (used as-is), `YYYY-MM-DD` dates or
//! RFC 3339 datetimes; dates and datetimes become Unix seconds (UTC).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate};
use fusionlab_core::domain::{validate_series, MarketBar};
use fusionlab_runner::SignalInputs;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct BarRecord {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[derive(Debug, Deserialize)]
struct SignalRecord {
    timestamp: String,
    #[serde(default)]
    model_probability: Option<f64>,
    #[serde(default)]
    sentiment: Option<f64>,
}

/// Parse a timestamp cell into the engine's opaque integer time.
pub fn parse_timestamp(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(n);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc().timestamp());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp());
    }
    bail!("unrecognized timestamp '{raw}'")
}

/// Load and validate a bar series.
pub fn read_bars(path: &Path) -> Result<Vec<MarketBar>> {
    let mut reader = csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let mut bars = Vec::new();
    for (row, record) in reader.deserialize::<BarRecord>().enumerate() {
        let r = record.with_context(|| format!("{}: row {}", path.display(), row + 1))?;
        let ts = parse_timestamp(&r.timestamp).with_context(|| format!("{}: row {}", path.display(), row + 1))?;
        bars.push(MarketBar::new(ts, r.open, r.high, r.low, r.close, r.volume));
    }
    validate_series(&bars).with_context(|| format!("invalid bar series in {}", path.display()))?;
    Ok(bars)
}

/// Load per-timestamp model probabilities and sentiment. A column with no
/// values at all yields `None` for that input.
pub fn read_signals(path: &Path) -> Result<SignalInputs> {
    let mut reader = csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let mut model = BTreeMap::new();
    let mut sentiment = BTreeMap::new();
    for (row, record) in reader.deserialize::<SignalRecord>().enumerate() {
        let r = record.with_context(|| format!("{}: row {}", path.display(), row + 1))?;
        let ts = parse_timestamp(&r.timestamp).with_context(|| format!("{}: row {}", path.display(), row + 1))?;
        if let Some(p) = r.model_probability {
            model.insert(ts, p);
        }
        if let Some(s) = r.sentiment {
            sentiment.insert(ts, s);
        }
    }
    Ok(SignalInputs {
        model_probabilities: (!model.is_empty()).then_some(model),
        sentiment: (!sentiment.is_empty()).then_some(sentiment),
    })
}

/// One symbol's inputs discovered in a batch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolFiles {
    pub symbol: String,
    pub bars: PathBuf,
    pub signals: Option<PathBuf>,
}

/// `<SYMBOL>.csv` holds bars; an optional `<SYMBOL>.signals.csv` beside it
/// holds that symbol's signal series. Sorted by symbol.
pub fn discover_symbols(dir: &Path) -> Result<Vec<SymbolFiles>> {
    let entries = fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))?;
    let mut found = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.ends_with(".signals.csv") {
            continue;
        }
        let Some(symbol) = name.strip_suffix(".csv") else {
            continue;
        };
        let signals = dir.join(format!("{symbol}.signals.csv"));
        found.push(SymbolFiles {
            symbol: symbol.to_string(),
            bars: path.clone(),
            signals: signals.is_file().then_some(signals),
        });
    }
    found.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    Ok(found)
}
