//! Backtest result: created once at the end of a run and never mutated.
//!
//! Contains no wall-clock data and only ordered maps, so two runs with the
//! same bars, config and seed serialize to identical bytes.

use std::collections::BTreeMap;

use fusionlab_core::domain::{EquityPoint, SourceId, Trade};
use serde::{Deserialize, Serialize};

use crate::config::BacktestConfig;
use crate::metrics::{DetailedMetrics, SummaryMetrics};

/// Current schema version for serialized results.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    pub strategy: String,
    pub summary: SummaryMetrics,
    pub detailed: DetailedMetrics,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub config_snapshot: BacktestConfig,
    /// BLAKE3 digest of `config_snapshot`.
    pub config_fingerprint: String,
    pub diagnostics: RunDiagnostics,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Counters describing what happened during the bar loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub bar_count: usize,
    /// Bars before the first decision.
    pub warmup_bars: usize,
    /// Bars on which the strategy produced a decision.
    pub decision_bars: usize,
    /// Bars whose signal broke the strength contract and were held.
    pub rejected_signals: usize,
    /// Opens the simulator declined (no whole share, below minimum, no cash).
    pub rejected_opens: usize,
    /// Per expected source, decision bars on which it did not contribute.
    pub missing_source_bars: BTreeMap<SourceId, usize>,
    pub stop_loss_exits: usize,
    pub take_profit_exits: usize,
}

impl BacktestResult {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
