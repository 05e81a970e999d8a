//! Signals: one directional recommendation per source per bar, and their fusion.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    /// +1 for Buy, -1 for Sell, 0 for Hold.
    pub fn sign(self) -> f64 {
        match self {
            Action::Buy => 1.0,
            Action::Sell => -1.0,
            Action::Hold => 0.0,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        };
        f.write_str(s)
    }
}

/// Identity of a prediction source (e.g. "model", "technical", "sentiment").
///
/// Ordered so it can key a `BTreeMap` and serialize deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub String);

impl SourceId {
    pub const MODEL: &'static str = "model";
    pub const TECHNICAL: &'static str = "technical";
    pub const SENTIMENT: &'static str = "sentiment";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn model() -> Self {
        Self::new(Self::MODEL)
    }

    pub fn technical() -> Self {
        Self::new(Self::TECHNICAL)
    }

    pub fn sentiment() -> Self {
        Self::new(Self::SENTIMENT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output of one source for one bar.
///
/// `available == false` means the source had nothing to say (failure, timeout,
/// missing data). Such signals are excluded from fusion, never read as Hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub action: Action,
    pub strength: f64,
    pub source: SourceId,
    pub available: bool,
}

impl Signal {
    pub fn new(source: SourceId, action: Action, strength: f64) -> Self {
        Self {
            action,
            strength,
            source,
            available: true,
        }
    }

    pub fn buy(source: SourceId, strength: f64) -> Self {
        Self::new(source, Action::Buy, strength)
    }

    pub fn sell(source: SourceId, strength: f64) -> Self {
        Self::new(source, Action::Sell, strength)
    }

    pub fn hold(source: SourceId) -> Self {
        Self::new(source, Action::Hold, 0.0)
    }

    pub fn unavailable(source: SourceId) -> Self {
        Self {
            action: Action::Hold,
            strength: 0.0,
            source,
            available: false,
        }
    }

    /// Signed score in [-1, 1]: Buy → +strength, Sell → -strength, Hold → 0.
    pub fn score(&self) -> f64 {
        self.action.sign() * self.strength
    }
}

/// Fused decision for one bar. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleSignal {
    pub action: Action,
    pub strength: f64,
    pub confidence: f64,
    pub contributing_sources: Vec<SourceId>,
    pub raw_score: f64,
}

impl EnsembleSignal {
    /// The "nothing to do" decision: Hold with zero confidence and no sources.
    pub fn neutral() -> Self {
        Self {
            action: Action::Hold,
            strength: 0.0,
            confidence: 0.0,
            contributing_sources: Vec::new(),
            raw_score: 0.0,
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.action != Action::Hold && self.confidence > 0.0
    }
}
