use serde::{Deserialize, Serialize};

/// Current holding for the single simulated instrument.
///
/// `Short` is part of the model but the simulator never opens one: a Sell
/// intent while Flat is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Position {
    Flat,
    Long {
        entry_price: f64,
        entry_time: i64,
        entry_bar: usize,
        shares: u64,
        /// Cash spent to open, fees included.
        cost_basis: f64,
    },
    Short {
        entry_price: f64,
        entry_time: i64,
        entry_bar: usize,
        shares: u64,
        cost_basis: f64,
    },
}

/// Compact position tag stored on every equity point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionState {
    Flat,
    Long,
    Short,
}

impl Position {
    pub fn is_flat(&self) -> bool {
        matches!(self, Position::Flat)
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Position::Long { .. })
    }

    pub fn shares(&self) -> u64 {
        match self {
            Position::Flat => 0,
            Position::Long { shares, .. } | Position::Short { shares, .. } => *shares,
        }
    }

    pub fn state(&self) -> PositionState {
        match self {
            Position::Flat => PositionState::Flat,
            Position::Long { .. } => PositionState::Long,
            Position::Short { .. } => PositionState::Short,
        }
    }

    /// Signed market value at `price`.
    pub fn market_value(&self, price: f64) -> f64 {
        match self {
            Position::Flat => 0.0,
            Position::Long { shares, .. } => *shares as f64 * price,
            Position::Short { shares, .. } => -(*shares as f64) * price,
        }
    }
}
