//! Portfolio: cash plus the single open position.

use super::position::Position;
use serde::{Deserialize, Serialize};

/// Aggregate portfolio state.
///
/// Owned by the portfolio simulator; only its open/close operations mutate it.
/// The equity identity `equity == cash + shares * close` must hold at every bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub cash: f64,
    pub position: Position,
    pub realized_pnl: f64,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            position: Position::Flat,
            realized_pnl: 0.0,
        }
    }

    /// Total equity marked at `price`.
    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.position.market_value(price)
    }
}
