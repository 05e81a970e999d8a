use super::position::PositionState;
use serde::{Deserialize, Serialize};

/// One point of the equity curve, produced once per bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    pub total_value: f64,
    pub cumulative_return: f64,
    pub peak_equity: f64,
    pub drawdown: f64,
    pub position_state: PositionState,
}
