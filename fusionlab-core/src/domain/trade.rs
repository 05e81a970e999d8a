//! Trade: immutable record emitted on every open and close.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
    EndOfData,
}

/// One execution. Sell records carry the realized PnL of the round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub side: TradeSide,
    pub bar_index: usize,
    pub timestamp: i64,
    /// Execution price, slippage included.
    pub price: f64,
    pub shares: u64,
    /// `shares * price`, before fees.
    pub cost: f64,
    pub fees: f64,
    /// Currency amount lost to slippage on this execution.
    pub slippage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,
    /// Timestamp difference between entry and exit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_bars: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_reason: Option<ExitReason>,
}

impl Trade {
    pub fn is_close(&self) -> bool {
        self.side == TradeSide::Sell
    }

    /// True for a closing trade with strictly positive PnL.
    pub fn is_winner(&self) -> bool {
        self.pnl.is_some_and(|p| p > 0.0)
    }
}
