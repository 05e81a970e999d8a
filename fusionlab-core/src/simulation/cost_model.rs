//! Cost model: slippage and transaction fees.
//!
//! Slippage is directional: buyers pay more, sellers receive less. Per share
//! it is `sign * price * slippage_factor * (1 + jitter)` with `jitter` drawn
//! uniformly from `[-slippage_jitter, +slippage_jitter]`. Since
//! `slippage_jitter <= 1` the amount never turns in the trader's favour.
//! Fees are `notional * transaction_cost_rate`, charged on both sides.

use crate::domain::TradeSide;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CostError {
    #[error("transaction_cost_rate must be in [0, 1), got {0}")]
    InvalidTransactionCost(f64),

    #[error("slippage_factor must be in [0, 0.5), got {0}")]
    InvalidSlippage(f64),

    #[error("slippage_jitter must be in [0, 1], got {0}")]
    InvalidJitter(f64),

    #[error("minimum_trade_size must be finite and non-negative, got {0}")]
    InvalidMinimumTrade(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    /// Fee per side as a fraction of notional.
    pub transaction_cost_rate: f64,
    /// Adverse price move per execution as a fraction of price.
    pub slippage_factor: f64,
    /// Relative half-width of the uniform jitter on slippage.
    pub slippage_jitter: f64,
    /// Opens whose cost plus fees fall below this are skipped.
    pub minimum_trade_size: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            transaction_cost_rate: 0.001,
            slippage_factor: 0.0005,
            slippage_jitter: 0.0,
            minimum_trade_size: 0.0,
        }
    }
}

impl CostModel {
    pub fn frictionless() -> Self {
        Self {
            transaction_cost_rate: 0.0,
            slippage_factor: 0.0,
            slippage_jitter: 0.0,
            minimum_trade_size: 0.0,
        }
    }

    pub fn validate(&self) -> Result<(), CostError> {
        let r = self.transaction_cost_rate;
        if !(0.0..1.0).contains(&r) {
            return Err(CostError::InvalidTransactionCost(r));
        }
        if !(0.0..0.5).contains(&self.slippage_factor) {
            return Err(CostError::InvalidSlippage(self.slippage_factor));
        }
        if !(0.0..=1.0).contains(&self.slippage_jitter) {
            return Err(CostError::InvalidJitter(self.slippage_jitter));
        }
        if !(self.minimum_trade_size.is_finite() && self.minimum_trade_size >= 0.0) {
            return Err(CostError::InvalidMinimumTrade(self.minimum_trade_size));
        }
        Ok(())
    }

    /// Signed per-share slippage: positive for buys, negative for sells.
    ///
    /// Consumes one draw from `rng` only when jitter is enabled.
    pub fn slippage<R: Rng + ?Sized>(&self, side: TradeSide, price: f64, rng: &mut R) -> f64 {
        if self.slippage_factor == 0.0 {
            return 0.0;
        }
        let jitter = if self.slippage_jitter > 0.0 {
            rng.gen_range(-self.slippage_jitter..=self.slippage_jitter)
        } else {
            0.0
        };
        let sign = match side {
            TradeSide::Buy => 1.0,
            TradeSide::Sell => -1.0,
        };
        sign * price * self.slippage_factor * (1.0 + jitter)
    }

    /// Fee for one execution of `notional`.
    pub fn fees(&self, notional: f64) -> f64 {
        notional * self.transaction_cost_rate
    }
}
