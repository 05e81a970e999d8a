//! Portfolio simulator: the trade execution and accounting state machine.
//!
//! `Flat --open--> Long --close--> Flat`. The simulator owns cash, the
//! position and realized PnL; nothing else mutates them. Opens that cannot be
//! filled (no whole share, below the minimum trade, not enough cash) leave the
//! state untouched and report an [`OpenRejection`].

use super::cost_model::CostModel;
use crate::domain::{Action, ExitReason, MarketBar, Portfolio, Position, Trade, TradeSide};
use crate::risk::OrderIntent;
use rand::rngs::StdRng;
use std::fmt;

/// Why an open produced no trade.
#[derive(Debug, Clone, PartialEq)]
pub enum OpenRejection {
    /// A position is already held.
    AlreadyOpen,
    /// Only Buy intents open positions.
    UnsupportedDirection(Action),
    ZeroShares,
    BelowMinimumTrade { amount: f64, minimum: f64 },
    InsufficientFunds { required: f64, available: f64 },
}

impl fmt::Display for OpenRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenRejection::AlreadyOpen => write!(f, "position already open"),
            OpenRejection::UnsupportedDirection(a) => write!(f, "cannot open on {a}"),
            OpenRejection::ZeroShares => write!(f, "size rounds to zero shares"),
            OpenRejection::BelowMinimumTrade { amount, minimum } => {
                write!(f, "trade of {amount:.2} below minimum {minimum:.2}")
            }
            OpenRejection::InsufficientFunds {
                required,
                available,
            } => write!(f, "needs {required:.2}, has {available:.2}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PortfolioSimulator {
    portfolio: Portfolio,
    cost_model: CostModel,
    rng: StdRng,
    total_fees: f64,
    total_slippage: f64,
}

impl PortfolioSimulator {
    /// `rng` feeds slippage jitter; pass a seeded generator for reproducible runs.
    pub fn new(initial_capital: f64, cost_model: CostModel, rng: StdRng) -> Self {
        Self {
            portfolio: Portfolio::new(initial_capital),
            cost_model,
            rng,
            total_fees: 0.0,
            total_slippage: 0.0,
        }
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn position(&self) -> &Position {
        &self.portfolio.position
    }

    pub fn cash(&self) -> f64 {
        self.portfolio.cash
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    pub fn total_fees(&self) -> f64 {
        self.total_fees
    }

    pub fn total_slippage(&self) -> f64 {
        self.total_slippage
    }

    /// `cash + shares * bar.close`.
    pub fn value(&self, bar: &MarketBar) -> f64 {
        self.portfolio.equity(bar.close)
    }

    /// Open a Long sized by `intent` at the bar's close plus slippage.
    pub fn try_open(
        &mut self,
        intent: &OrderIntent,
        bar: &MarketBar,
        bar_index: usize,
    ) -> Result<Trade, OpenRejection> {
        if !self.portfolio.position.is_flat() {
            return Err(OpenRejection::AlreadyOpen);
        }
        if intent.direction != Action::Buy {
            return Err(OpenRejection::UnsupportedDirection(intent.direction));
        }

        // Jitter is drawn from a copy of the stream, committed only on a fill,
        // so a rejected open leaves the simulator untouched.
        let mut rng = self.rng.clone();
        let slip = self.cost_model.slippage(TradeSide::Buy, bar.close, &mut rng);
        let price = bar.close + slip;
        let cash = self.portfolio.cash;
        let budget = cash * intent.size_fraction;
        let shares = if price > 0.0 && budget > 0.0 {
            (budget / price).floor() as u64
        } else {
            0
        };
        if shares == 0 {
            return Err(OpenRejection::ZeroShares);
        }

        let cost = shares as f64 * price;
        let fees = self.cost_model.fees(cost);
        let required = cost + fees;
        if required < self.cost_model.minimum_trade_size {
            return Err(OpenRejection::BelowMinimumTrade {
                amount: required,
                minimum: self.cost_model.minimum_trade_size,
            });
        }
        if required > cash {
            return Err(OpenRejection::InsufficientFunds {
                required,
                available: cash,
            });
        }

        let slippage = slip.abs() * shares as f64;
        self.rng = rng;
        self.portfolio.cash = cash - required;
        self.portfolio.position = Position::Long {
            entry_price: price,
            entry_time: bar.timestamp,
            entry_bar: bar_index,
            shares,
            cost_basis: required,
        };
        self.total_fees += fees;
        self.total_slippage += slippage;

        Ok(Trade {
            side: TradeSide::Buy,
            bar_index,
            timestamp: bar.timestamp,
            price,
            shares,
            cost,
            fees,
            slippage,
            pnl: None,
            hold_duration: None,
            hold_bars: None,
            exit_reason: None,
        })
    }

    /// Like [`try_open`](Self::try_open), logging the rejection reason.
    pub fn open(&mut self, intent: &OrderIntent, bar: &MarketBar, bar_index: usize) -> Option<Trade> {
        match self.try_open(intent, bar, bar_index) {
            Ok(trade) => Some(trade),
            Err(reason) => {
                tracing::debug!(bar = bar_index, %reason, "open skipped");
                None
            }
        }
    }

    /// Sell the whole Long at the bar's close minus slippage. No-op when Flat.
    pub fn close(&mut self, bar: &MarketBar, bar_index: usize, reason: ExitReason) -> Option<Trade> {
        let Position::Long {
            entry_time,
            entry_bar,
            shares,
            cost_basis,
            ..
        } = self.portfolio.position
        else {
            return None;
        };

        let slip = self.cost_model.slippage(TradeSide::Sell, bar.close, &mut self.rng);
        let price = bar.close + slip;
        let proceeds = shares as f64 * price;
        let fees = self.cost_model.fees(proceeds);
        let pnl = (proceeds - fees) - cost_basis;
        let slippage = slip.abs() * shares as f64;

        self.portfolio.cash += proceeds - fees;
        self.portfolio.realized_pnl += pnl;
        self.portfolio.position = Position::Flat;
        self.total_fees += fees;
        self.total_slippage += slippage;

        Some(Trade {
            side: TradeSide::Sell,
            bar_index,
            timestamp: bar.timestamp,
            price,
            shares,
            cost: proceeds,
            fees,
            slippage,
            pnl: Some(pnl),
            hold_duration: Some(bar.timestamp - entry_time),
            hold_bars: Some(bar_index.saturating_sub(entry_bar)),
            exit_reason: Some(reason),
        })
    }
}
