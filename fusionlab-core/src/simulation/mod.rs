//! Simulated execution: cost model and portfolio state machine.

pub mod cost_model;
pub mod simulator;

pub use cost_model::{CostError, CostModel};
pub use simulator::{OpenRejection, PortfolioSimulator};
