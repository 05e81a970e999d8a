//! Domain types for the FusionLab engine.

pub mod bar;
pub mod equity;
pub mod portfolio;
pub mod position;
pub mod signal;
pub mod trade;

pub use bar::{validate_series, BarError, DataIntegrityError, MarketBar};
pub use equity::EquityPoint;
pub use portfolio::Portfolio;
pub use position::{Position, PositionState};
pub use signal::{Action, EnsembleSignal, Signal, SourceId};
pub use trade::{ExitReason, Trade, TradeSide};

/// Symbol type alias
pub type Symbol = String;
