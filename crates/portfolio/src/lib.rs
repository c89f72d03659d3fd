//! Per-experiment financial ledger: cash plus FIFO cost-basis positions.
//!
//! [`PortfolioManager`] is the sole mutator of a position's lot queue;
//! `updatePosition`-style holding syncs only touch the aggregate view and
//! mark the position for lazy lot reconstruction on the next trade.

pub mod error;
pub mod manager;

pub use error::PortfolioError;
pub use manager::{PortfolioManager, TradeOutcome};
