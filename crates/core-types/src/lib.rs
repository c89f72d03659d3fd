//! # Core Types
//!
//! Layer 0 of the workspace: the shared vocabulary every other crate builds
//! on. This crate has no knowledge of databases, HTTP, or execution — it is a
//! pure data-and-domain-rule crate, the way `strategies` describes itself in
//! this workspace's sibling crates.
//!
//! ## Public API
//!
//! - `Experiment`, `Token`, `CardAllocation`: the entities the engine mutates
//!   each round.
//! - `Position`, `Lot`, `Portfolio`: the financial ledger.
//! - `TradeSignal`, `Trade`, `TimeSeriesRecord`, `PortfolioSnapshot`: the
//!   records the engine emits for persistence.
//! - `address`, `chain`: the canonicalization helpers shared by every crate
//!   that keys data by (address, blockchain).

pub mod address;
pub mod chain;
pub mod enums;
pub mod error;
pub mod experiment;
pub mod ledger;
pub mod signal;
pub mod token;

pub use enums::{ExperimentStatus, Mode, TokenStatus, TradeAction};
pub use error::CoreError;
pub use experiment::{Experiment, ExperimentConfig, PositionManagementConfig, WalletConfig};
pub use ledger::{Lot, Portfolio, Position};
pub use signal::{PortfolioSnapshot, TimeSeriesRecord, Trade, TradeSignal};
pub use token::{CardAllocation, MarketMetrics, RiskData, Token};
