//! The set of observed tokens and their mutable per-token state.
//!
//! Every lookup normalizes through `core_types::address::key` before
//! touching the map, so EVM casing variants and Solana's case-sensitive
//! Base58 addresses both collapse onto one canonical key (spec §4.1, §9).

pub mod error;
pub mod pool;

pub use error::TokenPoolError;
pub use pool::{PriceUpdate, TokenKey, TokenPool};
