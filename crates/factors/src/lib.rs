//! Derives the fixed-key factor map the strategy engine evaluates
//! expressions over (spec §4.5).
//!
//! Every factor this crate produces is a plain `f64` — strategy conditions
//! treat numeric literals as doubles (spec §4.4), so the map is built once
//! in that representation rather than converted per comparison.

pub mod builder;

pub use builder::{FactorBuilder, FactorMap, FACTOR_KEYS};
