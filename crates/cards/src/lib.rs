//! Card-based position sizing.
//!
//! A token's capital is split into `total_cards` indivisible units, each
//! worth `per_card_native` in the experiment's native currency. Buying and
//! selling moves cards between the native and token pools rather than
//! tracking a continuous balance; [`CardPositionManager`] is the only thing
//! allowed to move them.

pub mod error;
pub mod manager;

pub use error::CardError;
pub use manager::{CardPositionManager, SellCards};
