//! Round-summary events and the broadcast channel they're published on
//! (spec §4.6 step 7, SPEC_FULL §4A). As in the teacher repo, this is a
//! Layer 0 crate depending only on `core-types`'s sibling vocabulary (here,
//! just `chrono`/`uuid`/`serde`) — no knowledge of the scheduler that
//! produces these events or of any consumer.

pub mod bus;
pub mod error;
pub mod messages;

pub use bus::EventBus;
pub use error::EventsError;
pub use messages::{RoundSummary, RoundSummaryBuilder};
