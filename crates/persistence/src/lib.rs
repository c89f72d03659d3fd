//! CRUD over the seven tables spec §6 names (`experiments`, `tokens`,
//! `strategy_signals`, `trades`, `runtime_metrics`, `portfolio_snapshots`,
//! `experiment_time_series_data`), behind the `Persistence` trait the engine
//! depends on. `Postgres` is the `sqlx`-backed implementation;
//! `InMemoryPersistence` is a test double.
//!
//! Follows `database`'s "Layer 3 adapter" framing, inverted: there the
//! concrete `DbRepository` sits below `engine`; here `engine` depends only on
//! the `Persistence` trait, consistent with spec §6 treating persistence as
//! an injected narrow-contract collaborator like the trader or market-data
//! API.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod traits;
pub mod types;

pub use error::PersistenceError;
pub use memory::InMemoryPersistence;
pub use postgres::Postgres;
pub use traits::Persistence;
pub use types::{RuntimeMetric, SignalFilter, TradeFilter};
