//! The master orchestrator: the seven-step per-round pipeline
//! (`Scheduler<M>`), the `ModeAdapter` capability set the three modes
//! implement, and every error the scheduler distinguishes by policy
//! (spec §4.6, §4.7, §7).

pub mod adapter;
pub mod error;
pub mod modes;
pub mod scheduler;

pub use adapter::{ExecutionOutcome, ModeAdapter, TradeDispatchOutcome};
pub use error::EngineError;
pub use modes::{BacktestAdapter, LiveAdapter, VirtualAdapter};
pub use scheduler::Scheduler;
