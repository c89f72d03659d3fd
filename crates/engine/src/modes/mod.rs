//! The three concrete `ModeAdapter` implementations (spec §4.7).

pub mod backtest;
pub mod live;
pub mod virtual_mode;

pub use backtest::BacktestAdapter;
pub use live::LiveAdapter;
pub use virtual_mode::VirtualAdapter;
