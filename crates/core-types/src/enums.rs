use serde::{Deserialize, Serialize};

/// The three operational modes a single `Experiment` can run in.
///
/// They share the same `AbstractEngine` pipeline (see the `engine` crate) and
/// differ only in where holdings, prices and order settlement come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Virtual,
    Backtest,
    Live,
}

/// Lifecycle status of an `Experiment`. The engine is the sole writer once
/// the experiment has left `Initializing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    Initializing,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl ExperimentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExperimentStatus::Completed | ExperimentStatus::Failed | ExperimentStatus::Stopped
        )
    }
}

/// Per-token lifecycle state (spec §3, §4.6).
///
/// `Monitoring -> Bought -> Monitoring (full sell only) -> ... -> Inactive`.
/// A `Bought` token with a partial sell remains `Bought`: only a strict-zero
/// holding transitions a token back to `Monitoring`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    Monitoring,
    Bought,
    Inactive,
}

/// The direction of a strategy's intent / an executed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    pub fn opposite(self) -> Self {
        match self {
            TradeAction::Buy => TradeAction::Sell,
            TradeAction::Sell => TradeAction::Buy,
        }
    }
}