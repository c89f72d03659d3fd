use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// A free-form per-round metric row (spec §6 `runtime_metrics`) — round
/// duration, tokens evaluated, signals emitted, and similar scheduler
/// counters that don't fit the fixed `PortfolioSnapshot` shape. Has no
/// domain-rule home in `core-types` because nothing outside persistence
/// reads it back; the engine only ever inserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeMetric {
    pub experiment_id: Uuid,
    pub loop_count: u64,
    pub recorded_at: DateTime<Utc>,
    pub metrics: JsonValue,
}

/// Filters accepted by `select-by-experiment` queries (spec §6: "select-by-
/// experiment (+ filters)").
#[derive(Debug, Clone, Default)]
pub struct SignalFilter {
    pub token_address: Option<String>,
    pub executed_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TradeFilter {
    pub token_address: Option<String>,
}
