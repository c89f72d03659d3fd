use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::enums::TradeAction;

/// The outcome recorded back onto a `TradeSignal` once `processSignal`
/// dispatches it (spec §3, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalOutcome {
    pub executed: bool,
    pub trade_id: Option<Uuid>,
    pub error_message: Option<String>,
}

impl SignalOutcome {
    pub fn pending() -> Self {
        Self {
            executed: false,
            trade_id: None,
            error_message: None,
        }
    }

    pub fn succeeded(trade_id: Uuid) -> Self {
        Self {
            executed: true,
            trade_id: Some(trade_id),
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            executed: false,
            trade_id: None,
            error_message: Some(message.into()),
        }
    }
}

/// A strategy's buy/sell decision, before and after dispatch (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSignal {
    pub id: Uuid,
    pub experiment_id: Uuid,
    pub token_address: String,
    pub token_symbol: String,
    pub action: TradeAction,
    pub confidence: Decimal,
    pub reason: String,
    pub factors: JsonValue,
    pub price_at_decision: Decimal,
    pub strategy_id: String,
    pub created_at: DateTime<Utc>,
    pub outcome: SignalOutcome,
}

/// Metadata captured about a trade's card-allocation state transition
/// (spec §3: Trade's metadata document).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardStateSnapshot {
    pub native_cards: u32,
    pub token_cards: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeMetadata {
    pub cards_before: Option<CardStateSnapshot>,
    pub cards_after: Option<CardStateSnapshot>,
    pub trader_used: Option<String>,
}

/// An executed order (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub experiment_id: Uuid,
    pub signal_id: Option<Uuid>,
    pub action: TradeAction,
    pub input_currency: String,
    pub input_amount: Decimal,
    pub output_currency: String,
    pub output_amount: Decimal,
    pub unit_price: Decimal,
    pub success: bool,
    pub tx_hash: Option<String>,
    pub gas_used: Option<Decimal>,
    pub wallet_address: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub metadata: TradeMetadata,
}

/// A per-(experiment, token, tick) snapshot used by backtest as its data
/// source (spec §3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesRecord {
    pub experiment_id: Uuid,
    pub token_address: String,
    pub token_symbol: String,
    pub timestamp: DateTime<Utc>,
    pub loop_count: u64,
    pub price_usd: Decimal,
    pub factor_values: JsonValue,
    pub blockchain: String,
}

/// A per-round persisted view of a `Portfolio`, for the (out-of-scope)
/// dashboard (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub experiment_id: Uuid,
    pub loop_count: u64,
    pub timestamp: DateTime<Utc>,
    pub available_balance: Decimal,
    pub total_invested: Decimal,
    pub total_value: Decimal,
    pub total_pnl: Decimal,
    pub open_positions: u32,
}
