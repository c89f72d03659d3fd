use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::enums::TokenStatus;

/// Market metrics refreshed each round from the market-data collaborator
/// (spec §3, §6).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketMetrics {
    pub tx_volume_u_24h: Option<Decimal>,
    pub holders: Option<u64>,
    pub tvl: Option<Decimal>,
    pub fdv: Option<Decimal>,
    pub market_cap: Option<Decimal>,
}

/// Risk-relevant data about a token's origin, used by the live mode's
/// pre-buy denylist check (spec §4.7 Live).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskData {
    pub creator_address: Option<String>,
}

/// Per-strategy execution bookkeeping a `Token` carries (spec §3, §4.4).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyExecutionState {
    pub count: u32,
    pub last_execution_at: Option<DateTime<Utc>>,
}

/// The discretized capital-allocation state for one token (spec §3, §4.2).
///
/// `CardPositionManager` (in the `cards` crate) is the behavior that mutates
/// this; `CardState` is the data it mutates. Splitting them lets `Token` stay
/// a plain data record while `cards` owns every invariant-preserving
/// operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CardAllocation {
    pub total_cards: u32,
    pub per_card_native: Decimal,
    pub native_cards: u32,
    pub token_cards: u32,
}

impl CardAllocation {
    pub fn new(total_cards: u32, per_card_native: Decimal, native_cards: u32, token_cards: u32) -> Self {
        Self {
            total_cards,
            per_card_native,
            native_cards,
            token_cards,
        }
    }

    /// The invariant every mutation in `cards` must preserve (spec §8 #1).
    pub fn is_balanced(&self) -> bool {
        self.native_cards + self.token_cards == self.total_cards
    }
}

/// An observed tradeable instrument, identified by (address, blockchain)
/// (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub address: String,
    pub blockchain: String,
    pub symbol: String,
    pub created_at: DateTime<Utc>,
    pub collected_at: DateTime<Utc>,
    pub collection_price: Decimal,
    pub current_price: Decimal,
    pub highest_price: Decimal,
    pub highest_price_at: DateTime<Utc>,
    pub metrics: MarketMetrics,
    pub risk: RiskData,
    pub status: TokenStatus,
    pub buy_price: Option<Decimal>,
    pub buy_time: Option<DateTime<Utc>>,
    pub strategy_executions: HashMap<String, StrategyExecutionState>,
    pub card_allocation: Option<CardAllocation>,
    /// Bounded rolling window of recent `(timestamp, price)` samples used by
    /// `FactorBuilder`'s trend factors. Capped by `TokenPool`'s configured
    /// window size, not unbounded history.
    pub price_history: Vec<(DateTime<Utc>, Decimal)>,
}

impl Token {
    pub fn new(
        address: String,
        blockchain: String,
        symbol: String,
        created_at: DateTime<Utc>,
        collected_at: DateTime<Utc>,
        current_price: Decimal,
    ) -> Self {
        Self {
            address,
            blockchain,
            symbol,
            created_at,
            collected_at,
            collection_price: current_price,
            current_price,
            highest_price: current_price,
            highest_price_at: collected_at,
            metrics: MarketMetrics::default(),
            risk: RiskData::default(),
            status: TokenStatus::Monitoring,
            buy_price: None,
            buy_time: None,
            strategy_executions: HashMap::new(),
            card_allocation: None,
            price_history: Vec::new(),
        }
    }

    /// Updates the current price, maintaining the `highestPrice` high-water
    /// mark (spec §4.1: "must never regress highestPrice").
    pub fn update_price(&mut self, price: Decimal, at: DateTime<Utc>) {
        self.current_price = price;
        if price > self.highest_price {
            self.highest_price = price;
            self.highest_price_at = at;
        }
    }
}
