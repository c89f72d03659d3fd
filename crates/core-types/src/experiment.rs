use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::enums::{ExperimentStatus, Mode};

/// Encrypted wallet credentials for live mode (spec §3, §6).
///
/// Decryption is explicitly out of scope (spec §1 Non-goals); the engine
/// treats `private_key` as an opaque encrypted blob handed to the trader
/// collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    pub address: String,
    pub private_key: String,
}

/// Initial card-allocation split for newly-tracked tokens (spec §6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InitialAllocation {
    pub native_cards: u32,
    pub token_cards: u32,
}

/// Position-management parameters (spec §3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionManagementConfig {
    pub enabled: bool,
    pub total_cards: u32,
    pub per_card_native: Decimal,
    pub initial_allocation: InitialAllocation,
}

/// The configuration document attached to an `Experiment` row (spec §3, §6).
///
/// `strategies_config` is left as a raw JSON document here — core-types has
/// no knowledge of the strategy-condition expression language; the
/// `strategies` crate is responsible for parsing it into concrete
/// `StrategyDef`s at load time, the same deferred-deserialize pattern
/// `zenith`'s engine uses for per-bot strategy params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub initial_capital: Decimal,
    pub wallet: Option<WalletConfig>,
    pub backtest_source_experiment_id: Option<Uuid>,
    pub position_management: PositionManagementConfig,
    pub strategies_config: JsonValue,
    pub reserve_native: Decimal,
    pub max_slippage: Option<Decimal>,
    pub max_gas_price: Option<Decimal>,
    pub max_gas_limit: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            initial_capital: Decimal::ZERO,
            wallet: None,
            backtest_source_experiment_id: None,
            position_management: PositionManagementConfig {
                enabled: true,
                total_cards: 4,
                per_card_native: Decimal::ZERO,
                initial_allocation: InitialAllocation {
                    native_cards: 4,
                    token_cards: 0,
                },
            },
            strategies_config: JsonValue::Null,
            reserve_native: Decimal::new(1, 1), // 0.1
            max_slippage: None,
            max_gas_price: None,
            max_gas_limit: None,
        }
    }
}

/// The top-level run descriptor (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub id: Uuid,
    pub name: String,
    pub mode: Mode,
    pub blockchain: String,
    pub status: ExperimentStatus,
    pub config: ExperimentConfig,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
}

impl Experiment {
    pub fn new(name: String, mode: Mode, blockchain: String, config: ExperimentConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            mode,
            blockchain,
            status: ExperimentStatus::Initializing,
            config,
            started_at: None,
            stopped_at: None,
        }
    }
}
