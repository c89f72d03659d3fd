//! The mode-agnostic capability set a `Scheduler` drives (spec §4.6, §4.7,
//! §9 "union of the two `AbstractTradingEngine` versions"). `VirtualAdapter`,
//! `BacktestAdapter`, and `LiveAdapter` each implement this once; everything
//! else — factor building, strategy evaluation, card accounting, FIFO
//! portfolio bookkeeping — lives in `Scheduler` and is shared across modes.

use async_trait::async_trait;
use collaborators::{HarvestedToken, PriceQuote, TraderOptions};
use core_types::token::Token;
use core_types::ledger::Portfolio;
use factors::FactorMap;
use rust_decimal::Decimal;
use std::collections::HashMap;
use token_pool::TokenPool;

use crate::error::EngineError;

/// The uniform result of dispatching a buy or sell (spec §1, §7: every
/// executor operation resolves to `{success, reason?}`, never a thrown
/// error). `token_amount`/`unit_price` are always denominated the same way
/// regardless of direction, so `Scheduler` can feed them straight into
/// `portfolio::PortfolioManager::execute_trade`.
#[derive(Debug, Clone)]
pub struct TradeDispatchOutcome {
    pub success: bool,
    pub token_amount: Decimal,
    pub unit_price: Decimal,
    pub tx_hash: Option<String>,
    pub gas_used: Option<Decimal>,
    pub trader_used: Option<String>,
    pub message: Option<String>,
}

impl TradeDispatchOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            token_amount: Decimal::ZERO,
            unit_price: Decimal::ZERO,
            tx_hash: None,
            gas_used: None,
            trader_used: None,
            message: Some(message.into()),
        }
    }
}

/// Mode-specific hooks a `Scheduler` calls each round (spec §9 Design Notes:
/// "a concrete scheduler over a mode adapter capability set").
#[async_trait]
pub trait ModeAdapter: Send + Sync {
    /// Step 1: bring `portfolio`/`pool` card-state into agreement with the
    /// mode's source of truth. Must preserve each token's card allocation
    /// across the rebuild (spec §9 Holding sync design note).
    async fn sync_holdings(&self, pool: &mut TokenPool, portfolio: &mut Portfolio) -> Result<(), EngineError>;

    /// Step 2: the list of tokens to evaluate this round.
    async fn harvest_tokens(&self) -> Result<Vec<HarvestedToken>, EngineError>;

    /// Step 3: batched price lookup for the given market-data ids
    /// (`{address}-{canonicalSuffix}`, see `core_types::chain::market_data_id`).
    async fn refresh_prices(&self, ids: &[String]) -> Result<HashMap<String, PriceQuote>, EngineError>;

    /// Dispatches a buy for `native_amount` of native currency against
    /// `token`. Virtual/backtest apply it directly to the in-memory
    /// portfolio; live dispatches to an on-chain trader and reports back the
    /// actual amount/price from the receipt (spec §4.7 Live).
    async fn execute_buy(
        &self,
        token: &Token,
        native_amount: Decimal,
        options: &TraderOptions,
    ) -> Result<TradeDispatchOutcome, EngineError>;

    /// Dispatches a sell of `token_amount` tokens.
    async fn execute_sell(
        &self,
        token: &Token,
        token_amount: Decimal,
        options: &TraderOptions,
    ) -> Result<TradeDispatchOutcome, EngineError>;

    /// Step 4 (backtest only): a persisted factor snapshot for this token
    /// this round, when the mode replays recorded data instead of deriving
    /// factors fresh. Backtest overrides this with the `factor_values` from
    /// its current `TimeSeriesRecord` group; virtual and live return `None`
    /// so the scheduler falls back to `FactorBuilder::build` on their live
    /// in-memory token state (spec §4.5: backtest "reconstructs factors from
    /// a persisted snapshot and must produce byte-equivalent strategy
    /// decisions for identical inputs").
    async fn replayed_factors(&self, _address: &str, _blockchain: &str) -> Option<FactorMap> {
        None
    }

    /// Backtest must not record time-series (it would overwrite its own
    /// source); virtual and live both do (spec §4.7).
    fn should_record_time_series(&self) -> bool;

    /// Backtest terminates after the last replayed round; virtual/live run
    /// until cancelled (spec §4.7 Backtest: "terminates after the last
    /// round").
    async fn has_more_rounds(&self) -> bool {
        true
    }
}

/// The result `Scheduler::process_signal` returns (spec §4.6 `processSignal`).
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub trade_id: Option<uuid::Uuid>,
    pub message: Option<String>,
}
