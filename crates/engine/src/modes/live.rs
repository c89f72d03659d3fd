//! Live mode (spec §4.7): wallet-balance holding sync that preserves each
//! token's card allocation across a rebuild, real collaborator-backed
//! harvesting/pricing, and on-chain trade dispatch through
//! `execution::Executor`'s primary/secondary fallback, gated by a pre-buy
//! denylist check and reserve-native enforcement.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use collaborators::{
    with_retry, DenylistService, HarvestedToken, MarketDataApi, PriceQuote, TokenListingSource, TraderOptions,
    WalletInfoApi, NATIVE_SENTINEL_ADDRESS,
};
use core_types::experiment::PositionManagementConfig;
use core_types::ledger::Portfolio;
use core_types::token::{CardAllocation, Token};
use execution::Executor;
use portfolio::PortfolioManager;
use rust_decimal::Decimal;
use token_pool::TokenPool;
use tokio::sync::Mutex;

use crate::adapter::{ModeAdapter, TradeDispatchOutcome};
use crate::error::EngineError;

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

pub struct LiveAdapter {
    listing_source: Arc<dyn TokenListingSource>,
    market_data: Arc<dyn MarketDataApi>,
    wallet_info: Arc<dyn WalletInfoApi>,
    denylist: Arc<dyn DenylistService>,
    executor: Executor,
    wallet_address: String,
    blockchain: String,
    reserve_native: Decimal,
    position_management: PositionManagementConfig,
    available_balance: Mutex<Decimal>,
}

impl LiveAdapter {
    pub fn new(
        listing_source: Arc<dyn TokenListingSource>,
        market_data: Arc<dyn MarketDataApi>,
        wallet_info: Arc<dyn WalletInfoApi>,
        denylist: Arc<dyn DenylistService>,
        executor: Executor,
        wallet_address: String,
        blockchain: String,
        reserve_native: Decimal,
        position_management: PositionManagementConfig,
    ) -> Self {
        Self {
            listing_source,
            market_data,
            wallet_info,
            denylist,
            executor,
            wallet_address,
            blockchain,
            reserve_native,
            position_management,
            available_balance: Mutex::new(Decimal::ZERO),
        }
    }
}

#[async_trait]
impl ModeAdapter for LiveAdapter {
    /// Pulls wallet balances and rebuilds positions, preserving each
    /// reappearing token's card allocation across the rebuild (spec §9
    /// Design Notes, S4): the allocation reflects strategy-side bookkeeping,
    /// not an on-chain fact, so a holding-sync rebuild must not reset it. A
    /// wallet balance for a token the pool has never seen gets inserted with
    /// a fresh default allocation — all cards on the native side (spec §4.7
    /// Live: "If a new token appears, create a default CardPositionManager
    /// (all cards on the native side)") — so it's visible to sell-side
    /// evaluation even if the listing source never re-lists it.
    async fn sync_holdings(&self, pool: &mut TokenPool, portfolio: &mut Portfolio) -> Result<(), EngineError> {
        let balances = self
            .wallet_info
            .get_wallet_balances(&self.wallet_address, &self.blockchain)
            .await
            .map_err(|err| EngineError::Sync(err.to_string()))?;

        let portfolio_manager = PortfolioManager::new();
        for balance in &balances {
            if balance.token_address == NATIVE_SENTINEL_ADDRESS {
                portfolio.available_balance = balance.balance;
                continue;
            }

            let (address, blockchain) = core_types::address::key(&balance.token_address, &self.blockchain);
            let preserved_allocation = pool.get(&address, &blockchain).and_then(|token| token.card_allocation);

            if preserved_allocation.is_none() {
                pool.add_token(&address, &blockchain, &balance.symbol, Utc::now(), balance.average_purchase_price);
            }

            portfolio_manager.update_position(portfolio, &address, balance.balance, balance.average_purchase_price);

            match preserved_allocation {
                Some(allocation) => {
                    if let Some(token) = pool.get_mut(&address, &blockchain) {
                        token.card_allocation = Some(allocation);
                    }
                }
                None => {
                    let default_allocation = CardAllocation::new(
                        self.position_management.total_cards,
                        self.position_management.per_card_native,
                        self.position_management.total_cards,
                        0,
                    );
                    pool.set_card_allocation(&address, &blockchain, default_allocation)?;
                }
            }
        }

        *self.available_balance.lock().await = portfolio.available_balance;
        Ok(())
    }

    async fn harvest_tokens(&self) -> Result<Vec<HarvestedToken>, EngineError> {
        let source = self.listing_source.clone();
        with_retry(RETRY_ATTEMPTS, RETRY_BASE_DELAY, move || {
            let source = source.clone();
            async move { source.harvest().await }
        })
        .await
        .map_err(EngineError::from)
    }

    async fn refresh_prices(&self, ids: &[String]) -> Result<HashMap<String, PriceQuote>, EngineError> {
        let market_data = self.market_data.clone();
        let ids = ids.to_vec();
        with_retry(RETRY_ATTEMPTS, RETRY_BASE_DELAY, move || {
            let market_data = market_data.clone();
            let ids = ids.clone();
            async move { market_data.get_prices(&ids).await }
        })
        .await
        .map_err(EngineError::from)
    }

    async fn execute_buy(
        &self,
        token: &Token,
        native_amount: Decimal,
        options: &TraderOptions,
    ) -> Result<TradeDispatchOutcome, EngineError> {
        if let Some(creator) = &token.risk.creator_address {
            match self.denylist.is_denylisted(creator).await {
                Ok(true) => return Ok(TradeDispatchOutcome::failed("creator address is denylisted")),
                Ok(false) => {}
                Err(err) => return Err(EngineError::from(err)),
            }
        }

        let available = *self.available_balance.lock().await;
        if native_amount > available - self.reserve_native {
            return Ok(TradeDispatchOutcome::failed("insufficient funds: reserve_native would be breached"));
        }

        match self.executor.buy(&token.address, native_amount, options).await {
            Ok(dispatched) => {
                let receipt = dispatched.receipt;
                let amount_out = receipt.actual_amount_out.filter(|amount| *amount > Decimal::ZERO);
                let (Some(amount_out), true) = (amount_out, receipt.success) else {
                    return Ok(TradeDispatchOutcome::failed(
                        receipt.error.unwrap_or_else(|| "buy failed".to_string()),
                    ));
                };
                Ok(TradeDispatchOutcome {
                    success: true,
                    token_amount: amount_out,
                    unit_price: native_amount / amount_out,
                    tx_hash: receipt.tx_hash,
                    gas_used: receipt.gas_used,
                    trader_used: Some(dispatched.trader_used),
                    message: None,
                })
            }
            Err(err) => Err(EngineError::from(err)),
        }
    }

    async fn execute_sell(
        &self,
        token: &Token,
        token_amount: Decimal,
        options: &TraderOptions,
    ) -> Result<TradeDispatchOutcome, EngineError> {
        if token_amount <= Decimal::ZERO {
            return Ok(TradeDispatchOutcome::failed("no tokens available to sell"));
        }

        match self.executor.sell(&token.address, token_amount, options).await {
            Ok(dispatched) => {
                let receipt = dispatched.receipt;
                let Some(received) = receipt.actual_received.filter(|_| receipt.success) else {
                    return Ok(TradeDispatchOutcome::failed(
                        receipt.error.unwrap_or_else(|| "sell failed".to_string()),
                    ));
                };
                Ok(TradeDispatchOutcome {
                    success: true,
                    token_amount,
                    unit_price: received / token_amount,
                    tx_hash: receipt.tx_hash,
                    gas_used: receipt.gas_used,
                    trader_used: Some(dispatched.trader_used),
                    message: None,
                })
            }
            Err(err) => Err(EngineError::from(err)),
        }
    }

    fn should_record_time_series(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collaborators::fakes::{FakeDenylistService, FakeMarketDataApi, FakeTokenListingSource, FakeWalletInfoApi, ScriptedTrader};
    use collaborators::types::{BuyReceipt, WalletBalance};
    use core_types::enums::TokenStatus;
    use core_types::experiment::InitialAllocation;
    use rust_decimal_macros::dec;

    fn default_position_management() -> PositionManagementConfig {
        PositionManagementConfig {
            enabled: true,
            total_cards: 4,
            per_card_native: dec!(25),
            initial_allocation: InitialAllocation {
                native_cards: 4,
                token_cards: 0,
            },
        }
    }

    fn adapter(
        wallet_info: Arc<dyn WalletInfoApi>,
        denylist: Arc<dyn DenylistService>,
        executor: Executor,
        reserve_native: Decimal,
    ) -> LiveAdapter {
        LiveAdapter::new(
            Arc::new(FakeTokenListingSource::default()),
            Arc::new(FakeMarketDataApi::default()),
            wallet_info,
            denylist,
            executor,
            "0xwallet".to_string(),
            "ethereum".to_string(),
            reserve_native,
            default_position_management(),
        )
    }

    fn sample_token() -> Token {
        let mut token = Token::new(
            "0xabc".to_string(),
            "ethereum".to_string(),
            "ABC".to_string(),
            chrono::Utc::now(),
            chrono::Utc::now(),
            dec!(1),
        );
        token.status = TokenStatus::Monitoring;
        token
    }

    #[tokio::test]
    async fn holding_sync_preserves_card_allocation_across_rebuild() {
        let wallet_info: Arc<dyn WalletInfoApi> = Arc::new(FakeWalletInfoApi::new(vec![WalletBalance {
            symbol: "ABC".to_string(),
            token_address: "0xabc".to_string(),
            balance: dec!(100),
            value_usd: dec!(100),
            average_purchase_price: dec!(1),
            decimals: 18,
        }]));
        let trader = Arc::new(ScriptedTrader::new("primary"));
        let executor = Executor::new(trader, None);
        let live = adapter(wallet_info, Arc::new(FakeDenylistService::default()), executor, Decimal::ZERO);

        let mut pool = TokenPool::default();
        pool.add_token("0xabc", "ethereum", "ABC", chrono::Utc::now(), dec!(1));
        let allocation = pool
            .card_manager()
            .initial_allocation(4, dec!(25), 2, 2)
            .unwrap();
        pool.set_card_allocation("0xabc", "ethereum", allocation).unwrap();

        let mut portfolio = core_types::ledger::Portfolio::new(uuid::Uuid::new_v4(), Decimal::ZERO);
        live.sync_holdings(&mut pool, &mut portfolio).await.unwrap();

        let token = pool.get("0xabc", "ethereum").unwrap();
        assert_eq!(token.card_allocation.unwrap().native_cards, 2);
        assert_eq!(token.card_allocation.unwrap().token_cards, 2);
        assert_eq!(portfolio.positions.get("0xabc").unwrap().total_amount, dec!(100));
    }

    /// A wallet balance for a token the pool has never tracked must be
    /// inserted with a fresh all-native default allocation (spec §4.7 Live,
    /// §9), so it is visible to sell-side evaluation even without a matching
    /// listing-source harvest.
    #[tokio::test]
    async fn holding_sync_defaults_a_new_tokens_allocation_to_all_native() {
        let wallet_info: Arc<dyn WalletInfoApi> = Arc::new(FakeWalletInfoApi::new(vec![WalletBalance {
            symbol: "XYZ".to_string(),
            token_address: "0xnew".to_string(),
            balance: dec!(50),
            value_usd: dec!(50),
            average_purchase_price: dec!(1),
            decimals: 18,
        }]));
        let trader = Arc::new(ScriptedTrader::new("primary"));
        let executor = Executor::new(trader, None);
        let live = adapter(wallet_info, Arc::new(FakeDenylistService::default()), executor, Decimal::ZERO);

        let mut pool = TokenPool::default();
        let mut portfolio = core_types::ledger::Portfolio::new(uuid::Uuid::new_v4(), Decimal::ZERO);
        live.sync_holdings(&mut pool, &mut portfolio).await.unwrap();

        let token = pool.get("0xnew", "ethereum").expect("new token must be tracked after sync");
        let allocation = token.card_allocation.expect("new token must get a default allocation");
        assert_eq!(allocation.native_cards, 4);
        assert_eq!(allocation.token_cards, 0);
        assert_eq!(portfolio.positions.get("0xnew").unwrap().total_amount, dec!(50));

        // The new token is visible to evaluation, not just tracked internally.
        let monitored: Vec<_> = pool.monitoring_tokens().into_iter().map(|t| t.address.clone()).collect();
        assert!(monitored.contains(&"0xnew".to_string()));
    }

    #[tokio::test]
    async fn denylisted_creator_blocks_a_buy_before_dispatch() {
        let wallet_info: Arc<dyn WalletInfoApi> = Arc::new(FakeWalletInfoApi::default());
        let denylist: Arc<dyn DenylistService> = Arc::new(FakeDenylistService::new(vec!["0xcreator".to_string()]));
        let trader = Arc::new(ScriptedTrader::new("primary"));
        trader.queue_buy(Ok(BuyReceipt {
            success: true,
            tx_hash: Some("0xtx".to_string()),
            actual_amount_out: Some(dec!(10)),
            gas_used: None,
            error: None,
        }));
        let executor = Executor::new(trader, None);
        let live = adapter(wallet_info, denylist, executor, Decimal::ZERO);

        let mut token = sample_token();
        token.risk.creator_address = Some("0xcreator".to_string());
        *live.available_balance.lock().await = dec!(10);

        let outcome = live.execute_buy(&token, dec!(5), &TraderOptions::default()).await.unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn reserve_native_is_never_spent() {
        let wallet_info: Arc<dyn WalletInfoApi> = Arc::new(FakeWalletInfoApi::default());
        let trader = Arc::new(ScriptedTrader::new("primary"));
        let executor = Executor::new(trader, None);
        let live = adapter(wallet_info, Arc::new(FakeDenylistService::default()), executor, dec!(1));
        *live.available_balance.lock().await = dec!(1);

        let token = sample_token();
        let outcome = live.execute_buy(&token, dec!(1), &TraderOptions::default()).await.unwrap();
        assert!(!outcome.success);
    }
}
