//! Virtual mode (spec §4.7): tick-based, no holding sync (the in-memory
//! `Portfolio` already reflects every trade `PortfolioManager::execute_trade`
//! has applied), external harvesting/price APIs, and synthetic fills priced
//! off the token's current price rather than a real trader receipt.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use collaborators::{with_retry, HarvestedToken, MarketDataApi, PriceQuote, TokenListingSource, TraderOptions};
use core_types::ledger::Portfolio;
use core_types::token::Token;
use rust_decimal::Decimal;
use token_pool::TokenPool;

use crate::adapter::{ModeAdapter, TradeDispatchOutcome};
use crate::error::EngineError;

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

pub struct VirtualAdapter {
    listing_source: Arc<dyn TokenListingSource>,
    market_data: Arc<dyn MarketDataApi>,
}

impl VirtualAdapter {
    pub fn new(listing_source: Arc<dyn TokenListingSource>, market_data: Arc<dyn MarketDataApi>) -> Self {
        Self {
            listing_source,
            market_data,
        }
    }
}

/// Synthesizes a dispatch outcome the way virtual and backtest both fill
/// orders (spec §4.7): no real trader, just `nativeAmount / currentPrice`.
pub(crate) fn synthetic_buy(current_price: Decimal, native_amount: Decimal) -> TradeDispatchOutcome {
    if current_price <= Decimal::ZERO {
        return TradeDispatchOutcome::failed("no price available for synthetic fill");
    }
    TradeDispatchOutcome {
        success: true,
        token_amount: native_amount / current_price,
        unit_price: current_price,
        tx_hash: None,
        gas_used: None,
        trader_used: Some("synthetic".to_string()),
        message: None,
    }
}

pub(crate) fn synthetic_sell(current_price: Decimal, token_amount: Decimal) -> TradeDispatchOutcome {
    if current_price <= Decimal::ZERO {
        return TradeDispatchOutcome::failed("no price available for synthetic fill");
    }
    TradeDispatchOutcome {
        success: true,
        token_amount,
        unit_price: current_price,
        tx_hash: None,
        gas_used: None,
        trader_used: Some("synthetic".to_string()),
        message: None,
    }
}

#[async_trait]
impl ModeAdapter for VirtualAdapter {
    async fn sync_holdings(&self, _pool: &mut TokenPool, _portfolio: &mut Portfolio) -> Result<(), EngineError> {
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
        _options: &TraderOptions,
    ) -> Result<TradeDispatchOutcome, EngineError> {
        Ok(synthetic_buy(token.current_price, native_amount))
    }

    async fn execute_sell(
        &self,
        token: &Token,
        token_amount: Decimal,
        _options: &TraderOptions,
    ) -> Result<TradeDispatchOutcome, EngineError> {
        Ok(synthetic_sell(token.current_price, token_amount))
    }

    fn should_record_time_series(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collaborators::fakes::{FakeMarketDataApi, FakeTokenListingSource};
    use core_types::enums::TokenStatus;
    use rust_decimal_macros::dec;

    fn sample_token(price: Decimal) -> Token {
        let mut token = Token::new(
            "0xabc".to_string(),
            "ethereum".to_string(),
            "ABC".to_string(),
            chrono::Utc::now(),
            chrono::Utc::now(),
            price,
        );
        token.status = TokenStatus::Monitoring;
        token
    }

    #[tokio::test]
    async fn buy_converts_native_amount_into_tokens_at_current_price() {
        let adapter = VirtualAdapter::new(
            Arc::new(FakeTokenListingSource::default()),
            Arc::new(FakeMarketDataApi::default()),
        );
        let token = sample_token(dec!(2));
        let outcome = adapter.execute_buy(&token, dec!(10), &TraderOptions::default()).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.token_amount, dec!(5));
        assert_eq!(outcome.unit_price, dec!(2));
    }

    #[tokio::test]
    async fn buy_fails_cleanly_when_price_is_zero() {
        let adapter = VirtualAdapter::new(
            Arc::new(FakeTokenListingSource::default()),
            Arc::new(FakeMarketDataApi::default()),
        );
        let token = sample_token(Decimal::ZERO);
        let outcome = adapter.execute_buy(&token, dec!(10), &TraderOptions::default()).await.unwrap();
        assert!(!outcome.success);
    }
}
