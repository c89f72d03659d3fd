use crate::error::TokenPoolError;
use cards::CardPositionManager;
use chrono::{DateTime, Duration, Utc};
use core_types::enums::TokenStatus;
use core_types::token::{CardAllocation, MarketMetrics, Token};
use std::collections::HashMap;

/// The composite key every lookup normalizes to before touching the pool
/// (spec §4.1, §9): canonical address + canonical chain id.
pub type TokenKey = (String, String);

/// Bounded rolling window kept on each token for trend factors (spec §4.5).
const DEFAULT_PRICE_HISTORY_LEN: usize = 64;

/// Extra market data carried by `updatePrice` beyond the price itself
/// (spec §4.1).
#[derive(Debug, Clone, Default)]
pub struct PriceUpdate {
    pub metrics: MarketMetrics,
}

/// The set of observed tokens and their mutable state (spec §3, §4.1).
///
/// Keys are always the canonical `(address, blockchain)` pair produced by
/// `core_types::address::key` — callers pass raw input and the pool
/// normalizes it, so heterogeneous casing on the way in never splits state.
#[derive(Debug)]
pub struct TokenPool {
    tokens: HashMap<TokenKey, Token>,
    ttl: Duration,
    inactive_after: Duration,
    max_history_len: usize,
    card_manager: CardPositionManager,
}

impl Default for TokenPool {
    fn default() -> Self {
        Self {
            tokens: HashMap::new(),
            ttl: Duration::hours(24),
            inactive_after: Duration::hours(6),
            max_history_len: DEFAULT_PRICE_HISTORY_LEN,
            card_manager: CardPositionManager::default(),
        }
    }
}

impl TokenPool {
    pub fn new(ttl: Duration, inactive_after: Duration) -> Self {
        Self {
            ttl,
            inactive_after,
            ..Self::default()
        }
    }

    fn normalize(address: &str, blockchain: &str) -> TokenKey {
        core_types::address::key(address, blockchain)
    }

    /// `addToken` — idempotent insert; ignored if (address, blockchain)
    /// already present.
    pub fn add_token(
        &mut self,
        address: &str,
        blockchain: &str,
        symbol: &str,
        created_at: DateTime<Utc>,
        current_price: rust_decimal::Decimal,
    ) {
        let key = Self::normalize(address, blockchain);
        if self.tokens.contains_key(&key) {
            return;
        }
        let now = Utc::now();
        let token = Token::new(
            key.0.clone(),
            key.1.clone(),
            symbol.to_string(),
            created_at,
            now,
            current_price,
        );
        self.tokens.insert(key, token);
    }

    /// `updatePrice` — refreshes current price and market metrics; never
    /// regresses `highestPrice`.
    pub fn update_price(
        &mut self,
        address: &str,
        blockchain: &str,
        price: rust_decimal::Decimal,
        ts: DateTime<Utc>,
        extras: PriceUpdate,
    ) -> Result<(), TokenPoolError> {
        let key = Self::normalize(address, blockchain);
        let token = self
            .tokens
            .get_mut(&key)
            .ok_or_else(|| TokenPoolError::TokenNotFound(key.0.clone(), key.1.clone()))?;

        token.update_price(price, ts);
        token.metrics = extras.metrics;

        token.price_history.push((ts, price));
        if token.price_history.len() > self.max_history_len {
            token.price_history.remove(0);
        }

        Ok(())
    }

    /// `markAsBought`.
    pub fn mark_as_bought(
        &mut self,
        address: &str,
        blockchain: &str,
        buy_price: rust_decimal::Decimal,
        buy_time: DateTime<Utc>,
    ) -> Result<(), TokenPoolError> {
        let token = self.token_mut(address, blockchain)?;
        token.status = TokenStatus::Bought;
        token.buy_price = Some(buy_price);
        token.buy_time = Some(buy_time);
        Ok(())
    }

    /// Transitions a token back to `monitoring`. Only called on a strict-zero
    /// holding after a full sell (spec §9 Open Question a): a partial sell
    /// leaves status `bought`.
    pub fn mark_as_sold(&mut self, address: &str, blockchain: &str) -> Result<(), TokenPoolError> {
        let token = self.token_mut(address, blockchain)?;
        token.status = TokenStatus::Monitoring;
        token.buy_price = None;
        token.buy_time = None;
        Ok(())
    }

    /// `recordStrategyExecution` — increments the per-strategy counter and
    /// stamps the last-execution time. Called by the caller after dispatch
    /// succeeds (spec §4.4), never from inside `StrategyEngine::evaluate`.
    pub fn record_strategy_execution(
        &mut self,
        address: &str,
        blockchain: &str,
        strategy_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), TokenPoolError> {
        let token = self.token_mut(address, blockchain)?;
        let state = token.strategy_executions.entry(strategy_id.to_string()).or_default();
        state.count += 1;
        state.last_execution_at = Some(at);
        Ok(())
    }

    /// `getMonitoringTokens` — tokens whose status is `monitoring` or
    /// `bought` (bought is still observed for sell-side evaluation).
    pub fn monitoring_tokens(&self) -> Vec<&Token> {
        self.tokens
            .values()
            .filter(|t| matches!(t.status, TokenStatus::Monitoring | TokenStatus::Bought))
            .collect()
    }

    pub fn get(&self, address: &str, blockchain: &str) -> Option<&Token> {
        self.tokens.get(&Self::normalize(address, blockchain))
    }

    pub fn get_mut(&mut self, address: &str, blockchain: &str) -> Option<&mut Token> {
        self.tokens.get_mut(&Self::normalize(address, blockchain))
    }

    fn token_mut(&mut self, address: &str, blockchain: &str) -> Result<&mut Token, TokenPoolError> {
        let key = Self::normalize(address, blockchain);
        self.tokens
            .get_mut(&key)
            .ok_or(TokenPoolError::TokenNotFound(key.0, key.1))
    }

    /// `getCardPositionManager` / `setCardPositionManager` — per-token
    /// allocation state. `CardPositionManager` itself is stateless behavior
    /// (see the `cards` crate); what's actually stored per token is its
    /// `CardAllocation`.
    pub fn card_allocation(&self, address: &str, blockchain: &str) -> Option<CardAllocation> {
        self.get(address, blockchain).and_then(|t| t.card_allocation)
    }

    pub fn set_card_allocation(
        &mut self,
        address: &str,
        blockchain: &str,
        allocation: CardAllocation,
    ) -> Result<(), TokenPoolError> {
        let token = self.token_mut(address, blockchain)?;
        token.card_allocation = Some(allocation);
        Ok(())
    }

    pub fn card_manager(&self) -> &CardPositionManager {
        &self.card_manager
    }

    /// `cleanup` — marks tokens past the configured time-to-live inactive.
    /// Tokens are kept in the pool (for historical reference / persistence
    /// write-through) rather than removed; `monitoring_tokens` already
    /// filters `inactive` out.
    pub fn cleanup(&mut self, now: DateTime<Utc>) {
        for token in self.tokens.values_mut() {
            if token.status != TokenStatus::Inactive && now - token.collected_at > self.ttl {
                tracing::info!(address = %token.address, blockchain = %token.blockchain, "cleanup: token past ttl, marking inactive");
                token.status = TokenStatus::Inactive;
            }
        }
    }

    /// `cleanupInactiveTokens` — evicts `monitoring` tokens that have been
    /// pooled longer than `inactive_after` without ever producing a buy.
    /// Tokens that already transitioned to `bought` are never evicted here.
    pub fn cleanup_inactive_tokens(&mut self, now: DateTime<Utc>) {
        for token in self.tokens.values_mut() {
            if token.status == TokenStatus::Monitoring
                && token.buy_price.is_none()
                && now - token.collected_at > self.inactive_after
            {
                tracing::info!(address = %token.address, blockchain = %token.blockchain, "cleanup_inactive_tokens: no buy within threshold, marking inactive");
                token.status = TokenStatus::Inactive;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn add_token_is_idempotent_on_canonical_key() {
        let mut pool = TokenPool::default();
        pool.add_token("0xABC", "eth", "TKN", now(), dec!(1));
        pool.add_token("0xabc", "ethereum", "TKN2", now(), dec!(999));

        assert_eq!(pool.len(), 1);
        let token = pool.get("0xabc", "eth").unwrap();
        assert_eq!(token.symbol, "TKN");
    }

    #[test]
    fn solana_addresses_keep_casing() {
        let mut pool = TokenPool::default();
        let addr = "4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R";
        pool.add_token(addr, "solana", "SOL1", now(), dec!(1));
        assert!(pool.get(addr, "sol").is_some());
    }

    #[test]
    fn invariant_4_highest_price_never_regresses() {
        let mut pool = TokenPool::default();
        pool.add_token("0xabc", "eth", "TKN", now(), dec!(1));
        pool.update_price("0xabc", "eth", dec!(2), now(), PriceUpdate::default())
            .unwrap();
        pool.update_price("0xabc", "eth", dec!(1.5), now(), PriceUpdate::default())
            .unwrap();
        let token = pool.get("0xabc", "eth").unwrap();
        assert_eq!(token.highest_price, dec!(2));
        assert_eq!(token.current_price, dec!(1.5));
    }

    #[test]
    fn monitoring_tokens_includes_bought_but_not_inactive() {
        let mut pool = TokenPool::default();
        pool.add_token("0xaaa", "eth", "A", now(), dec!(1));
        pool.add_token("0xbbb", "eth", "B", now(), dec!(1));
        pool.mark_as_bought("0xaaa", "eth", dec!(1), now()).unwrap();
        pool.cleanup(now() + Duration::hours(48));

        let monitoring = pool.monitoring_tokens();
        assert_eq!(monitoring.len(), 1);
        assert_eq!(monitoring[0].address, "0xaaa");
    }

    #[test]
    fn mark_as_sold_returns_token_to_monitoring() {
        let mut pool = TokenPool::default();
        pool.add_token("0xabc", "eth", "TKN", now(), dec!(1));
        pool.mark_as_bought("0xabc", "eth", dec!(1), now()).unwrap();
        pool.mark_as_sold("0xabc", "eth").unwrap();
        assert_eq!(pool.get("0xabc", "eth").unwrap().status, TokenStatus::Monitoring);
    }

    #[test]
    fn cleanup_inactive_tokens_spares_bought_tokens() {
        let mut pool = TokenPool::default();
        pool.add_token("0xabc", "eth", "TKN", now(), dec!(1));
        pool.mark_as_bought("0xabc", "eth", dec!(1), now()).unwrap();
        pool.cleanup_inactive_tokens(now() + Duration::days(10));
        assert_eq!(pool.get("0xabc", "eth").unwrap().status, TokenStatus::Bought);
    }
}
