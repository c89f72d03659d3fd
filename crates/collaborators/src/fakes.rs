//! In-memory test doubles for the five collaborator traits, following the
//! same "trait + HTTP impl + fake for tests" split `api_client::ApiClient`
//! uses in the teacher repo (its tests construct a mock client rather than
//! hitting Binance). Exposed (not `#[cfg(test)]`-gated) so `engine`'s own
//! integration tests can drive a `Scheduler` without a network.

use crate::error::CollaboratorError;
use crate::traits::{DenylistService, MarketDataApi, TokenListingSource, Trader, WalletInfoApi};
use crate::types::{BuyReceipt, HarvestedToken, PriceQuote, SellReceipt, TraderOptions, WalletBalance};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct FakeTokenListingSource {
    pub queue: Mutex<Vec<HarvestedToken>>,
}

impl FakeTokenListingSource {
    pub fn new(tokens: Vec<HarvestedToken>) -> Self {
        Self { queue: Mutex::new(tokens) }
    }
}

#[async_trait]
impl TokenListingSource for FakeTokenListingSource {
    async fn harvest(&self) -> Result<Vec<HarvestedToken>, CollaboratorError> {
        Ok(std::mem::take(&mut *self.queue.lock().unwrap()))
    }
}

#[derive(Debug, Default)]
pub struct FakeMarketDataApi {
    pub quotes: Mutex<HashMap<String, PriceQuote>>,
}

impl FakeMarketDataApi {
    pub fn new(quotes: HashMap<String, PriceQuote>) -> Self {
        Self { quotes: Mutex::new(quotes) }
    }

    pub fn set_price(&self, id: &str, quote: PriceQuote) {
        self.quotes.lock().unwrap().insert(id.to_string(), quote);
    }
}

#[async_trait]
impl MarketDataApi for FakeMarketDataApi {
    async fn get_prices(&self, ids: &[String]) -> Result<HashMap<String, PriceQuote>, CollaboratorError> {
        let quotes = self.quotes.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| quotes.get(id).map(|q| (id.clone(), q.clone())))
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct FakeWalletInfoApi {
    pub balances: Mutex<Vec<WalletBalance>>,
}

impl FakeWalletInfoApi {
    pub fn new(balances: Vec<WalletBalance>) -> Self {
        Self { balances: Mutex::new(balances) }
    }
}

#[async_trait]
impl WalletInfoApi for FakeWalletInfoApi {
    async fn get_wallet_balances(&self, _address: &str, _blockchain: &str) -> Result<Vec<WalletBalance>, CollaboratorError> {
        Ok(self.balances.lock().unwrap().clone())
    }
}

#[derive(Debug, Default)]
pub struct FakeDenylistService {
    pub denylisted: Mutex<Vec<String>>,
}

impl FakeDenylistService {
    pub fn new(denylisted: Vec<String>) -> Self {
        Self { denylisted: Mutex::new(denylisted) }
    }
}

#[async_trait]
impl DenylistService for FakeDenylistService {
    async fn is_denylisted(&self, address: &str) -> Result<bool, CollaboratorError> {
        Ok(self.denylisted.lock().unwrap().iter().any(|a| a == address))
    }
}

/// A scripted trader whose next response is queued by the test; used to
/// exercise the primary/secondary fallback in `execution::Executor`
/// (spec §4.7 Live, §7 `SaturatedBondingCurve`, S6).
#[derive(Debug)]
pub struct ScriptedTrader {
    pub name: String,
    pub next_buy: Mutex<Vec<Result<BuyReceipt, CollaboratorError>>>,
    pub next_sell: Mutex<Vec<Result<SellReceipt, CollaboratorError>>>,
}

impl ScriptedTrader {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            next_buy: Mutex::new(Vec::new()),
            next_sell: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_buy(&self, result: Result<BuyReceipt, CollaboratorError>) {
        self.next_buy.lock().unwrap().push(result);
    }

    pub fn queue_sell(&self, result: Result<SellReceipt, CollaboratorError>) {
        self.next_sell.lock().unwrap().push(result);
    }
}

#[async_trait]
impl Trader for ScriptedTrader {
    fn name(&self) -> &str {
        &self.name
    }

    async fn buy_token(&self, _token_address: &str, _native_amount: Decimal, _options: &TraderOptions) -> Result<BuyReceipt, CollaboratorError> {
        let mut queue = self.next_buy.lock().unwrap();
        if queue.is_empty() {
            return Err(CollaboratorError::Other("ScriptedTrader: no buy response queued".to_string()));
        }
        queue.remove(0)
    }

    async fn sell_token(&self, _token_address: &str, _token_amount: Decimal, _options: &TraderOptions) -> Result<SellReceipt, CollaboratorError> {
        let mut queue = self.next_sell.lock().unwrap();
        if queue.is_empty() {
            return Err(CollaboratorError::Other("ScriptedTrader: no sell response queued".to_string()));
        }
        queue.remove(0)
    }
}
