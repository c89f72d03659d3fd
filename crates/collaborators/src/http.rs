use crate::error::CollaboratorError;
use crate::retry::with_retry;
use crate::traits::{DenylistService, MarketDataApi, TokenListingSource, WalletInfoApi, MARKET_DATA_BATCH_LIMIT};
use crate::types::{HarvestedToken, PriceQuote, WalletBalance};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// A plain `reqwest`-backed collaborator, the same shape
/// `api_client::BinanceClient` uses: a base URL plus a shared `Client`, no
/// signing (these four collaborators are read-only public endpoints; only
/// the `Trader` in `execution` carries wallet credentials, and even that is
/// behind an opaque "submit transaction" call per spec §1's "DEX wire
/// encoding is out of scope").
#[derive(Debug, Clone)]
pub struct HttpCollaborator {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl HttpCollaborator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(250),
        }
    }

    pub fn with_retry_policy(mut self, max_retries: u32, retry_base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_base_delay = retry_base_delay;
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, CollaboratorError> {
        let url = format!("{}{}", self.base_url, path);
        with_retry(self.max_retries, self.retry_base_delay, || async {
            let response = self
                .client
                .get(&url)
                .query(query)
                .send()
                .await
                .map_err(|e| CollaboratorError::Transport(url.clone(), e.to_string()))?;

            if !response.status().is_success() {
                return Err(CollaboratorError::Transport(url.clone(), response.status().to_string()));
            }

            response
                .json::<T>()
                .await
                .map_err(|e| CollaboratorError::Decode(url.clone(), e.to_string()))
        })
        .await
    }
}

#[async_trait]
impl TokenListingSource for HttpCollaborator {
    async fn harvest(&self) -> Result<Vec<HarvestedToken>, CollaboratorError> {
        self.get_json("/tokens/listings", &[]).await
    }
}

#[derive(Debug, Deserialize)]
struct MarketDataResponse {
    quotes: HashMap<String, PriceQuote>,
}

#[async_trait]
impl MarketDataApi for HttpCollaborator {
    async fn get_prices(&self, ids: &[String]) -> Result<HashMap<String, PriceQuote>, CollaboratorError> {
        let mut combined = HashMap::with_capacity(ids.len());
        for chunk in ids.chunks(MARKET_DATA_BATCH_LIMIT) {
            let response: MarketDataResponse = self
                .get_json("/market-data/prices", &[("ids", chunk.join(","))])
                .await?;
            combined.extend(response.quotes);
        }
        Ok(combined)
    }
}

#[async_trait]
impl WalletInfoApi for HttpCollaborator {
    async fn get_wallet_balances(&self, address: &str, blockchain: &str) -> Result<Vec<WalletBalance>, CollaboratorError> {
        self.get_json(
            "/wallets/balances",
            &[("address", address.to_string()), ("blockchain", blockchain.to_string())],
        )
        .await
    }
}

#[derive(Debug, Deserialize)]
struct DenylistResponse {
    denylisted: bool,
}

#[async_trait]
impl DenylistService for HttpCollaborator {
    async fn is_denylisted(&self, address: &str) -> Result<bool, CollaboratorError> {
        let response: DenylistResponse = self
            .get_json("/denylist/check", &[("address", address.to_string())])
            .await?;
        Ok(response.denylisted)
    }
}
