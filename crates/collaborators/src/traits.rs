use crate::error::CollaboratorError;
use crate::types::{BuyReceipt, HarvestedToken, PriceQuote, SellReceipt, TraderOptions, WalletBalance};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Token listing source (spec §6): `harvest() -> list of newly listed
/// tokens`. Idempotent; called each round in virtual and live mode.
#[async_trait]
pub trait TokenListingSource: Send + Sync {
    async fn harvest(&self) -> Result<Vec<HarvestedToken>, CollaboratorError>;
}

/// Market-data API (spec §6): batched price + metrics lookup, up to 200 ids
/// per underlying HTTP call. `ids` are pre-formatted
/// `{address}-{canonicalSuffix}` (see `core_types::chain::market_data_id`);
/// implementations own the chunking, callers don't need to know the limit.
#[async_trait]
pub trait MarketDataApi: Send + Sync {
    async fn get_prices(&self, ids: &[String]) -> Result<HashMap<String, PriceQuote>, CollaboratorError>;
}

/// The maximum number of ids a single market-data request may carry
/// (spec §6).
pub const MARKET_DATA_BATCH_LIMIT: usize = 200;

/// Wallet-info API (live only, spec §6): reads on-chain balances. Must
/// include the native balance (possibly under `NATIVE_SENTINEL_ADDRESS`);
/// callers fetch it directly from the chain RPC if it's absent.
#[async_trait]
pub trait WalletInfoApi: Send + Sync {
    async fn get_wallet_balances(&self, address: &str, blockchain: &str) -> Result<Vec<WalletBalance>, CollaboratorError>;
}

/// On-chain trade dispatch (live only, spec §6). The engine selects a
/// primary trader and falls back to a secondary on specific error codes
/// (e.g. a saturated bonding curve) — see `execution::Executor`.
#[async_trait]
pub trait Trader: Send + Sync {
    fn name(&self) -> &str;

    async fn buy_token(
        &self,
        token_address: &str,
        native_amount: Decimal,
        options: &TraderOptions,
    ) -> Result<BuyReceipt, CollaboratorError>;

    async fn sell_token(
        &self,
        token_address: &str,
        token_amount: Decimal,
        options: &TraderOptions,
    ) -> Result<SellReceipt, CollaboratorError>;
}

/// Denylist service (live only, spec §6, §7 `DenylistedCreator`): pre-buy
/// creator check.
#[async_trait]
pub trait DenylistService: Send + Sync {
    async fn is_denylisted(&self, address: &str) -> Result<bool, CollaboratorError>;
}
