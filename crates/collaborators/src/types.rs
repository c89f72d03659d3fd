use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A freshly-listed token as returned by the token listing source
/// (spec §6): `harvest() -> list of {address, symbol, blockchain, createdAt,
/// currentPrice?, creatorAddress?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestedToken {
    pub address: String,
    pub symbol: String,
    pub blockchain: String,
    pub created_at: DateTime<Utc>,
    pub current_price: Option<Decimal>,
    pub creator_address: Option<String>,
}

/// One entry of the market-data API's batched response (spec §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceQuote {
    pub price: Decimal,
    pub tx_volume_u_24h: Option<Decimal>,
    pub holders: Option<u64>,
    pub tvl: Option<Decimal>,
    pub fdv: Option<Decimal>,
    pub market_cap: Option<Decimal>,
}

/// One wallet balance entry (spec §6, live only). The native-currency
/// balance may arrive under a sentinel address; callers fall back to an
/// RPC call if it's absent (spec §6 note).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletBalance {
    pub symbol: String,
    pub token_address: String,
    pub balance: Decimal,
    pub value_usd: Decimal,
    pub average_purchase_price: Decimal,
    pub decimals: u8,
}

/// Sentinel address the wallet-info API uses for the chain's native coin.
pub const NATIVE_SENTINEL_ADDRESS: &str = "native";

/// Hints the scheduler passes along to the trader (spec §6 `maxSlippage`,
/// `maxGasPrice`, `maxGasLimit`).
#[derive(Debug, Clone, Default)]
pub struct TraderOptions {
    pub slippage_tolerance: Option<Decimal>,
    pub gas_price: Option<Decimal>,
    pub gas_limit: Option<u64>,
}

/// The uniform receipt shape a buy dispatch returns (spec §1, §6).
#[derive(Debug, Clone)]
pub struct BuyReceipt {
    pub success: bool,
    pub tx_hash: Option<String>,
    pub actual_amount_out: Option<Decimal>,
    pub gas_used: Option<Decimal>,
    pub error: Option<String>,
}

/// The uniform receipt shape a sell dispatch returns (spec §1, §6).
#[derive(Debug, Clone)]
pub struct SellReceipt {
    pub success: bool,
    pub tx_hash: Option<String>,
    pub actual_received: Option<Decimal>,
    pub gas_used: Option<Decimal>,
    pub error: Option<String>,
}
