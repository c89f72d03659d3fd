//! The five external collaborators spec §6 treats as narrow-contract,
//! injected dependencies: token listing source, market-data API,
//! wallet-info API, on-chain trader, and denylist service.
//!
//! Every trait here is the contract; `http` provides one `reqwest`-backed
//! implementation per trait (the way `api_client::BinanceClient` implements
//! `ApiClient`), and `fakes` provides an in-memory test double for each, used
//! by this crate's own tests and by `engine`'s scheduler tests.

pub mod error;
pub mod fakes;
pub mod http;
pub mod retry;
pub mod traits;
pub mod types;

pub use error::CollaboratorError;
pub use http::HttpCollaborator;
pub use retry::with_retry;
pub use traits::{DenylistService, MarketDataApi, Trader, TokenListingSource, WalletInfoApi, MARKET_DATA_BATCH_LIMIT};
pub use types::{BuyReceipt, HarvestedToken, PriceQuote, SellReceipt, TraderOptions, WalletBalance, NATIVE_SENTINEL_ADDRESS};
