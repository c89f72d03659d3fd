//! The on-chain trade-dispatch abstraction (spec §4.7 Live, §7
//! `SaturatedBondingCurve`). Generalizes `executor::exchange::Executor`'s
//! `SimulatedExecutor`/`LiveExecutor` split and `LimitOrderExecutor`'s
//! fallback-on-specific-error shape from the teacher repo into a single
//! primary/secondary trader selector over `collaborators::Trader`.

pub mod error;

pub use error::ExecutionError;

use collaborators::{BuyReceipt, CollaboratorError, SellReceipt, Trader, TraderOptions};
use rust_decimal::Decimal;
use std::sync::Arc;

/// The outcome of a dispatched buy or sell, carrying which trader actually
/// filled it so the caller can record `TradeMetadata.trader_used`
/// (spec §3, S6).
#[derive(Debug, Clone)]
pub struct Dispatched<R> {
    pub receipt: R,
    pub trader_used: String,
}

/// Selects a primary on-chain trader and falls back to a secondary on a
/// saturated-bonding-curve response (spec §4.7, §7, S6). Holds no mutable
/// state of its own — callers own the `Portfolio`/`TokenPool` updates that
/// follow a successful dispatch.
pub struct Executor {
    primary: Arc<dyn Trader>,
    secondary: Option<Arc<dyn Trader>>,
}

impl Executor {
    pub fn new(primary: Arc<dyn Trader>, secondary: Option<Arc<dyn Trader>>) -> Self {
        Self { primary, secondary }
    }

    /// True when the primary's failure is the "known error code" (spec §7)
    /// that licenses a secondary attempt, rather than a generic failure the
    /// caller should just surface.
    fn warrants_fallback(err: &CollaboratorError) -> bool {
        matches!(err, CollaboratorError::SaturatedBondingCurve)
    }

    pub async fn buy(
        &self,
        token_address: &str,
        native_amount: Decimal,
        options: &TraderOptions,
    ) -> Result<Dispatched<BuyReceipt>, ExecutionError> {
        match self.primary.buy_token(token_address, native_amount, options).await {
            Ok(receipt) if receipt.success => Ok(Dispatched {
                receipt,
                trader_used: self.primary.name().to_string(),
            }),
            Ok(receipt) => {
                tracing::warn!(trader = self.primary.name(), error = ?receipt.error, "primary trader buy refused");
                self.fallback_buy(token_address, native_amount, options).await
            }
            Err(err) if Self::warrants_fallback(&err) => {
                tracing::warn!(trader = self.primary.name(), %err, "primary trader saturated, attempting fallback");
                self.fallback_buy(token_address, native_amount, options).await
            }
            Err(err) => Err(ExecutionError::PrimaryFailed(err.to_string())),
        }
    }

    async fn fallback_buy(
        &self,
        token_address: &str,
        native_amount: Decimal,
        options: &TraderOptions,
    ) -> Result<Dispatched<BuyReceipt>, ExecutionError> {
        let Some(secondary) = &self.secondary else {
            return Err(ExecutionError::NoLiquidity);
        };
        match secondary.buy_token(token_address, native_amount, options).await {
            Ok(receipt) if receipt.success => Ok(Dispatched {
                receipt,
                trader_used: secondary.name().to_string(),
            }),
            Ok(receipt) => Err(ExecutionError::SecondaryFailed(
                receipt.error.unwrap_or_else(|| "no liquidity".to_string()),
            )),
            Err(err) => Err(ExecutionError::SecondaryFailed(err.to_string())),
        }
    }

    pub async fn sell(
        &self,
        token_address: &str,
        token_amount: Decimal,
        options: &TraderOptions,
    ) -> Result<Dispatched<SellReceipt>, ExecutionError> {
        match self.primary.sell_token(token_address, token_amount, options).await {
            Ok(receipt) if receipt.success => Ok(Dispatched {
                receipt,
                trader_used: self.primary.name().to_string(),
            }),
            Ok(receipt) => {
                tracing::warn!(trader = self.primary.name(), error = ?receipt.error, "primary trader sell refused");
                self.fallback_sell(token_address, token_amount, options).await
            }
            Err(err) if Self::warrants_fallback(&err) => {
                tracing::warn!(trader = self.primary.name(), %err, "primary trader saturated, attempting fallback");
                self.fallback_sell(token_address, token_amount, options).await
            }
            Err(err) => Err(ExecutionError::PrimaryFailed(err.to_string())),
        }
    }

    async fn fallback_sell(
        &self,
        token_address: &str,
        token_amount: Decimal,
        options: &TraderOptions,
    ) -> Result<Dispatched<SellReceipt>, ExecutionError> {
        let Some(secondary) = &self.secondary else {
            return Err(ExecutionError::NoLiquidity);
        };
        match secondary.sell_token(token_address, token_amount, options).await {
            Ok(receipt) if receipt.success => Ok(Dispatched {
                receipt,
                trader_used: secondary.name().to_string(),
            }),
            Ok(receipt) => Err(ExecutionError::SecondaryFailed(
                receipt.error.unwrap_or_else(|| "no liquidity".to_string()),
            )),
            Err(err) => Err(ExecutionError::SecondaryFailed(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collaborators::fakes::ScriptedTrader;
    use rust_decimal_macros::dec;

    fn opts() -> TraderOptions {
        TraderOptions::default()
    }

    #[tokio::test]
    async fn s6_falls_back_to_secondary_on_saturated_bonding_curve() {
        let primary = Arc::new(ScriptedTrader::new("primary"));
        primary.queue_buy(Err(CollaboratorError::SaturatedBondingCurve));
        let secondary = Arc::new(ScriptedTrader::new("secondary"));
        secondary.queue_buy(Ok(BuyReceipt {
            success: true,
            tx_hash: Some("0xabc".to_string()),
            actual_amount_out: Some(dec!(0.042)),
            gas_used: Some(dec!(21000)),
            error: None,
        }));

        let executor = Executor::new(primary, Some(secondary));
        let dispatched = executor.buy("0xtoken", dec!(1), &opts()).await.unwrap();

        assert_eq!(dispatched.trader_used, "secondary");
        assert_eq!(dispatched.receipt.actual_amount_out, Some(dec!(0.042)));
    }

    #[tokio::test]
    async fn no_secondary_configured_surfaces_no_liquidity() {
        let primary = Arc::new(ScriptedTrader::new("primary"));
        primary.queue_buy(Err(CollaboratorError::SaturatedBondingCurve));

        let executor = Executor::new(primary, None);
        let err = executor.buy("0xtoken", dec!(1), &opts()).await.unwrap_err();
        assert!(matches!(err, ExecutionError::NoLiquidity));
    }

    #[tokio::test]
    async fn primary_success_never_touches_secondary() {
        let primary = Arc::new(ScriptedTrader::new("primary"));
        primary.queue_sell(Ok(SellReceipt {
            success: true,
            tx_hash: Some("0xsell".to_string()),
            actual_received: Some(dec!(0.5)),
            gas_used: Some(dec!(21000)),
            error: None,
        }));
        let secondary = Arc::new(ScriptedTrader::new("secondary"));

        let executor = Executor::new(primary, Some(secondary));
        let dispatched = executor.sell("0xtoken", dec!(1), &opts()).await.unwrap();
        assert_eq!(dispatched.trader_used, "primary");
    }

    #[tokio::test]
    async fn generic_primary_error_is_not_retried() {
        let primary = Arc::new(ScriptedTrader::new("primary"));
        primary.queue_buy(Err(CollaboratorError::Transport("rpc".to_string(), "timeout".to_string())));

        let executor = Executor::new(primary, None);
        let err = executor.buy("0xtoken", dec!(1), &opts()).await.unwrap_err();
        assert!(matches!(err, ExecutionError::PrimaryFailed(_)));
    }
}
