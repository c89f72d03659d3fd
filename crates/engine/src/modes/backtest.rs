//! Backtest mode (spec §4.7): replays a source experiment's recorded
//! time-series data one `loop_count` group per round instead of calling any
//! live collaborator, and never writes its own time-series (it would
//! overwrite the very data it is replaying).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use collaborators::{HarvestedToken, PriceQuote, TraderOptions};
use core_types::ledger::Portfolio;
use core_types::token::Token;
use core_types::TimeSeriesRecord;
use factors::FactorMap;
use persistence::Persistence;
use rust_decimal::Decimal;
use token_pool::TokenPool;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::adapter::{ModeAdapter, TradeDispatchOutcome};
use crate::error::EngineError;
use crate::modes::virtual_mode::{synthetic_buy, synthetic_sell};

pub struct BacktestAdapter {
    groups: Vec<Vec<TimeSeriesRecord>>,
    cursor: Mutex<usize>,
    /// The just-read round's persisted factor snapshots, keyed by
    /// `(token_address, blockchain)`. Populated by `refresh_prices` before it
    /// advances the cursor, so `replayed_factors` can still serve the round
    /// that was just read once `refresh_prices` has moved past it (spec
    /// §4.5: strategy decisions must replay from the persisted snapshot, not
    /// a token rebuilt from price alone).
    current_round_factors: Mutex<HashMap<(String, String), FactorMap>>,
}

impl BacktestAdapter {
    /// Loads every time-series record the source experiment recorded
    /// (spec §4.7 Backtest, §6), grouped by `loop_count` in replay order.
    /// Errors with `BacktestSourceMissing` if the source recorded nothing
    /// (spec §7).
    pub async fn load(persistence: &Arc<dyn Persistence>, source_experiment_id: Uuid) -> Result<Self, EngineError> {
        let mut records = persistence
            .select_time_series_by_experiment(source_experiment_id, None, None)
            .await?;
        if records.is_empty() {
            return Err(EngineError::BacktestSourceMissing);
        }
        records.sort_by(|a, b| a.loop_count.cmp(&b.loop_count).then(a.timestamp.cmp(&b.timestamp)));

        let mut groups: Vec<Vec<TimeSeriesRecord>> = Vec::new();
        for record in records {
            match groups.last_mut() {
                Some(group) if group[0].loop_count == record.loop_count => group.push(record),
                _ => groups.push(vec![record]),
            }
        }

        tracing::info!(
            source_experiment_id = %source_experiment_id,
            rounds = groups.len(),
            "loaded backtest source time-series"
        );
        Ok(Self {
            groups,
            cursor: Mutex::new(0),
            current_round_factors: Mutex::new(HashMap::new()),
        })
    }

    async fn current_group(&self) -> Option<Vec<TimeSeriesRecord>> {
        let cursor = *self.cursor.lock().await;
        self.groups.get(cursor).cloned()
    }
}

#[async_trait]
impl ModeAdapter for BacktestAdapter {
    async fn sync_holdings(&self, _pool: &mut TokenPool, _portfolio: &mut Portfolio) -> Result<(), EngineError> {
        Ok(())
    }

    async fn harvest_tokens(&self) -> Result<Vec<HarvestedToken>, EngineError> {
        let Some(group) = self.current_group().await else {
            return Ok(Vec::new());
        };
        let mut seen = HashSet::new();
        let mut harvested = Vec::new();
        for record in &group {
            let key = (record.token_address.clone(), record.blockchain.clone());
            if seen.insert(key) {
                harvested.push(HarvestedToken {
                    address: record.token_address.clone(),
                    symbol: record.token_symbol.clone(),
                    blockchain: record.blockchain.clone(),
                    created_at: record.timestamp,
                    current_price: Some(record.price_usd),
                    creator_address: None,
                });
            }
        }
        Ok(harvested)
    }

    async fn refresh_prices(&self, _ids: &[String]) -> Result<HashMap<String, PriceQuote>, EngineError> {
        let Some(group) = self.current_group().await else {
            return Ok(HashMap::new());
        };
        let mut quotes = HashMap::new();
        let mut round_factors = HashMap::new();
        for record in &group {
            let id = core_types::chain::market_data_id(&record.token_address, &record.blockchain);
            quotes.insert(
                id,
                PriceQuote {
                    price: record.price_usd,
                    ..PriceQuote::default()
                },
            );

            match serde_json::from_value::<FactorMap>(record.factor_values.clone()) {
                Ok(factor_map) => {
                    round_factors.insert((record.token_address.clone(), record.blockchain.clone()), factor_map);
                }
                Err(err) => tracing::warn!(
                    %err,
                    token_address = %record.token_address,
                    loop_count = record.loop_count,
                    "failed to deserialize persisted factor snapshot, falling back to a rebuilt factor map"
                ),
            }
        }
        *self.current_round_factors.lock().await = round_factors;

        // Advance to the next round only after this round's snapshot has
        // been read in full; `harvest_tokens` and `refresh_prices` both read
        // the group at the pre-advance cursor.
        let mut cursor = self.cursor.lock().await;
        *cursor += 1;

        Ok(quotes)
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

    /// Returns this round's persisted factor snapshot verbatim instead of
    /// letting the scheduler rebuild one from a price-only replayed token
    /// (spec §4.5, §8 S8): the replayed token has no wallet/market metrics
    /// and a fresh price history, so a rebuilt factor map would zero out
    /// every non-price-derived factor (`holders`, `tvl`, trend factors, …).
    async fn replayed_factors(&self, address: &str, blockchain: &str) -> Option<FactorMap> {
        self.current_round_factors
            .lock()
            .await
            .get(&(address.to_string(), blockchain.to_string()))
            .cloned()
    }

    fn should_record_time_series(&self) -> bool {
        false
    }

    async fn has_more_rounds(&self) -> bool {
        let cursor = *self.cursor.lock().await;
        cursor < self.groups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use persistence::InMemoryPersistence;
    use rust_decimal_macros::dec;
    use serde_json::json;

    async fn seeded_persistence(experiment_id: Uuid) -> Arc<dyn Persistence> {
        let persistence: Arc<dyn Persistence> = Arc::new(InMemoryPersistence::default());
        for (loop_count, price) in [(1u64, dec!(1)), (1, dec!(1)), (2, dec!(2))] {
            persistence
                .insert_time_series_record(&TimeSeriesRecord {
                    experiment_id,
                    token_address: "0xabc".to_string(),
                    token_symbol: "ABC".to_string(),
                    timestamp: Utc::now(),
                    loop_count,
                    price_usd: price,
                    factor_values: json!({}),
                    blockchain: "ethereum".to_string(),
                })
                .await
                .unwrap();
        }
        persistence
    }

    #[tokio::test]
    async fn errors_when_the_source_experiment_recorded_nothing() {
        let persistence: Arc<dyn Persistence> = Arc::new(InMemoryPersistence::default());
        let err = BacktestAdapter::load(&persistence, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, EngineError::BacktestSourceMissing));
    }

    #[tokio::test]
    async fn replays_one_loop_count_group_per_round_and_terminates() {
        let experiment_id = Uuid::new_v4();
        let persistence = seeded_persistence(experiment_id).await;
        let adapter = BacktestAdapter::load(&persistence, experiment_id).await.unwrap();

        assert!(adapter.has_more_rounds().await);
        let ids = vec![core_types::chain::market_data_id("0xabc", "ethereum")];
        let quotes = adapter.refresh_prices(&ids).await.unwrap();
        assert_eq!(quotes.len(), 1);

        assert!(adapter.has_more_rounds().await);
        let quotes = adapter.refresh_prices(&ids).await.unwrap();
        assert_eq!(quotes.get(&ids[0]).unwrap().price, dec!(2));

        assert!(!adapter.has_more_rounds().await);
    }

    #[test]
    fn never_records_its_own_time_series() {
        let adapter = BacktestAdapter {
            groups: Vec::new(),
            cursor: Mutex::new(0),
            current_round_factors: Mutex::new(HashMap::new()),
        };
        assert!(!adapter.should_record_time_series());
    }

    /// S8 (spec §8): a factor the default strategies never key on (here
    /// `holders`) must still come back byte-equivalent from replay, proving
    /// backtest serves the persisted snapshot rather than a factor map
    /// rebuilt from a metrics-less replayed token.
    #[tokio::test]
    async fn replayed_factors_returns_the_persisted_snapshot_verbatim() {
        let experiment_id = Uuid::new_v4();
        let persistence: Arc<dyn Persistence> = Arc::new(InMemoryPersistence::default());
        persistence
            .insert_time_series_record(&TimeSeriesRecord {
                experiment_id,
                token_address: "0xabc".to_string(),
                token_symbol: "ABC".to_string(),
                timestamp: Utc::now(),
                loop_count: 1,
                price_usd: dec!(1),
                factor_values: json!({"holders": 4321.0, "earlyReturn": 12.5}),
                blockchain: "ethereum".to_string(),
            })
            .await
            .unwrap();

        let adapter = BacktestAdapter::load(&persistence, experiment_id).await.unwrap();
        assert!(adapter.replayed_factors("0xabc", "ethereum").await.is_none());

        let ids = vec![core_types::chain::market_data_id("0xabc", "ethereum")];
        adapter.refresh_prices(&ids).await.unwrap();

        let factors = adapter
            .replayed_factors("0xabc", "ethereum")
            .await
            .expect("persisted factor snapshot must be available after refresh_prices");
        assert_eq!(factors.get("holders"), Some(&4321.0));
        assert_eq!(factors.get("earlyReturn"), Some(&12.5));
    }
}
