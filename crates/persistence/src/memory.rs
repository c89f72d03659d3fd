//! An in-memory `Persistence` fake, the same "no network required" test
//! double shape `collaborators::fakes` uses for its HTTP-backed traits.

use crate::error::PersistenceError;
use crate::traits::Persistence;
use crate::types::{RuntimeMetric, SignalFilter, TradeFilter};
use async_trait::async_trait;
use core_types::{Experiment, PortfolioSnapshot, TimeSeriesRecord, Token, Trade, TradeSignal};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryPersistence {
    experiments: Mutex<HashMap<Uuid, Experiment>>,
    tokens: Mutex<HashMap<(Uuid, String, String), Token>>,
    signals: Mutex<HashMap<Uuid, TradeSignal>>,
    trades: Mutex<Vec<Trade>>,
    runtime_metrics: Mutex<Vec<RuntimeMetric>>,
    portfolio_snapshots: Mutex<Vec<PortfolioSnapshot>>,
    time_series: Mutex<Vec<TimeSeriesRecord>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Persistence for InMemoryPersistence {
    async fn insert_experiment(&self, experiment: &Experiment) -> Result<(), PersistenceError> {
        self.experiments.lock().unwrap().insert(experiment.id, experiment.clone());
        Ok(())
    }

    async fn update_experiment(&self, experiment: &Experiment) -> Result<(), PersistenceError> {
        let mut experiments = self.experiments.lock().unwrap();
        if !experiments.contains_key(&experiment.id) {
            return Err(PersistenceError::NotFound);
        }
        experiments.insert(experiment.id, experiment.clone());
        Ok(())
    }

    async fn get_experiment(&self, id: Uuid) -> Result<Experiment, PersistenceError> {
        self.experiments
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(PersistenceError::NotFound)
    }

    async fn insert_token(&self, experiment_id: Uuid, token: &Token) -> Result<(), PersistenceError> {
        self.tokens
            .lock()
            .unwrap()
            .insert((experiment_id, token.address.clone(), token.blockchain.clone()), token.clone());
        Ok(())
    }

    async fn update_token(&self, experiment_id: Uuid, token: &Token) -> Result<(), PersistenceError> {
        self.insert_token(experiment_id, token).await
    }

    async fn get_token(
        &self,
        experiment_id: Uuid,
        address: &str,
        blockchain: &str,
    ) -> Result<Option<Token>, PersistenceError> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .get(&(experiment_id, address.to_string(), blockchain.to_string()))
            .cloned())
    }

    async fn select_tokens_by_experiment(&self, experiment_id: Uuid) -> Result<Vec<Token>, PersistenceError> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .iter()
            .filter(|((exp_id, _, _), _)| *exp_id == experiment_id)
            .map(|(_, token)| token.clone())
            .collect())
    }

    async fn insert_signal(&self, signal: &TradeSignal) -> Result<(), PersistenceError> {
        self.signals.lock().unwrap().insert(signal.id, signal.clone());
        Ok(())
    }

    async fn update_signal(&self, signal: &TradeSignal) -> Result<(), PersistenceError> {
        let mut signals = self.signals.lock().unwrap();
        if !signals.contains_key(&signal.id) {
            return Err(PersistenceError::NotFound);
        }
        signals.insert(signal.id, signal.clone());
        Ok(())
    }

    async fn select_signals_by_experiment(
        &self,
        experiment_id: Uuid,
        filter: &SignalFilter,
    ) -> Result<Vec<TradeSignal>, PersistenceError> {
        Ok(self
            .signals
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.experiment_id == experiment_id)
            .filter(|s| filter.token_address.as_deref().is_none_or(|addr| addr == s.token_address))
            .filter(|s| !filter.executed_only || s.outcome.executed)
            .cloned()
            .collect())
    }

    async fn insert_trade(&self, trade: &Trade) -> Result<(), PersistenceError> {
        self.trades.lock().unwrap().push(trade.clone());
        Ok(())
    }

    async fn select_trades_by_experiment(
        &self,
        experiment_id: Uuid,
        filter: &TradeFilter,
    ) -> Result<Vec<Trade>, PersistenceError> {
        Ok(self
            .trades
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.experiment_id == experiment_id)
            .filter(|t| {
                filter
                    .token_address
                    .as_deref()
                    .is_none_or(|addr| addr == t.input_currency || addr == t.output_currency)
            })
            .cloned()
            .collect())
    }

    async fn insert_runtime_metric(&self, metric: &RuntimeMetric) -> Result<(), PersistenceError> {
        self.runtime_metrics.lock().unwrap().push(metric.clone());
        Ok(())
    }

    async fn insert_portfolio_snapshot(&self, snapshot: &PortfolioSnapshot) -> Result<(), PersistenceError> {
        self.portfolio_snapshots.lock().unwrap().push(snapshot.clone());
        Ok(())
    }

    async fn select_portfolio_snapshots_by_experiment(
        &self,
        experiment_id: Uuid,
    ) -> Result<Vec<PortfolioSnapshot>, PersistenceError> {
        Ok(self
            .portfolio_snapshots
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.experiment_id == experiment_id)
            .cloned()
            .collect())
    }

    async fn insert_time_series_record(&self, record: &TimeSeriesRecord) -> Result<(), PersistenceError> {
        self.time_series.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn select_time_series_by_experiment(
        &self,
        experiment_id: Uuid,
        token_address: Option<&str>,
        blockchain: Option<&str>,
    ) -> Result<Vec<TimeSeriesRecord>, PersistenceError> {
        let mut records: Vec<TimeSeriesRecord> = self
            .time_series
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.experiment_id == experiment_id)
            .filter(|r| token_address.is_none_or(|addr| addr == r.token_address))
            .filter(|r| blockchain.is_none_or(|chain| chain == r.blockchain))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.loop_count.cmp(&b.loop_count).then(a.timestamp.cmp(&b.timestamp)));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_types::{Experiment, ExperimentConfig, Mode};

    fn sample_experiment() -> Experiment {
        Experiment::new("s1".to_string(), Mode::Virtual, "ethereum".to_string(), ExperimentConfig::default())
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = InMemoryPersistence::new();
        let experiment = sample_experiment();
        store.insert_experiment(&experiment).await.unwrap();

        let fetched = store.get_experiment(experiment.id).await.unwrap();
        assert_eq!(fetched.id, experiment.id);
        assert_eq!(fetched.name, "s1");
    }

    #[tokio::test]
    async fn update_before_insert_is_not_found() {
        let store = InMemoryPersistence::new();
        let experiment = sample_experiment();
        let err = store.update_experiment(&experiment).await.unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound));
    }

    #[tokio::test]
    async fn time_series_select_is_loop_count_then_timestamp_ordered() {
        let store = InMemoryPersistence::new();
        let experiment_id = Uuid::new_v4();
        let base = Utc::now();

        for loop_count in [3u64, 1, 2] {
            store
                .insert_time_series_record(&TimeSeriesRecord {
                    experiment_id,
                    token_address: "0xabc".to_string(),
                    token_symbol: "ABC".to_string(),
                    timestamp: base,
                    loop_count,
                    factor_values: serde_json::json!({}),
                    price_usd: rust_decimal::Decimal::ONE,
                    blockchain: "ethereum".to_string(),
                })
                .await
                .unwrap();
        }

        let records = store
            .select_time_series_by_experiment(experiment_id, None, None)
            .await
            .unwrap();
        let loop_counts: Vec<u64> = records.iter().map(|r| r.loop_count).collect();
        assert_eq!(loop_counts, vec![1, 2, 3]);
    }
}
