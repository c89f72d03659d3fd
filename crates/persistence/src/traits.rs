use crate::error::PersistenceError;
use crate::types::{RuntimeMetric, SignalFilter, TradeFilter};
use async_trait::async_trait;
use core_types::{Experiment, PortfolioSnapshot, TimeSeriesRecord, Token, Trade, TradeSignal};
use uuid::Uuid;

/// CRUD over the seven tables spec §6 names, narrowed to the four access
/// patterns the engine actually needs: insert, update-by-id,
/// select-by-experiment (+ filters), select-by-composite-key. The engine
/// core depends only on this trait, never on a concrete database (spec §6
/// treats persistence as an injected narrow-contract collaborator, the same
/// way `database::DbRepository` sits behind `engine` in the teacher repo,
/// except here the dependency runs the other way: through a trait object).
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn insert_experiment(&self, experiment: &Experiment) -> Result<(), PersistenceError>;
    async fn update_experiment(&self, experiment: &Experiment) -> Result<(), PersistenceError>;
    async fn get_experiment(&self, id: Uuid) -> Result<Experiment, PersistenceError>;

    async fn insert_token(&self, experiment_id: Uuid, token: &Token) -> Result<(), PersistenceError>;
    async fn update_token(&self, experiment_id: Uuid, token: &Token) -> Result<(), PersistenceError>;
    /// select-by-composite-key: a single token is addressed by
    /// `(experiment_id, address, blockchain)` per spec §4.1.
    async fn get_token(
        &self,
        experiment_id: Uuid,
        address: &str,
        blockchain: &str,
    ) -> Result<Option<Token>, PersistenceError>;
    async fn select_tokens_by_experiment(&self, experiment_id: Uuid) -> Result<Vec<Token>, PersistenceError>;

    async fn insert_signal(&self, signal: &TradeSignal) -> Result<(), PersistenceError>;
    async fn update_signal(&self, signal: &TradeSignal) -> Result<(), PersistenceError>;
    async fn select_signals_by_experiment(
        &self,
        experiment_id: Uuid,
        filter: &SignalFilter,
    ) -> Result<Vec<TradeSignal>, PersistenceError>;

    async fn insert_trade(&self, trade: &Trade) -> Result<(), PersistenceError>;
    async fn select_trades_by_experiment(
        &self,
        experiment_id: Uuid,
        filter: &TradeFilter,
    ) -> Result<Vec<Trade>, PersistenceError>;

    async fn insert_runtime_metric(&self, metric: &RuntimeMetric) -> Result<(), PersistenceError>;

    async fn insert_portfolio_snapshot(&self, snapshot: &PortfolioSnapshot) -> Result<(), PersistenceError>;
    async fn select_portfolio_snapshots_by_experiment(
        &self,
        experiment_id: Uuid,
    ) -> Result<Vec<PortfolioSnapshot>, PersistenceError>;

    async fn insert_time_series_record(&self, record: &TimeSeriesRecord) -> Result<(), PersistenceError>;
    /// Backtest's data source (spec §4.7 Backtest, §6): all records for an
    /// experiment, insertion-ordered by `loop_count` then `timestamp`, with
    /// an optional `(token_address, blockchain)` composite-key narrowing.
    async fn select_time_series_by_experiment(
        &self,
        experiment_id: Uuid,
        token_address: Option<&str>,
        blockchain: Option<&str>,
    ) -> Result<Vec<TimeSeriesRecord>, PersistenceError>;
}
