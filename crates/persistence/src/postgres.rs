//! `Postgres` — the JSONB-backed implementation of `Persistence`.
//!
//! Every table stores its typed payload as a single `data JSONB` column
//! alongside the scalar columns queries actually filter or order by,
//! following the `parameters JSONB` / `best_in_sample_parameters JSONB`
//! columns `database::DbRepository` already uses for data it only round-trips
//! rather than joins across. This keeps the seven tables spec §6 names to a
//! handful of indexed columns instead of exploding `Token`'s nested
//! `strategy_executions`/`card_allocation`/`price_history` into dozens of SQL
//! columns.
//!
//! Assumed schema (no migration is checked in — persistence internals are
//! explicitly out of scope, spec §1 Non-goals):
//!
//! ```sql
//! CREATE TABLE experiments (id UUID PRIMARY KEY, status TEXT NOT NULL, data JSONB NOT NULL);
//! CREATE TABLE tokens (experiment_id UUID NOT NULL, address TEXT NOT NULL, blockchain TEXT NOT NULL,
//!     data JSONB NOT NULL, PRIMARY KEY (experiment_id, address, blockchain));
//! CREATE TABLE strategy_signals (id UUID PRIMARY KEY, experiment_id UUID NOT NULL,
//!     token_address TEXT NOT NULL, executed BOOLEAN NOT NULL, data JSONB NOT NULL);
//! CREATE TABLE trades (id UUID PRIMARY KEY, experiment_id UUID NOT NULL,
//!     input_currency TEXT NOT NULL, output_currency TEXT NOT NULL, data JSONB NOT NULL);
//! CREATE TABLE runtime_metrics (experiment_id UUID NOT NULL, loop_count BIGINT NOT NULL,
//!     recorded_at TIMESTAMPTZ NOT NULL, data JSONB NOT NULL);
//! CREATE TABLE portfolio_snapshots (experiment_id UUID NOT NULL, loop_count BIGINT NOT NULL, data JSONB NOT NULL);
//! CREATE TABLE experiment_time_series_data (experiment_id UUID NOT NULL, token_address TEXT NOT NULL,
//!     blockchain TEXT NOT NULL, loop_count BIGINT NOT NULL, timestamp TIMESTAMPTZ NOT NULL, data JSONB NOT NULL);
//! ```
//!
//! Queries use runtime-checked `sqlx::query`/`query_as`, not the `query!`
//! macro family, since there is no live database for the macro to check
//! against at compile time (see `DESIGN.md`).

use crate::error::PersistenceError;
use crate::traits::Persistence;
use crate::types::{RuntimeMetric, SignalFilter, TradeFilter};
use async_trait::async_trait;
use core_types::{Experiment, PortfolioSnapshot, TimeSeriesRecord, Token, Trade, TradeSignal};
use dotenvy::dotenv;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::env;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Postgres {
    pool: PgPool,
}

impl Postgres {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reads `DATABASE_URL` from the environment (optionally via a `.env`
    /// file) and opens a pooled connection, the way `database::connect` does.
    pub async fn connect() -> Result<Self, PersistenceError> {
        let _ = dotenv();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| PersistenceError::ConnectionConfig("DATABASE_URL must be set".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&database_url)
            .await?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl Persistence for Postgres {
    async fn insert_experiment(&self, experiment: &Experiment) -> Result<(), PersistenceError> {
        let data = serde_json::to_value(experiment)?;
        sqlx::query("INSERT INTO experiments (id, status, data) VALUES ($1, $2, $3)")
            .bind(experiment.id)
            .bind(format!("{:?}", experiment.status))
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_experiment(&self, experiment: &Experiment) -> Result<(), PersistenceError> {
        let data = serde_json::to_value(experiment)?;
        sqlx::query("UPDATE experiments SET status = $1, data = $2 WHERE id = $3")
            .bind(format!("{:?}", experiment.status))
            .bind(data)
            .bind(experiment.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_experiment(&self, id: Uuid) -> Result<Experiment, PersistenceError> {
        let row = sqlx::query("SELECT data FROM experiments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PersistenceError::NotFound)?;
        let data: JsonValue = row.get("data");
        Ok(serde_json::from_value(data)?)
    }

    async fn insert_token(&self, experiment_id: Uuid, token: &Token) -> Result<(), PersistenceError> {
        let data = serde_json::to_value(token)?;
        sqlx::query(
            "INSERT INTO tokens (experiment_id, address, blockchain, data) VALUES ($1, $2, $3, $4)
             ON CONFLICT (experiment_id, address, blockchain) DO UPDATE SET data = EXCLUDED.data",
        )
        .bind(experiment_id)
        .bind(&token.address)
        .bind(&token.blockchain)
        .bind(data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_token(&self, experiment_id: Uuid, token: &Token) -> Result<(), PersistenceError> {
        let data = serde_json::to_value(token)?;
        sqlx::query(
            "UPDATE tokens SET data = $1 WHERE experiment_id = $2 AND address = $3 AND blockchain = $4",
        )
        .bind(data)
        .bind(experiment_id)
        .bind(&token.address)
        .bind(&token.blockchain)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_token(
        &self,
        experiment_id: Uuid,
        address: &str,
        blockchain: &str,
    ) -> Result<Option<Token>, PersistenceError> {
        let row = sqlx::query(
            "SELECT data FROM tokens WHERE experiment_id = $1 AND address = $2 AND blockchain = $3",
        )
        .bind(experiment_id)
        .bind(address)
        .bind(blockchain)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let data: JsonValue = row.get("data");
                Ok(Some(serde_json::from_value(data)?))
            }
            None => Ok(None),
        }
    }

    async fn select_tokens_by_experiment(&self, experiment_id: Uuid) -> Result<Vec<Token>, PersistenceError> {
        let rows = sqlx::query("SELECT data FROM tokens WHERE experiment_id = $1")
            .bind(experiment_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                let data: JsonValue = row.get("data");
                serde_json::from_value(data).map_err(PersistenceError::from)
            })
            .collect()
    }

    async fn insert_signal(&self, signal: &TradeSignal) -> Result<(), PersistenceError> {
        let data = serde_json::to_value(signal)?;
        sqlx::query(
            "INSERT INTO strategy_signals (id, experiment_id, token_address, executed, data) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(signal.id)
        .bind(signal.experiment_id)
        .bind(&signal.token_address)
        .bind(signal.outcome.executed)
        .bind(data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_signal(&self, signal: &TradeSignal) -> Result<(), PersistenceError> {
        let data = serde_json::to_value(signal)?;
        sqlx::query("UPDATE strategy_signals SET executed = $1, data = $2 WHERE id = $3")
            .bind(signal.outcome.executed)
            .bind(data)
            .bind(signal.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn select_signals_by_experiment(
        &self,
        experiment_id: Uuid,
        filter: &SignalFilter,
    ) -> Result<Vec<TradeSignal>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT data FROM strategy_signals
             WHERE experiment_id = $1
               AND ($2::text IS NULL OR token_address = $2)
               AND (NOT $3 OR executed = true)",
        )
        .bind(experiment_id)
        .bind(filter.token_address.as_deref())
        .bind(filter.executed_only)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                let data: JsonValue = row.get("data");
                serde_json::from_value(data).map_err(PersistenceError::from)
            })
            .collect()
    }

    async fn insert_trade(&self, trade: &Trade) -> Result<(), PersistenceError> {
        let data = serde_json::to_value(trade)?;
        sqlx::query(
            "INSERT INTO trades (id, experiment_id, input_currency, output_currency, data) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(trade.id)
        .bind(trade.experiment_id)
        .bind(&trade.input_currency)
        .bind(&trade.output_currency)
        .bind(data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn select_trades_by_experiment(
        &self,
        experiment_id: Uuid,
        filter: &TradeFilter,
    ) -> Result<Vec<Trade>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT data FROM trades
             WHERE experiment_id = $1
               AND ($2::text IS NULL OR input_currency = $2 OR output_currency = $2)",
        )
        .bind(experiment_id)
        .bind(filter.token_address.as_deref())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                let data: JsonValue = row.get("data");
                serde_json::from_value(data).map_err(PersistenceError::from)
            })
            .collect()
    }

    async fn insert_runtime_metric(&self, metric: &RuntimeMetric) -> Result<(), PersistenceError> {
        let data = serde_json::to_value(metric)?;
        sqlx::query(
            "INSERT INTO runtime_metrics (experiment_id, loop_count, recorded_at, data) VALUES ($1, $2, $3, $4)",
        )
        .bind(metric.experiment_id)
        .bind(metric.loop_count as i64)
        .bind(metric.recorded_at)
        .bind(data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_portfolio_snapshot(&self, snapshot: &PortfolioSnapshot) -> Result<(), PersistenceError> {
        let data = serde_json::to_value(snapshot)?;
        sqlx::query(
            "INSERT INTO portfolio_snapshots (experiment_id, loop_count, data) VALUES ($1, $2, $3)",
        )
        .bind(snapshot.experiment_id)
        .bind(snapshot.loop_count as i64)
        .bind(data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn select_portfolio_snapshots_by_experiment(
        &self,
        experiment_id: Uuid,
    ) -> Result<Vec<PortfolioSnapshot>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT data FROM portfolio_snapshots WHERE experiment_id = $1 ORDER BY loop_count ASC",
        )
        .bind(experiment_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                let data: JsonValue = row.get("data");
                serde_json::from_value(data).map_err(PersistenceError::from)
            })
            .collect()
    }

    async fn insert_time_series_record(&self, record: &TimeSeriesRecord) -> Result<(), PersistenceError> {
        let data = serde_json::to_value(record)?;
        sqlx::query(
            "INSERT INTO experiment_time_series_data
                (experiment_id, token_address, blockchain, loop_count, timestamp, data)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(record.experiment_id)
        .bind(&record.token_address)
        .bind(&record.blockchain)
        .bind(record.loop_count as i64)
        .bind(record.timestamp)
        .bind(data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn select_time_series_by_experiment(
        &self,
        experiment_id: Uuid,
        token_address: Option<&str>,
        blockchain: Option<&str>,
    ) -> Result<Vec<TimeSeriesRecord>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT data FROM experiment_time_series_data
             WHERE experiment_id = $1
               AND ($2::text IS NULL OR token_address = $2)
               AND ($3::text IS NULL OR blockchain = $3)
             ORDER BY loop_count ASC, timestamp ASC",
        )
        .bind(experiment_id)
        .bind(token_address)
        .bind(blockchain)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                let data: JsonValue = row.get("data");
                serde_json::from_value(data).map_err(PersistenceError::from)
            })
            .collect()
    }
}
