use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to load environment variables for database connection: {0}")]
    ConnectionConfig(String),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record not found")]
    NotFound,
}
