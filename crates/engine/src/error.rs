use thiserror::Error;

/// Errors the scheduler distinguishes by policy (spec §7). Most are handled
/// in place (logged and the round continues); only `Config`/`BacktestSourceMissing`
/// fail the experiment outright.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("holding sync failed: {0}")]
    Sync(String),

    #[error("collaborator error: {0}")]
    Collaborator(#[from] collaborators::CollaboratorError),

    #[error("execution error: {0}")]
    Execution(#[from] execution::ExecutionError),

    #[error("strategy error: {0}")]
    Strategy(#[from] strategies::StrategyError),

    #[error("card error: {0}")]
    Card(#[from] cards::error::CardError),

    #[error("portfolio error: {0}")]
    Portfolio(#[from] portfolio::error::PortfolioError),

    #[error("token pool error: {0}")]
    TokenPool(#[from] token_pool::error::TokenPoolError),

    #[error("persistence error: {0}")]
    Persistence(#[from] persistence::PersistenceError),

    #[error("backtest source experiment has no time-series data")]
    BacktestSourceMissing,

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
