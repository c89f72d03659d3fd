use thiserror::Error;

/// Errors surfaced by the five narrow-contract external collaborators
/// (spec §6, §7). These are returned to the scheduler, never thrown across
/// it: every collaborator call resolves to a `Result`, and the caller decides
/// whether to log-and-continue (`SyncError`, `PriceUnavailable`) or fail
/// initialization (`ConfigError`'s engine-side counterparts live in `engine`).
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("request to {0} failed: {1}")]
    Transport(String, String),

    #[error("{0} returned an unexpected response shape: {1}")]
    Decode(String, String),

    #[error("trade execution failed: {0}")]
    TradeExecutionError(String),

    #[error("bonding curve saturated")]
    SaturatedBondingCurve,

    #[error("wallet is denylisted: {0}")]
    DenylistedCreator(String),

    #[error("{0}")]
    Other(String),
}
