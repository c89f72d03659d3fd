use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("primary trader failed: {0}")]
    PrimaryFailed(String),

    #[error("secondary trader also failed: {0}")]
    SecondaryFailed(String),

    #[error("no liquidity available from any configured trader")]
    NoLiquidity,
}
