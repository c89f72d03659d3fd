use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: String, available: String },

    #[error("position not found for address: {0}")]
    PositionNotFound(String),

    #[error("cannot sell {requested} of {address}: only {available} held")]
    InsufficientHoldings {
        address: String,
        requested: String,
        available: String,
    },
}
