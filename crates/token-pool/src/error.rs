use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenPoolError {
    #[error("token not found: {0} on {1}")]
    TokenNotFound(String, String),
}
