use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("strategy '{strategy}' references unknown factor '{factor}'")]
    UnknownFactor { strategy: String, factor: String },

    #[error("condition for strategy '{strategy}' failed to parse: {message}")]
    ParseError { strategy: String, message: String },

    #[error("condition for strategy '{strategy}' failed to evaluate: {message}")]
    EvalError { strategy: String, message: String },
}
