use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardError {
    #[error("invalid card split: native_cards ({native}) + token_cards ({token}) must equal total_cards ({total})")]
    UnbalancedSplit { native: u32, token: u32, total: u32 },

    #[error("total_cards ({0}) must be between 2 and 36")]
    TotalCardsOutOfRange(u32),
}
