use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Price unavailable for {symbol}")]
    PriceUnavailable { symbol: String },

    #[error("Liquidation is already executing")]
    Busy,

    #[error("Liquidation already completed")]
    AlreadyCompleted,

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Invalid wizard step: {0}")]
    InvalidStep(String),
}

pub type Result<T> = std::result::Result<T, Error>;
