use thiserror::Error;

/// Errors produced while encoding or decoding records.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("record encoding failed: {0}")]
    Encode(String),

    #[error("record decoding failed: {0}")]
    Decode(String),

    #[error("pledge total overflow: {current} + {amount}")]
    PledgeOverflow { current: i64, amount: i64 },
}
