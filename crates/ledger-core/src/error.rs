use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("amount {amount} exceeds balance {balance}")]
    InsufficientBalance { amount: u64, balance: u64 },

    #[error("transaction has no output for the sender")]
    MissingSenderOutput,

    #[error("invalid chain: {0}")]
    InvalidChain(String),

    #[error("received chain of length {candidate} is not longer than local chain of length {local}")]
    ChainNotLonger { candidate: usize, local: usize },

    #[error("block built on {expected} but chain tip is {found}")]
    StaleTip { expected: String, found: String },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
