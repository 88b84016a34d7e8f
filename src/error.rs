//! Error types for script building, address coding and signing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MultisigError {
    #[error("Invalid script: {0}")]
    InvalidScript(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Insufficient funds: {available} sat available, fee {fee} sat")]
    InsufficientFunds { available: u64, fee: u64 },

    #[error("Signature mismatch on input {0}")]
    SignatureMismatch(usize),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Input index {index} out of range for {count} inputs")]
    InputIndexOutOfRange { index: usize, count: usize },

    #[error("Redeem script requires {required} signatures, got {provided} keys")]
    ThresholdMismatch { required: usize, provided: usize },

    #[error("Public key {0} is not part of the redeem script")]
    KeyNotInScript(String),

    #[error("Public key {0} was supplied more than once")]
    DuplicateKey(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    External(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MultisigError>;
