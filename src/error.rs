//! Error types for the relayer

use crate::codec::CodecError;
use crate::contracts::ContractError;

use thiserror::Error;

/// Main error type for the relayer
#[derive(Error, Debug)]
pub enum RelayerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chain connection error for {chain}: {message}")]
    ChainConnection { chain: String, message: String },

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Contract call reverted: {0}")]
    Contract(#[from] ContractError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("Chain {chain} not found")]
    ChainNotFound { chain: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayerError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RelayerError::ChainConnection { .. } | RelayerError::Timeout { .. }
        )
    }

    /// Check if error should trigger an alert
    pub fn should_alert(&self) -> bool {
        matches!(
            self,
            RelayerError::Wallet(_)
                | RelayerError::Contract(ContractError::InsufficientFeeToken { .. })
        )
    }
}

/// Result type for relayer operations
pub type RelayerResult<T> = Result<T, RelayerError>;
