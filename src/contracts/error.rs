//! Error taxonomy for ledger, receiver and router calls
//!
//! A call that returns any of these has no effect: the chain environment
//! restores its pre-call snapshot before surfacing the error.

use crate::codec::CodecError;

use ethers::types::{Address, U256};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Insufficient balance of {token:?}: available {available}, required {required}")]
    InsufficientBalance {
        token: Address,
        available: U256,
        required: U256,
    },

    #[error("Insufficient fee token: available {available}, required {required}")]
    InsufficientFeeToken { available: U256, required: U256 },

    #[error("Caller {caller:?} is not authorized")]
    Unauthorized { caller: Address },

    #[error("Invalid report: {0}")]
    InvalidReport(String),

    #[error("Source chain {0} is not allowlisted")]
    SourceChainNotAllowed(u64),

    #[error("Sender {0:?} is not allowlisted")]
    SenderNotAllowed(Address),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Caller {0:?} is not the router")]
    InvalidRouter(Address),

    #[error("Caller {0:?} is not the pending owner")]
    NotPendingOwner(Address),

    #[error("Address must not be zero")]
    ZeroAddress,

    #[error("Receiver has no target ledger")]
    LedgerNotConfigured,

    #[error("Destination chain {0} is not supported by the router")]
    UnsupportedDestinationChain(u64),

    #[error("Token {token:?} balance of {holder:?} too low: available {available}, required {required}")]
    InsufficientTokenBalance {
        token: Address,
        holder: Address,
        available: U256,
        required: U256,
    },

    #[error("Token {token:?} allowance of {spender:?} too low: available {available}, required {required}")]
    InsufficientAllowance {
        token: Address,
        spender: Address,
        available: U256,
        required: U256,
    },

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Result type for contract calls
pub type ContractResult<T> = Result<T, ContractError>;
