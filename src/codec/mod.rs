//! Wire codec for cross-chain settlement messages
//!
//! Everything that crosses a chain boundary or a contract boundary is ABI
//! encoded here:
//! - Operation payloads (`abi.encode(string op, bytes params)`)
//! - Outbound (`Evm2AnyMessage`) and inbound (`Any2EvmMessage`) envelopes
//! - Destination extra args (`0x97a657c9 ++ abi.encode(uint256 gasLimit)`)
//! - Authenticated reports and read-only calldata

mod calls;
mod message;
mod operation;

pub use calls::{
    decode_uint, encode_balance_of, encode_get_fee, encode_on_report, ReadCall,
    BALANCE_OF_SIGNATURE, GET_FEE_SIGNATURE, ON_REPORT_SIGNATURE,
};
pub use message::{
    decode_execute_send_args, decode_extra_args, encode_execute_send, encode_extra_args,
    execute_send_selector, Any2EvmMessage, Evm2AnyMessage, TokenAmount,
    EVM_EXTRA_ARGS_V1_TAG, EXECUTE_SEND_SIGNATURE,
};
pub use operation::{Operation, OperationKind};

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, H256};
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Length of a function selector in bytes
pub const SELECTOR_LEN: usize = 4;

/// Codec failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("ABI decoding failed: {0}")]
    Abi(String),

    #[error("Unknown operation tag: {0}")]
    UnknownOperation(String),

    #[error("Malformed {0}")]
    Malformed(&'static str),

    #[error("Selector mismatch: expected 0x{expected}, got 0x{actual}")]
    SelectorMismatch { expected: String, actual: String },
}

impl From<abi::Error> for CodecError {
    fn from(e: abi::Error) -> Self {
        CodecError::Abi(e.to_string())
    }
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Keccak-256 digest
pub fn keccak256(data: impl AsRef<[u8]>) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data.as_ref());
    hasher.finalize().into()
}

/// Function selector: first four bytes of the signature hash
pub fn selector(signature: &str) -> [u8; SELECTOR_LEN] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Event topic0: full signature hash
pub fn event_topic(signature: &str) -> H256 {
    H256(keccak256(signature.as_bytes()))
}

/// Left-pad an address into a 32-byte topic word
pub fn address_topic(address: Address) -> H256 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    H256(word)
}

/// Right-aligned u64 in a 32-byte topic word
pub fn u64_topic(value: u64) -> H256 {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    H256(word)
}

/// Read an address back out of a topic word
pub fn topic_address(topic: &H256) -> Address {
    Address::from_slice(&topic.as_bytes()[12..])
}

/// `abi.encode(address)`, used for message receivers and senders
pub fn encode_address(address: Address) -> Bytes {
    abi::encode(&[Token::Address(address)]).into()
}

/// Inverse of [`encode_address`]
pub fn decode_address(data: &[u8]) -> CodecResult<Address> {
    let mut tokens = abi::decode(&[ParamType::Address], data)?;
    tokens
        .pop()
        .and_then(Token::into_address)
        .ok_or(CodecError::Malformed("address"))
}

pub(crate) fn token_to_u64(token: Token, what: &'static str) -> CodecResult<u64> {
    let value = token.into_uint().ok_or(CodecError::Malformed(what))?;
    if value > ethers::types::U256::from(u64::MAX) {
        return Err(CodecError::Malformed(what));
    }
    Ok(value.as_u64())
}
