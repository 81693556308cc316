//! Operation payloads carried inside a cross-chain message

use super::{token_to_u64, CodecError, CodecResult};

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operation tags understood by the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Deposit,
    Withdraw,
}

impl OperationKind {
    pub fn tag(&self) -> &'static str {
        match self {
            OperationKind::Deposit => "DEPOSIT",
            OperationKind::Withdraw => "WITHDRAW",
        }
    }
}

impl FromStr for OperationKind {
    type Err = CodecError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "DEPOSIT" => Ok(OperationKind::Deposit),
            "WITHDRAW" => Ok(OperationKind::Withdraw),
            other => Err(CodecError::UnknownOperation(other.to_string())),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A decoded operation with its parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Credit `user` with whatever token transfer accompanies the message
    Deposit { user: Address },
    /// Debit `user` on the remote ledger and send the funds to `destination_chain`
    Withdraw {
        user: Address,
        token: Address,
        amount: U256,
        destination_chain: u64,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Deposit { .. } => OperationKind::Deposit,
            Operation::Withdraw { .. } => OperationKind::Withdraw,
        }
    }

    /// ABI-encoded parameters for this operation
    pub fn encode_params(&self) -> Vec<u8> {
        match self {
            Operation::Deposit { user } => abi::encode(&[Token::Address(*user)]),
            Operation::Withdraw {
                user,
                token,
                amount,
                destination_chain,
            } => abi::encode(&[
                Token::Address(*user),
                Token::Address(*token),
                Token::Uint(*amount),
                Token::Uint(U256::from(*destination_chain)),
            ]),
        }
    }

    /// Full message payload: `abi.encode(string tag, bytes params)`
    pub fn encode(&self) -> Bytes {
        abi::encode(&[
            Token::String(self.kind().tag().to_string()),
            Token::Bytes(self.encode_params()),
        ])
        .into()
    }

    /// Split a payload into its raw tag and parameter bytes
    pub fn split_payload(payload: &[u8]) -> CodecResult<(String, Vec<u8>)> {
        let mut tokens = abi::decode(&[ParamType::String, ParamType::Bytes], payload)?.into_iter();
        let tag = tokens
            .next()
            .and_then(Token::into_string)
            .ok_or(CodecError::Malformed("operation tag"))?;
        let params = tokens
            .next()
            .and_then(Token::into_bytes)
            .ok_or(CodecError::Malformed("operation params"))?;
        Ok((tag, params))
    }

    /// Decode the parameters of a known operation kind
    pub fn decode_params(kind: OperationKind, params: &[u8]) -> CodecResult<Self> {
        match kind {
            OperationKind::Deposit => {
                let user = abi::decode(&[ParamType::Address], params)?
                    .pop()
                    .and_then(Token::into_address)
                    .ok_or(CodecError::Malformed("deposit params"))?;
                Ok(Operation::Deposit { user })
            }
            OperationKind::Withdraw => {
                let mut tokens = abi::decode(
                    &[
                        ParamType::Address,
                        ParamType::Address,
                        ParamType::Uint(256),
                        ParamType::Uint(64),
                    ],
                    params,
                )?
                .into_iter();
                let user = tokens
                    .next()
                    .and_then(Token::into_address)
                    .ok_or(CodecError::Malformed("withdraw user"))?;
                let token = tokens
                    .next()
                    .and_then(Token::into_address)
                    .ok_or(CodecError::Malformed("withdraw token"))?;
                let amount = tokens
                    .next()
                    .and_then(Token::into_uint)
                    .ok_or(CodecError::Malformed("withdraw amount"))?;
                let destination_chain = tokens
                    .next()
                    .ok_or(CodecError::Malformed("withdraw destination"))
                    .and_then(|t| token_to_u64(t, "withdraw destination"))?;
                Ok(Operation::Withdraw {
                    user,
                    token,
                    amount,
                    destination_chain,
                })
            }
        }
    }

    /// Decode a full payload; unknown tags fail with [`CodecError::UnknownOperation`]
    pub fn decode(payload: &[u8]) -> CodecResult<Self> {
        let (tag, params) = Self::split_payload(payload)?;
        let kind = OperationKind::from_str(&tag)?;
        Self::decode_params(kind, &params)
    }
}
