//! Cross-chain message envelopes, extra args and the authenticated report

use super::{selector, token_to_u64, CodecError, CodecResult, SELECTOR_LEN};

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};

/// Tag prefixing EVM extra args v1 (`bytes4(keccak256("CCIP EVMExtraArgsV1"))`)
pub const EVM_EXTRA_ARGS_V1_TAG: [u8; 4] = [0x97, 0xa6, 0x57, 0xc9];

/// Signature of the ledger's authenticated send entry point
pub const EXECUTE_SEND_SIGNATURE: &str =
    "executeSend(uint64,(bytes,bytes,(address,uint256)[],address,bytes))";

/// A single token transfer attached to a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    pub token: Address,
    pub amount: U256,
}

impl TokenAmount {
    fn param_type() -> ParamType {
        ParamType::Tuple(vec![ParamType::Address, ParamType::Uint(256)])
    }

    fn to_token(self) -> Token {
        Token::Tuple(vec![Token::Address(self.token), Token::Uint(self.amount)])
    }

    fn from_token(token: Token) -> CodecResult<Self> {
        let mut fields = token
            .into_tuple()
            .ok_or(CodecError::Malformed("token amount"))?
            .into_iter();
        let token = fields
            .next()
            .and_then(Token::into_address)
            .ok_or(CodecError::Malformed("token amount address"))?;
        let amount = fields
            .next()
            .and_then(Token::into_uint)
            .ok_or(CodecError::Malformed("token amount value"))?;
        Ok(Self { token, amount })
    }
}

/// Outbound message handed to the router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evm2AnyMessage {
    /// `abi.encode(receiver address)` on the destination chain
    pub receiver: Bytes,
    /// Operation payload
    pub data: Bytes,
    /// Zero or one token transfer
    pub token_amounts: Vec<TokenAmount>,
    /// Token the relay fee is paid in
    pub fee_token: Address,
    pub extra_args: Bytes,
}

impl Evm2AnyMessage {
    pub fn param_type() -> ParamType {
        ParamType::Tuple(vec![
            ParamType::Bytes,
            ParamType::Bytes,
            ParamType::Array(Box::new(TokenAmount::param_type())),
            ParamType::Address,
            ParamType::Bytes,
        ])
    }

    pub fn to_token(&self) -> Token {
        Token::Tuple(vec![
            Token::Bytes(self.receiver.to_vec()),
            Token::Bytes(self.data.to_vec()),
            Token::Array(self.token_amounts.iter().map(|t| t.to_token()).collect()),
            Token::Address(self.fee_token),
            Token::Bytes(self.extra_args.to_vec()),
        ])
    }

    pub fn from_token(token: Token) -> CodecResult<Self> {
        let mut fields = token
            .into_tuple()
            .ok_or(CodecError::Malformed("message"))?
            .into_iter();
        let receiver = fields
            .next()
            .and_then(Token::into_bytes)
            .ok_or(CodecError::Malformed("message receiver"))?;
        let data = fields
            .next()
            .and_then(Token::into_bytes)
            .ok_or(CodecError::Malformed("message data"))?;
        let token_amounts = fields
            .next()
            .and_then(Token::into_array)
            .ok_or(CodecError::Malformed("message token amounts"))?
            .into_iter()
            .map(TokenAmount::from_token)
            .collect::<CodecResult<Vec<_>>>()?;
        let fee_token = fields
            .next()
            .and_then(Token::into_address)
            .ok_or(CodecError::Malformed("message fee token"))?;
        let extra_args = fields
            .next()
            .and_then(Token::into_bytes)
            .ok_or(CodecError::Malformed("message extra args"))?;

        Ok(Self {
            receiver: receiver.into(),
            data: data.into(),
            token_amounts,
            fee_token,
            extra_args: extra_args.into(),
        })
    }

    /// Standalone ABI encoding of the message tuple
    pub fn abi_encode(&self) -> Vec<u8> {
        abi::encode(&[self.to_token()])
    }

    pub fn abi_decode(data: &[u8]) -> CodecResult<Self> {
        let token = abi::decode(&[Self::param_type()], data)?
            .pop()
            .ok_or(CodecError::Malformed("message"))?;
        Self::from_token(token)
    }

    /// The transfer the protocol honors, if any
    pub fn first_transfer(&self) -> Option<&TokenAmount> {
        self.token_amounts.first()
    }
}

/// Message as delivered to a receiver on the destination chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Any2EvmMessage {
    pub message_id: H256,
    pub source_chain_selector: u64,
    /// `abi.encode(sender address)` on the source chain
    pub sender: Bytes,
    pub data: Bytes,
    pub dest_token_amounts: Vec<TokenAmount>,
}

/// Encode destination extra args; no override means empty bytes
pub fn encode_extra_args(gas_limit: Option<u64>) -> Bytes {
    match gas_limit {
        Some(limit) => {
            let mut out = EVM_EXTRA_ARGS_V1_TAG.to_vec();
            out.extend(abi::encode(&[Token::Uint(U256::from(limit))]));
            out.into()
        }
        None => Bytes::default(),
    }
}

/// Decode extra args back into the gas limit, `None` for empty bytes
pub fn decode_extra_args(extra_args: &[u8]) -> CodecResult<Option<U256>> {
    if extra_args.is_empty() {
        return Ok(None);
    }
    if extra_args.len() < SELECTOR_LEN || extra_args[..SELECTOR_LEN] != EVM_EXTRA_ARGS_V1_TAG {
        return Err(CodecError::Malformed("extra args tag"));
    }
    let limit = abi::decode(&[ParamType::Uint(256)], &extra_args[SELECTOR_LEN..])?
        .pop()
        .and_then(Token::into_uint)
        .ok_or(CodecError::Malformed("extra args gas limit"))?;
    Ok(Some(limit))
}

pub fn execute_send_selector() -> [u8; SELECTOR_LEN] {
    selector(EXECUTE_SEND_SIGNATURE)
}

/// Report body: `executeSend` selector followed by `abi.encode(uint64, message)`
pub fn encode_execute_send(destination_chain: u64, message: &Evm2AnyMessage) -> Bytes {
    let mut out = execute_send_selector().to_vec();
    out.extend(abi::encode(&[
        Token::Uint(U256::from(destination_chain)),
        message.to_token(),
    ]));
    out.into()
}

/// Decode the arguments that follow the `executeSend` selector
pub fn decode_execute_send_args(args: &[u8]) -> CodecResult<(u64, Evm2AnyMessage)> {
    let mut tokens = abi::decode(&[ParamType::Uint(64), Evm2AnyMessage::param_type()], args)?
        .into_iter();
    let destination_chain = tokens
        .next()
        .ok_or(CodecError::Malformed("destination chain"))
        .and_then(|t| token_to_u64(t, "destination chain"))?;
    let message = tokens
        .next()
        .ok_or(CodecError::Malformed("message"))
        .and_then(Evm2AnyMessage::from_token)?;
    Ok((destination_chain, message))
}
