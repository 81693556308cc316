//! Calldata for the read-only queries and the report submission

use super::{selector, token_to_u64, CodecError, CodecResult, Evm2AnyMessage, SELECTOR_LEN};

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, U256};

pub const BALANCE_OF_SIGNATURE: &str = "balanceOf(address)";
pub const GET_FEE_SIGNATURE: &str =
    "getFee(uint64,(bytes,bytes,(address,uint256)[],address,bytes))";
pub const ON_REPORT_SIGNATURE: &str = "onReport(bytes,bytes)";

/// `balanceOf(holder)` calldata
pub fn encode_balance_of(holder: Address) -> Bytes {
    let mut out = selector(BALANCE_OF_SIGNATURE).to_vec();
    out.extend(abi::encode(&[Token::Address(holder)]));
    out.into()
}

/// `getFee(destinationChain, message)` calldata for the router
pub fn encode_get_fee(destination_chain: u64, message: &Evm2AnyMessage) -> Bytes {
    let mut out = selector(GET_FEE_SIGNATURE).to_vec();
    out.extend(abi::encode(&[
        Token::Uint(U256::from(destination_chain)),
        message.to_token(),
    ]));
    out.into()
}

/// `onReport(metadata, report)` calldata for the ledger
pub fn encode_on_report(metadata: &[u8], report: &[u8]) -> Bytes {
    let mut out = selector(ON_REPORT_SIGNATURE).to_vec();
    out.extend(abi::encode(&[
        Token::Bytes(metadata.to_vec()),
        Token::Bytes(report.to_vec()),
    ]));
    out.into()
}

/// Decode a single `uint256` return value
pub fn decode_uint(data: &[u8]) -> CodecResult<U256> {
    abi::decode(&[ParamType::Uint(256)], data)?
        .pop()
        .and_then(Token::into_uint)
        .ok_or(CodecError::Malformed("uint256 return value"))
}

/// Read-only calls a chain environment answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadCall {
    BalanceOf { holder: Address },
    GetFee {
        destination_chain: u64,
        message: Evm2AnyMessage,
    },
}

impl ReadCall {
    pub fn decode(calldata: &[u8]) -> CodecResult<Self> {
        if calldata.len() < SELECTOR_LEN {
            return Err(CodecError::Malformed("calldata"));
        }
        let (head, args) = calldata.split_at(SELECTOR_LEN);

        if head == selector(BALANCE_OF_SIGNATURE) {
            let holder = abi::decode(&[ParamType::Address], args)?
                .pop()
                .and_then(Token::into_address)
                .ok_or(CodecError::Malformed("balanceOf holder"))?;
            return Ok(ReadCall::BalanceOf { holder });
        }

        if head == selector(GET_FEE_SIGNATURE) {
            let mut tokens =
                abi::decode(&[ParamType::Uint(64), Evm2AnyMessage::param_type()], args)?
                    .into_iter();
            let destination_chain = tokens
                .next()
                .ok_or(CodecError::Malformed("getFee destination"))
                .and_then(|t| token_to_u64(t, "getFee destination"))?;
            let message = tokens
                .next()
                .ok_or(CodecError::Malformed("getFee message"))
                .and_then(Evm2AnyMessage::from_token)?;
            return Ok(ReadCall::GetFee {
                destination_chain,
                message,
            });
        }

        Err(CodecError::SelectorMismatch {
            expected: format!(
                "{}|{}",
                hex::encode(selector(BALANCE_OF_SIGNATURE)),
                hex::encode(selector(GET_FEE_SIGNATURE))
            ),
            actual: hex::encode(head),
        })
    }
}
