//! In-memory transport router for one chain
//!
//! Quotes a flat fee per supported destination, pulls the fee and the
//! attached tokens from the sender through allowances, assigns message ids
//! and keeps an outbox the transport drains.

use super::error::{ContractError, ContractResult};
use super::token::TokenBook;
use crate::codec::{keccak256, Evm2AnyMessage};

use ethers::abi::{self, Token};
use ethers::types::{Address, H256, U256};
use std::collections::HashMap;

/// A message accepted for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRecord {
    pub message_id: H256,
    pub source_chain: u64,
    pub destination_chain: u64,
    pub sender: Address,
    pub message: Evm2AnyMessage,
}

#[derive(Debug, Clone)]
pub struct LocalRouter {
    address: Address,
    /// Selector of the chain this router lives on
    chain_selector: u64,
    /// destination selector -> flat fee
    fees: HashMap<u64, U256>,
    nonce: u64,
    outbox: Vec<OutboundRecord>,
}

impl LocalRouter {
    pub fn new(address: Address, chain_selector: u64) -> Self {
        Self {
            address,
            chain_selector,
            fees: HashMap::new(),
            nonce: 0,
            outbox: Vec::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Enable `destination` with a flat relay fee
    pub fn set_fee(&mut self, destination: u64, fee: U256) {
        self.fees.insert(destination, fee);
    }

    pub fn is_supported(&self, destination: u64) -> bool {
        self.fees.contains_key(&destination)
    }

    pub fn get_fee(&self, destination: u64, _message: &Evm2AnyMessage) -> ContractResult<U256> {
        self.fees
            .get(&destination)
            .copied()
            .ok_or(ContractError::UnsupportedDestinationChain(destination))
    }

    /// Accept `message` from `sender`, collecting the fee and locking the
    /// attached tokens
    pub fn ccip_send(
        &mut self,
        tokens: &mut TokenBook,
        sender: Address,
        destination: u64,
        message: Evm2AnyMessage,
    ) -> ContractResult<H256> {
        let fee = self.get_fee(destination, &message)?;
        if !fee.is_zero() {
            tokens.transfer_from(message.fee_token, self.address, sender, self.address, fee)?;
        }
        for transfer in &message.token_amounts {
            tokens.transfer_from(
                transfer.token,
                self.address,
                sender,
                self.address,
                transfer.amount,
            )?;
        }

        let message_id = H256(keccak256(abi::encode(&[
            Token::Uint(U256::from(self.chain_selector)),
            Token::Uint(U256::from(destination)),
            Token::Uint(U256::from(self.nonce)),
            Token::Address(sender),
            Token::Bytes(message.data.to_vec()),
        ])));
        self.nonce += 1;

        self.outbox.push(OutboundRecord {
            message_id,
            source_chain: self.chain_selector,
            destination_chain: destination,
            sender,
            message,
        });
        Ok(message_id)
    }

    /// Messages accepted since the last drain
    pub fn take_outbox(&mut self) -> Vec<OutboundRecord> {
        std::mem::take(&mut self.outbox)
    }
}
