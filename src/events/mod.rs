//! Contract event types and parsing
//!
//! Defines the events emitted by the ledger and receiver contracts, their
//! log encoding, and the parser the relayer uses to recognise intents.

use crate::codec::{address_topic, topic_address, u64_topic};

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, Log, H256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kinds of intent the ledger can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentKind {
    DepositRequested,
    WithdrawRequested,
    WithdrawExecutionRequested,
}

impl IntentKind {
    pub const ALL: [IntentKind; 3] = [
        IntentKind::DepositRequested,
        IntentKind::WithdrawRequested,
        IntentKind::WithdrawExecutionRequested,
    ];

    /// Solidity event signature
    pub fn signature(&self) -> &'static str {
        match self {
            IntentKind::DepositRequested => "DepositRequested(address,address,uint256,uint64)",
            IntentKind::WithdrawRequested => "WithdrawRequested(address,address,uint256,uint64)",
            IntentKind::WithdrawExecutionRequested => {
                "WithdrawExecutionRequested(address,address,uint256,uint64)"
            }
        }
    }

    /// Topic0 for this intent
    pub fn topic(&self) -> H256 {
        match self {
            IntentKind::DepositRequested => *topics::DEPOSIT_REQUESTED,
            IntentKind::WithdrawRequested => *topics::WITHDRAW_REQUESTED,
            IntentKind::WithdrawExecutionRequested => *topics::WITHDRAW_EXECUTION_REQUESTED,
        }
    }

    /// Snake-case name used in outcomes, logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            IntentKind::DepositRequested => "deposit_requested",
            IntentKind::WithdrawRequested => "withdraw_requested",
            IntentKind::WithdrawExecutionRequested => "withdraw_execution_requested",
        }
    }

    pub fn from_topic(topic: &H256) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.topic() == *topic)
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A signal that something must happen on another chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub kind: IntentKind,
    pub user: Address,
    pub token: Address,
    pub amount: U256,
    pub destination_chain: u64,
}

/// Events emitted by the ledger and receiver contracts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    /// One of the three ledger intents
    Intent(Intent),

    /// Outbound message accepted by the router
    MessageSent {
        message_id: H256,
        destination_chain: u64,
    },

    /// Inbound message applied by the receiver
    MessageReceived {
        message_id: H256,
        source_chain: u64,
        sender: Address,
        operation: String,
        token: Address,
        amount: U256,
    },
}

impl ContractEvent {
    /// Get event name for metrics
    pub fn name(&self) -> &'static str {
        match self {
            ContractEvent::Intent(intent) => intent.kind.name(),
            ContractEvent::MessageSent { .. } => "message_sent",
            ContractEvent::MessageReceived { .. } => "message_received",
        }
    }

    /// Encode as an EVM log emitted by `emitter`
    pub fn to_log(&self, emitter: Address) -> Log {
        let (topics, data) = match self {
            ContractEvent::Intent(intent) => (
                vec![
                    intent.kind.topic(),
                    address_topic(intent.user),
                    address_topic(intent.token),
                ],
                abi::encode(&[
                    Token::Uint(intent.amount),
                    Token::Uint(U256::from(intent.destination_chain)),
                ]),
            ),
            ContractEvent::MessageSent {
                message_id,
                destination_chain,
            } => (
                vec![
                    *topics::MESSAGE_SENT,
                    *message_id,
                    u64_topic(*destination_chain),
                ],
                Vec::new(),
            ),
            ContractEvent::MessageReceived {
                message_id,
                source_chain,
                sender,
                operation,
                token,
                amount,
            } => (
                vec![
                    *topics::MESSAGE_RECEIVED,
                    *message_id,
                    u64_topic(*source_chain),
                ],
                abi::encode(&[
                    Token::Address(*sender),
                    Token::String(operation.clone()),
                    Token::Address(*token),
                    Token::Uint(*amount),
                ]),
            ),
        };

        Log {
            address: emitter,
            topics,
            data: Bytes::from(data),
            removed: Some(false),
            ..Default::default()
        }
    }
}

/// Event topic signatures (keccak256 of event signature)
pub mod topics {
    use crate::codec::event_topic;
    use ethers::types::H256;
    use lazy_static::lazy_static;

    lazy_static! {
        // Ledger intents
        pub static ref DEPOSIT_REQUESTED: H256 =
            event_topic("DepositRequested(address,address,uint256,uint64)");
        pub static ref WITHDRAW_REQUESTED: H256 =
            event_topic("WithdrawRequested(address,address,uint256,uint64)");
        pub static ref WITHDRAW_EXECUTION_REQUESTED: H256 =
            event_topic("WithdrawExecutionRequested(address,address,uint256,uint64)");

        // Ledger send confirmation
        pub static ref MESSAGE_SENT: H256 = event_topic("MessageSent(bytes32,uint64)");

        // Receiver audit trail
        pub static ref MESSAGE_RECEIVED: H256 =
            event_topic("MessageReceived(bytes32,uint64,address,string,address,uint256)");
    }
}

/// Failure to decode a log whose topic0 matched a known intent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to decode {kind} log: {reason}")]
pub struct EventDecodeError {
    pub kind: IntentKind,
    pub reason: String,
}

/// Intent parser for ledger logs
#[derive(Debug, Clone, Default)]
pub struct EventParser;

impl EventParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a log entry into an intent
    ///
    /// Returns `Ok(None)` for logs whose topic0 is not one of the three
    /// intents, and an error when the signature matched but the body did not
    /// decode. Callers are expected to have rejected logs without topics.
    pub fn parse_log(&self, log: &Log) -> Result<Option<Intent>, EventDecodeError> {
        let Some(kind) = log.topics.first().and_then(IntentKind::from_topic) else {
            return Ok(None);
        };

        let fail = |reason: &str| EventDecodeError {
            kind,
            reason: reason.to_string(),
        };

        if log.topics.len() != 3 {
            return Err(fail("expected user and token topics"));
        }
        let user = topic_address(&log.topics[1]);
        let token = topic_address(&log.topics[2]);

        let mut values = abi::decode(&[ParamType::Uint(256), ParamType::Uint(64)], &log.data)
            .map_err(|e| fail(&e.to_string()))?
            .into_iter();
        let amount = values
            .next()
            .and_then(Token::into_uint)
            .ok_or_else(|| fail("missing amount"))?;
        let destination = values
            .next()
            .and_then(Token::into_uint)
            .ok_or_else(|| fail("missing destination chain"))?;
        if destination > U256::from(u64::MAX) {
            return Err(fail("destination chain overflows uint64"));
        }

        Ok(Some(Intent {
            kind,
            user,
            token,
            amount,
            destination_chain: destination.as_u64(),
        }))
    }
}

/// Topic0 values the listener should subscribe to
pub fn intent_topics() -> Vec<H256> {
    IntentKind::ALL.iter().map(|k| k.topic()).collect()
}
