//! In-memory adapters over a [`Chain`]
//!
//! Lets pipelines run against local chains: reads go through
//! `Chain::static_call`, reports are submitted by the configured forwarder
//! and log delivery hands out every log committed since the previous poll.

use super::capability::{ContractCaller, LogSource, ReportWriter, TxStatus, WriteReceipt};
use crate::codec::{encode_address, Any2EvmMessage};
use crate::contracts::{Chain, ContractError, OutboundRecord};
use crate::error::{RelayerError, RelayerResult};

use async_trait::async_trait;
use ethers::types::{Address, Bytes, Log};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Shared handle to a local chain
pub type SharedChain = Arc<Mutex<Chain>>;

pub fn shared(chain: Chain) -> SharedChain {
    Arc::new(Mutex::new(chain))
}

fn lock(chain: &SharedChain) -> RelayerResult<MutexGuard<'_, Chain>> {
    chain
        .lock()
        .map_err(|_| RelayerError::Internal("local chain lock poisoned".to_string()))
}

/// Read-only calls against a local chain
pub struct LocalCaller {
    chain: SharedChain,
}

impl LocalCaller {
    pub fn new(chain: SharedChain) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl ContractCaller for LocalCaller {
    async fn call(&self, to: Address, data: Bytes) -> RelayerResult<Bytes> {
        Ok(lock(&self.chain)?.static_call(to, &data)?)
    }
}

/// Report submission signed by `forwarder`
pub struct LocalWriter {
    chain: SharedChain,
    forwarder: Address,
}

impl LocalWriter {
    pub fn new(chain: SharedChain, forwarder: Address) -> Self {
        Self { chain, forwarder }
    }
}

#[async_trait]
impl ReportWriter for LocalWriter {
    async fn write_report(
        &self,
        ledger: Address,
        report: Bytes,
        gas_limit: Option<u64>,
    ) -> RelayerResult<WriteReceipt> {
        let mut chain = lock(&self.chain)?;
        if chain.addresses().ledger != ledger {
            return Err(RelayerError::Transaction(format!(
                "no ledger deployed at {:?} on {}",
                ledger,
                chain.name()
            )));
        }
        debug!(chain = chain.name(), ?gas_limit, "Submitting report");

        // A revert is still a mined transaction
        let status = match chain.on_report(self.forwarder, &[], &report) {
            Ok(_) => TxStatus::Success,
            Err(e) => {
                debug!(chain = chain.name(), error = %e, "Report reverted");
                TxStatus::Reverted
            }
        };
        Ok(WriteReceipt {
            status,
            tx_hash: chain.last_tx_hash(),
        })
    }
}

/// Delivers every log committed on a local chain, once
pub struct LocalLogFeed {
    chain: SharedChain,
    cursor: Mutex<usize>,
}

impl LocalLogFeed {
    /// Feed starting after the logs already on the chain
    pub fn new(chain: SharedChain) -> RelayerResult<Self> {
        let cursor = lock(&chain)?.logs().len();
        Ok(Self {
            chain,
            cursor: Mutex::new(cursor),
        })
    }
}

#[async_trait]
impl LogSource for LocalLogFeed {
    async fn poll(&self) -> RelayerResult<Vec<Log>> {
        let chain = lock(&self.chain)?;
        let mut cursor = self
            .cursor
            .lock()
            .map_err(|_| RelayerError::Internal("log cursor lock poisoned".to_string()))?;
        let logs = chain.logs()[*cursor..].to_vec();
        *cursor = chain.logs().len();
        Ok(logs)
    }
}

/// Move router outboxes to their destination chains
///
/// Stands in for the transport network: every message accepted by a source
/// router is delivered to the destination chain's receiver. Returns the
/// delivery result per message.
pub fn relay_outbox(
    source: &SharedChain,
    destinations: &[SharedChain],
) -> RelayerResult<Vec<(OutboundRecord, Result<(), ContractError>)>> {
    let outbox = lock(source)?.take_outbox();
    let mut results = Vec::with_capacity(outbox.len());

    for record in outbox {
        let destination = destinations
            .iter()
            .find(|chain| {
                lock(chain)
                    .map(|c| c.selector() == record.destination_chain)
                    .unwrap_or(false)
            })
            .ok_or_else(|| RelayerError::ChainNotFound {
                chain: record.destination_chain.to_string(),
            })?;

        let message = Any2EvmMessage {
            message_id: record.message_id,
            source_chain_selector: record.source_chain,
            sender: encode_address(record.sender),
            data: record.message.data.clone(),
            dest_token_amounts: record.message.token_amounts.clone(),
        };
        let result = lock(destination)?.deliver(&message);
        results.push((record, result));
    }

    Ok(results)
}
