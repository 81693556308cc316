//! Capabilities the relayer consumes from a chain
//!
//! Pipelines only talk to chains through these traits. The ethers-backed
//! adapters implement them against RPC endpoints and the `local` adapters
//! against an in-memory [`crate::contracts::Chain`].

use crate::error::RelayerResult;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, Log, H256};
use serde::Serialize;
use std::fmt;

#[cfg(test)]
use mockall::automock;

/// Status of a submitted write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Reverted,
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStatus::Success => f.write_str("success"),
            TxStatus::Reverted => f.write_str("reverted"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReceipt {
    pub status: TxStatus,
    pub tx_hash: H256,
}

/// Read-only contract call
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContractCaller: Send + Sync {
    async fn call(&self, to: Address, data: Bytes) -> RelayerResult<Bytes>;
}

/// Authenticated report submission to a ledger
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReportWriter: Send + Sync {
    async fn write_report(
        &self,
        ledger: Address,
        report: Bytes,
        gas_limit: Option<u64>,
    ) -> RelayerResult<WriteReceipt>;
}

/// Log delivery at the configured safety confidence
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Logs observed since the previous poll, in chain order
    async fn poll(&self) -> RelayerResult<Vec<Log>>;
}

/// Chain name to transport selector
#[cfg_attr(test, automock)]
pub trait SelectorResolver: Send + Sync {
    fn selector(&self, chain_name: &str) -> Option<u64>;
}
