//! Where pipeline outcomes go

use super::outcome::Outcome;

use dashmap::DashMap;
use ethers::types::Log;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

#[cfg(test)]
use mockall::automock;

/// Receives every terminal outcome, per chain
#[cfg_attr(test, automock)]
pub trait OutcomeSink: Send + Sync {
    fn record(&self, chain: &str, log: &Log, outcome: &Outcome);
}

/// Outcome counts of one chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeTally {
    pub sent: u64,
    pub skipped: u64,
    pub error: u64,
}

/// Per-chain tallies shared with the API
#[derive(Debug, Default)]
pub struct OutcomeTallies {
    by_chain: DashMap<String, OutcomeTally>,
}

impl OutcomeTallies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, chain: &str, outcome: &Outcome) {
        let mut tally = self.by_chain.entry(chain.to_string()).or_default();
        match outcome {
            Outcome::Sent { .. } => tally.sent += 1,
            Outcome::Skipped(_) => tally.skipped += 1,
            Outcome::Error(_) => tally.error += 1,
        }
    }

    pub fn get(&self, chain: &str) -> OutcomeTally {
        self.by_chain
            .get(chain)
            .map(|t| t.clone())
            .unwrap_or_default()
    }
}

/// Logs outcomes, records metrics and keeps the tallies
pub struct TracingSink {
    tallies: Arc<OutcomeTallies>,
}

impl TracingSink {
    pub fn new(tallies: Arc<OutcomeTallies>) -> Self {
        Self { tallies }
    }
}

impl OutcomeSink for TracingSink {
    fn record(&self, chain: &str, log: &Log, outcome: &Outcome) {
        match outcome {
            Outcome::Error(_) => warn!(
                chain,
                tx_hash = ?log.transaction_hash,
                log_index = ?log.log_index,
                %outcome,
                "Log failed"
            ),
            _ => info!(
                chain,
                tx_hash = ?log.transaction_hash,
                log_index = ?log.log_index,
                %outcome,
                "Log handled"
            ),
        }
        crate::metrics::record_outcome(chain, outcome);
        self.tallies.add(chain, outcome);
    }
}
