//! Ledger log listener with HTTP polling
//!
//! Polls the ledger's intent logs up to the head selected by the chain's
//! safety confidence and forwards them, in chain order, to the chain's
//! pipeline over an mpsc channel.

use super::capability::LogSource;
use super::finality::SafetyConfidence;
use super::ChainProvider;
use crate::error::RelayerResult;
use crate::events::intent_topics;

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::types::{Topic, ValueOrArray};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

/// Largest block range requested in one `eth_getLogs`
const MAX_BLOCK_RANGE: u64 = 1000;

/// What one poll does given the last delivered block and the current head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollStep {
    /// The confidence tag is not served yet; nothing is anchored
    HeadUnknown,
    /// No new blocks
    Idle,
    /// First head seen; observation starts after it
    Anchor(u64),
    Scan { from: u64, to: u64 },
}

fn plan_poll(last: Option<u64>, head: Option<u64>) -> PollStep {
    match (last, head) {
        (_, None) => PollStep::HeadUnknown,
        (None, Some(head)) => PollStep::Anchor(head),
        (Some(last), Some(head)) if head <= last => PollStep::Idle,
        (Some(last), Some(head)) => PollStep::Scan {
            from: last + 1,
            to: std::cmp::min(head, last + MAX_BLOCK_RANGE),
        },
    }
}

/// Polls one chain's ledger for intent logs
pub struct ChainListener {
    provider: Arc<ChainProvider>,
    ledger: Address,
    confidence: SafetyConfidence,
    /// Last block whose logs were delivered
    last_processed_block: RwLock<Option<u64>>,
}

impl ChainListener {
    pub fn new(provider: Arc<ChainProvider>, ledger: Address, confidence: SafetyConfidence) -> Self {
        Self {
            provider,
            ledger,
            confidence,
            last_processed_block: RwLock::new(None),
        }
    }

    pub fn chain(&self) -> &str {
        self.provider.name()
    }
}

#[async_trait]
impl LogSource for ChainListener {
    async fn poll(&self) -> RelayerResult<Vec<Log>> {
        let head = self.provider.head(self.confidence).await?;

        let mut last = self.last_processed_block.write().await;
        let (from_block, to_block) = match plan_poll(*last, head) {
            PollStep::HeadUnknown => {
                warn!(
                    chain = self.chain(),
                    confidence = %self.confidence,
                    "Head not available at confidence, waiting"
                );
                return Ok(Vec::new());
            }
            PollStep::Idle => return Ok(Vec::new()),
            PollStep::Anchor(head) => {
                // Start observing at the current head
                info!(chain = self.chain(), head, confidence = %self.confidence, "Listener started");
                *last = Some(head);
                return Ok(Vec::new());
            }
            PollStep::Scan { from, to } => (from, to),
        };

        debug!(
            "Chain {}: Processing blocks {} to {}",
            self.chain(),
            from_block,
            to_block
        );

        let topic0: Topic = ValueOrArray::Array(intent_topics().into_iter().map(Some).collect());
        let filter = Filter::new()
            .address(self.ledger)
            .topic0(topic0)
            .from_block(from_block)
            .to_block(to_block);

        let mut logs = self.provider.get_logs(&filter).await?;
        logs.sort_by_key(|log| (log.block_number, log.log_index));

        *last = Some(to_block);
        Ok(logs)
    }
}

/// Forward polled logs into `tx` until the receiver is dropped or `shutdown`
/// is set
pub async fn run_listener(
    chain: String,
    source: Arc<dyn LogSource>,
    tx: mpsc::Sender<Log>,
    poll_interval: Duration,
    shutdown: Arc<RwLock<bool>>,
) {
    loop {
        if *shutdown.read().await {
            break;
        }

        match source.poll().await {
            Ok(logs) => {
                for log in logs {
                    crate::metrics::record_log_received(&chain);
                    if tx.send(log).await.is_err() {
                        debug!(chain = %chain, "Pipeline closed, stopping listener");
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(chain = %chain, error = %e, "Failed to poll logs");
            }
        }

        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::capability::MockLogSource;
    use crate::error::RelayerError;

    #[test]
    fn test_unknown_head_does_not_anchor() {
        assert_eq!(plan_poll(None, None), PollStep::HeadUnknown);
        assert_eq!(plan_poll(Some(41), None), PollStep::HeadUnknown);
        assert_eq!(plan_poll(None, Some(42)), PollStep::Anchor(42));
    }

    #[test]
    fn test_scan_ranges() {
        assert_eq!(plan_poll(Some(42), Some(42)), PollStep::Idle);
        assert_eq!(plan_poll(Some(42), Some(40)), PollStep::Idle);
        assert_eq!(
            plan_poll(Some(42), Some(50)),
            PollStep::Scan { from: 43, to: 50 }
        );
        assert_eq!(
            plan_poll(Some(0), Some(5_000)),
            PollStep::Scan {
                from: 1,
                to: MAX_BLOCK_RANGE,
            }
        );
    }

    #[tokio::test]
    async fn test_run_listener_forwards_in_order() {
        let mut source = MockLogSource::new();
        let mut batches = vec![
            Err(RelayerError::Timeout {
                operation: "poll".into(),
            }),
            Ok(vec![
                Log {
                    log_index: Some(U256::from(0u64)),
                    ..Default::default()
                },
                Log {
                    log_index: Some(U256::from(1u64)),
                    ..Default::default()
                },
            ]),
        ]
        .into_iter();
        source
            .expect_poll()
            .returning(move || batches.next().unwrap_or_else(|| Ok(Vec::new())));

        let (tx, mut rx) = mpsc::channel(8);
        let shutdown = Arc::new(RwLock::new(false));
        let handle = tokio::spawn(run_listener(
            "devnet".into(),
            Arc::new(source),
            tx,
            Duration::from_millis(1),
            shutdown.clone(),
        ));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.log_index, Some(U256::from(0u64)));
        assert_eq!(second.log_index, Some(U256::from(1u64)));

        *shutdown.write().await = true;
        handle.await.unwrap();
    }
}
