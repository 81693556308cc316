//! Chain provider with multi-RPC support and automatic failover

use super::capability::ContractCaller;
use super::finality::SafetyConfidence;
use crate::config::ChainConfig;
use crate::error::{RelayerError, RelayerResult};

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider, ProviderError};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

/// Multi-provider wrapper with automatic failover
pub struct ChainProvider {
    /// Configured chain name
    name: String,
    /// Chain configuration
    config: ChainConfig,
    /// HTTP providers (multiple for failover)
    http_providers: Vec<Provider<Http>>,
    /// Current active provider index
    current_provider: AtomicUsize,
    /// Last known safe head
    last_block: RwLock<u64>,
}

impl ChainProvider {
    /// Create a new chain provider
    pub fn new(name: impl Into<String>, config: ChainConfig) -> RelayerResult<Self> {
        let name = name.into();
        let mut http_providers = Vec::new();

        for url in &config.rpc_urls {
            match Provider::<Http>::try_from(url.as_str()) {
                Ok(provider) => {
                    let provider = provider.interval(Duration::from_millis(100));
                    http_providers.push(provider);
                    debug!("Added HTTP provider for chain {}: {}", name, url);
                }
                Err(e) => {
                    warn!("Failed to create provider for {}: {}", url, e);
                }
            }
        }

        if http_providers.is_empty() {
            return Err(RelayerError::ChainConnection {
                chain: name,
                message: "No valid RPC providers".to_string(),
            });
        }

        Ok(Self {
            name,
            config,
            http_providers,
            current_provider: AtomicUsize::new(0),
            last_block: RwLock::new(0),
        })
    }

    /// Get the active HTTP provider
    pub fn http(&self) -> &Provider<Http> {
        let idx = self.current_provider.load(Ordering::Relaxed);
        &self.http_providers[idx % self.http_providers.len()]
    }

    /// Switch to next available provider
    pub fn failover(&self) {
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.http_providers.len();
        self.current_provider.store(next, Ordering::Relaxed);
        warn!("Chain {} failover to provider {}", self.name, next);
    }

    fn all_failed(&self, what: &str) -> RelayerError {
        RelayerError::ChainConnection {
            chain: self.name.clone(),
            message: format!("All providers failed to {}", what),
        }
    }

    /// Head block at the given confidence, with failover; `None` while the
    /// endpoint does not serve the tag yet
    pub async fn head(&self, confidence: SafetyConfidence) -> RelayerResult<Option<u64>> {
        for _ in 0..self.http_providers.len() {
            match self.http().get_block(confidence.block_tag()).await {
                Ok(Some(block)) => {
                    let Some(block_num) = block.number.map(|n| n.as_u64()) else {
                        return Ok(None);
                    };
                    *self.last_block.write().await = block_num;
                    crate::metrics::record_chain_head(&self.name, block_num);
                    return Ok(Some(block_num));
                }
                Ok(None) => return Ok(None),
                Err(e) => {
                    warn!(
                        "Failed to get {} block from chain {}: {}",
                        confidence, self.name, e
                    );
                    self.failover();
                }
            }
        }

        Err(self.all_failed("get head block"))
    }

    /// Last head seen by [`ChainProvider::head`]
    pub async fn last_block(&self) -> u64 {
        *self.last_block.read().await
    }

    /// Get logs for a filter
    pub async fn get_logs(&self, filter: &Filter) -> RelayerResult<Vec<Log>> {
        for _ in 0..self.http_providers.len() {
            match self.http().get_logs(filter).await {
                Ok(logs) => return Ok(logs),
                Err(e) => {
                    warn!("Failed to get logs from chain {}: {}", self.name, e);
                    self.failover();
                }
            }
        }

        Err(self.all_failed("get logs"))
    }

    /// Health check
    pub async fn health_check(&self) -> bool {
        match self.http().get_block_number().await {
            Ok(_) => true,
            Err(e) => {
                error!(
                    "Health check failed for chain {} (last head {}): {}",
                    self.name,
                    self.last_block().await,
                    e
                );
                false
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }
}

#[async_trait]
impl ContractCaller for ChainProvider {
    async fn call(&self, to: Address, data: Bytes) -> RelayerResult<Bytes> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        for _ in 0..self.http_providers.len() {
            match self.http().call(&tx, None).await {
                Ok(output) => return Ok(output),
                Err(ProviderError::JsonRpcClientError(e)) if e.as_error_response().is_some() => {
                    // Reverted: another endpoint will answer the same
                    return Err(RelayerError::Transaction(format!(
                        "eth_call to {:?} reverted: {}",
                        to, e
                    )));
                }
                Err(e) => {
                    warn!("eth_call failed on chain {}: {}", self.name, e);
                    self.failover();
                }
            }
        }

        Err(self.all_failed("answer eth_call"))
    }
}
