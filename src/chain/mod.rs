//! Chain module - chain capabilities and their adapters
//!
//! This module provides:
//! - The capability traits the pipelines consume
//! - Multi-RPC provider management with automatic failover
//! - Log polling at a configured safety confidence
//! - Selector resolution and the destination directory
//! - In-memory adapters over a local chain

pub mod capability;
pub mod finality;
pub mod listener;
pub mod local;
pub mod provider;
pub mod selectors;

pub use capability::{ContractCaller, LogSource, ReportWriter, SelectorResolver, TxStatus, WriteReceipt};
pub use finality::SafetyConfidence;
pub use listener::{run_listener, ChainListener};
pub use provider::ChainProvider;
pub use selectors::{ChainDirectory, ChainEntry, KnownSelectors};

use crate::config::Settings;
use crate::error::{RelayerError, RelayerResult};

use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

/// RPC connections of all configured chains
pub struct ChainManager {
    /// Chain providers indexed by chain name
    providers: DashMap<String, Arc<ChainProvider>>,
    /// Chain listeners indexed by chain name
    listeners: DashMap<String, Arc<ChainListener>>,
}

impl ChainManager {
    /// Connect to every enabled chain
    pub fn new(settings: &Settings) -> RelayerResult<Self> {
        let providers = DashMap::new();
        let listeners = DashMap::new();

        for (name, chain_config) in settings.enabled_chains() {
            info!(
                "Initializing chain {} (ID: {})",
                name, chain_config.chain_id
            );

            let contracts = chain_config
                .contracts()
                .map_err(|e| RelayerError::Config(format!("{:#}", e)))?;

            let provider = Arc::new(ChainProvider::new(name.clone(), chain_config.clone())?);
            providers.insert(name.clone(), provider.clone());

            let listener = ChainListener::new(provider, contracts.ledger, chain_config.confidence);
            listeners.insert(name.clone(), Arc::new(listener));

            info!("Chain {} initialized successfully", name);
        }

        Ok(Self {
            providers,
            listeners,
        })
    }

    /// Get provider for a specific chain
    pub fn get_provider(&self, chain: &str) -> RelayerResult<Arc<ChainProvider>> {
        self.providers
            .get(chain)
            .map(|p| p.clone())
            .ok_or_else(|| RelayerError::ChainNotFound {
                chain: chain.to_string(),
            })
    }

    /// Get listener for a specific chain
    pub fn get_listener(&self, chain: &str) -> RelayerResult<Arc<ChainListener>> {
        self.listeners
            .get(chain)
            .map(|l| l.clone())
            .ok_or_else(|| RelayerError::ChainNotFound {
                chain: chain.to_string(),
            })
    }

    /// Health check for all chains
    pub async fn health_check(&self) -> Vec<(String, bool)> {
        let providers: Vec<_> = self
            .providers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut results = Vec::new();
        for (chain, provider) in providers {
            let healthy = provider.health_check().await;
            crate::metrics::record_chain_health(&chain, healthy);
            results.push((chain, healthy));
        }
        results.sort();
        results
    }

    /// Get all connected chain names
    pub fn connected_chains(&self) -> Vec<String> {
        let mut chains: Vec<_> = self.providers.iter().map(|e| e.key().clone()).collect();
        chains.sort();
        chains
    }
}
