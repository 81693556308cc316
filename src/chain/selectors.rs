//! Chain selectors and the destination directory
//!
//! Intents name their destination by transport selector. The directory maps
//! each selector back to the chain's name and contract addresses so the
//! pipeline can address the destination receiver.

use super::capability::SelectorResolver;
use crate::config::{ChainContracts, Settings};
use crate::error::{RelayerError, RelayerResult};

use std::collections::HashMap;

/// Selectors of the public transport deployments
const KNOWN: &[(&str, u64)] = &[
    ("ethereum-mainnet", 5009297550715157269),
    ("ethereum-mainnet-arbitrum-1", 4949039107694359620),
    ("ethereum-mainnet-base-1", 15971525489660198786),
    ("ethereum-mainnet-optimism-1", 3734403246176062136),
    ("polygon-mainnet", 4051577828743386545),
    ("avalanche-mainnet", 6433500567565415381),
    ("ethereum-testnet-sepolia", 16015286601757825753),
    ("ethereum-testnet-sepolia-arbitrum-1", 3478487238524512106),
    ("ethereum-testnet-sepolia-base-1", 10344971235874465080),
    ("ethereum-testnet-sepolia-optimism-1", 5224473277236331295),
    ("polygon-testnet-amoy", 16281711391670634445),
    ("avalanche-fuji-testnet", 14767482510784806043),
];

/// Static table of known chain selectors
#[derive(Debug, Default, Clone, Copy)]
pub struct KnownSelectors;

impl SelectorResolver for KnownSelectors {
    fn selector(&self, chain_name: &str) -> Option<u64> {
        KNOWN
            .iter()
            .find(|(name, _)| *name == chain_name)
            .map(|(_, selector)| *selector)
    }
}

/// A configured chain as seen by the pipelines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEntry {
    pub name: String,
    pub selector: u64,
    pub contracts: ChainContracts,
}

/// Configured chains indexed by selector
#[derive(Debug, Clone, Default)]
pub struct ChainDirectory {
    by_selector: HashMap<u64, ChainEntry>,
}

impl ChainDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: ChainEntry) {
        self.by_selector.insert(entry.selector, entry);
    }

    pub fn get(&self, selector: u64) -> Option<&ChainEntry> {
        self.by_selector.get(&selector)
    }

    pub fn by_name(&self, name: &str) -> Option<&ChainEntry> {
        self.by_selector.values().find(|e| e.name == name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ChainEntry> {
        self.by_selector.values()
    }

    pub fn len(&self) -> usize {
        self.by_selector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_selector.is_empty()
    }

    /// Build from the enabled chains; a configured selector wins over the
    /// resolver
    pub fn from_settings(settings: &Settings, resolver: &dyn SelectorResolver) -> RelayerResult<Self> {
        let mut directory = Self::new();
        for (name, chain) in settings.enabled_chains() {
            let selector = chain
                .selector
                .or_else(|| resolver.selector(name))
                .ok_or_else(|| {
                    RelayerError::Config(format!("No selector known for chain {}", name))
                })?;
            if let Some(existing) = directory.get(selector) {
                return Err(RelayerError::Config(format!(
                    "Chains {} and {} share selector {}",
                    existing.name, name, selector
                )));
            }
            let contracts = chain
                .contracts()
                .map_err(|e| RelayerError::Config(format!("{:#}", e)))?;
            directory.insert(ChainEntry {
                name: name.clone(),
                selector,
                contracts,
            });
        }
        Ok(directory)
    }
}
