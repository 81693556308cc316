//! Configuration management for the relayer
//!
//! Loads configuration from TOML files with environment variable substitution.

use crate::chain::SafetyConfidence;

use anyhow::{Context, Result};
use ethers::types::Address;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "RELAYER_CONFIG";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub relayer: RelayerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    pub chains: HashMap<String, ChainConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayerConfig {
    pub instance_id: String,
    /// Compare the quoted fee with the ledger's fee-token balance before sending
    #[serde(default = "default_true")]
    pub check_fee_token: bool,
    /// Compare the transferred amount with the ledger's token balance
    #[serde(default = "default_true")]
    pub check_token: bool,
    /// Gas limit for the report transaction on the source chain
    pub send_gas_limit: Option<u64>,
    /// Execution gas limit requested on the destination chain
    pub dest_gas_limit: Option<u64>,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_health_interval")]
    pub health_check_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9090,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletConfig {
    /// Name of the environment variable holding the forwarder key
    pub private_key_env: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// Overrides the selector known for the chain name
    pub selector: Option<u64>,
    pub chain_id: u64,
    pub rpc_urls: Vec<String>,
    pub ledger: String,
    pub receiver: String,
    pub router: String,
    pub fee_token: String,
    /// Symbol -> address of the tokens the ledger custodies
    #[serde(default)]
    pub tokens: HashMap<String, String>,
    #[serde(default)]
    pub confidence: SafetyConfidence,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Contract addresses of a chain, parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainContracts {
    pub ledger: Address,
    pub receiver: Address,
    pub router: Address,
    pub fee_token: Address,
}

fn default_true() -> bool {
    true
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_health_interval() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    2000
}

impl ChainConfig {
    pub fn contracts(&self) -> Result<ChainContracts> {
        Ok(ChainContracts {
            ledger: parse_address("ledger", &self.ledger)?,
            receiver: parse_address("receiver", &self.receiver)?,
            router: parse_address("router", &self.router)?,
            fee_token: parse_address("fee_token", &self.fee_token)?,
        })
    }
}

fn parse_address(field: &str, value: &str) -> Result<Address> {
    value
        .parse::<Address>()
        .with_context(|| format!("Invalid {} address: {:?}", field, value))
}

impl Settings {
    /// Load settings from the file named by `RELAYER_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path = env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));
        Self::load_from(&config_path)
    }

    /// Load settings from a specific file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
        Self::parse(&config_str)
    }

    /// Parse settings from TOML text
    pub fn parse(config_str: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        // At least one chain must be enabled
        if self.enabled_chains().is_empty() {
            anyhow::bail!("At least one chain must be enabled");
        }

        for (name, chain) in self.enabled_chains() {
            if chain.rpc_urls.is_empty() {
                anyhow::bail!("Chain {} has no RPC URLs configured", name);
            }
            chain
                .contracts()
                .with_context(|| format!("Chain {} has invalid contract addresses", name))?;
            for (symbol, address) in &chain.tokens {
                parse_address(symbol, address)
                    .with_context(|| format!("Chain {} has an invalid token", name))?;
            }
        }

        if self.relayer.channel_capacity == 0 {
            anyhow::bail!("relayer.channel_capacity must be positive");
        }

        Ok(())
    }

    /// Get list of enabled chains, sorted by name
    pub fn enabled_chains(&self) -> Vec<(&String, &ChainConfig)> {
        let mut chains: Vec<_> = self.chains.iter().filter(|(_, c)| c.enabled).collect();
        chains.sort_by(|a, b| a.0.cmp(b.0));
        chains
    }
}

lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR
        .replace_all(input, |cap: &regex::Captures| {
            env::var(&cap[1]).unwrap_or_default()
        })
        .into_owned()
}
