//! Report submission through a signing middleware
//!
//! The relayer's key is the ledger's forwarder. Reports are wrapped in
//! `onReport(bytes metadata, bytes report)` and sent to the ledger; the
//! receipt status is reported back to the pipeline.

use super::gas;
use crate::chain::{ChainProvider, ReportWriter, TxStatus, WriteReceipt};
use crate::codec::encode_on_report;
use crate::config::WalletConfig;
use crate::error::{RelayerError, RelayerResult};

use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::prelude::*;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

/// Environment variable holding the key when the wallet section names none
const DEFAULT_KEY_ENV: &str = "RELAYER_PRIVATE_KEY";

/// Upper bound on waiting for a report to be mined
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Signs and submits reports on one chain
pub struct TransactionSender {
    chain: String,
    client: SignerMiddleware<Provider<Http>, LocalWallet>,
}

impl TransactionSender {
    /// Create a sender for the provider's chain
    pub fn new(provider: Arc<ChainProvider>, wallet: LocalWallet) -> Self {
        let wallet = wallet.with_chain_id(provider.chain_id());
        info!(
            "Transaction sender for {} initialized with wallet: {:?}",
            provider.name(),
            wallet.address()
        );
        Self {
            chain: provider.name().to_string(),
            client: SignerMiddleware::new(provider.http().clone(), wallet),
        }
    }

    /// Load wallet from environment
    pub fn load_wallet(config: &WalletConfig) -> RelayerResult<LocalWallet> {
        let key_env = config.private_key_env.as_deref().unwrap_or(DEFAULT_KEY_ENV);
        let key = std::env::var(key_env).map_err(|_| {
            RelayerError::Wallet(format!("No wallet configured. Set {}", key_env))
        })?;
        key.trim()
            .parse::<LocalWallet>()
            .map_err(|e| RelayerError::Wallet(format!("Invalid private key: {}", e)))
    }

    /// Get wallet address
    pub fn wallet_address(&self) -> Address {
        self.client.address()
    }
}

#[async_trait]
impl ReportWriter for TransactionSender {
    async fn write_report(
        &self,
        ledger: Address,
        report: Bytes,
        gas_limit: Option<u64>,
    ) -> RelayerResult<WriteReceipt> {
        let gas_limit = gas_limit.unwrap_or(gas::DEFAULT_SEND_GAS_LIMIT);
        let tx: TypedTransaction = TransactionRequest::new()
            .to(ledger)
            .data(encode_on_report(&[], &report))
            .gas(gas_limit)
            .into();

        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| {
                let message = e.to_string();
                if message.contains("insufficient funds") {
                    RelayerError::Wallet(format!("{} on {}", message, self.chain))
                } else {
                    RelayerError::Transaction(message)
                }
            })?;
        let tx_hash = pending.tx_hash();
        info!(chain = %self.chain, ?tx_hash, gas_limit, "Report submitted");

        let receipt = match timeout(RECEIPT_TIMEOUT, pending).await {
            Ok(Ok(Some(receipt))) => receipt,
            Ok(Ok(None)) => {
                return Err(RelayerError::Transaction(format!(
                    "report {:?} dropped from mempool",
                    tx_hash
                )))
            }
            Ok(Err(e)) => return Err(RelayerError::Transaction(e.to_string())),
            Err(_) => {
                warn!(chain = %self.chain, ?tx_hash, "Timed out waiting for receipt");
                return Err(RelayerError::Timeout {
                    operation: format!("receipt of {:?}", tx_hash),
                });
            }
        };

        let status = if receipt.status == Some(U64::from(1u64)) {
            TxStatus::Success
        } else {
            TxStatus::Reverted
        };
        Ok(WriteReceipt {
            status,
            tx_hash: receipt.transaction_hash,
        })
    }
}
