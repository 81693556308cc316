//! Cross-chain intent settlement
//!
//! Users record deposit and withdraw intents on a chain's ledger. The relayer
//! observes those intents, checks the ledger can pay for delivery and submits
//! an authenticated report that makes the ledger send a message through the
//! transport router. On the destination chain the receiver validates the
//! message's provenance and applies it to the local ledger.

pub mod api;
pub mod chain;
pub mod codec;
pub mod config;
pub mod contracts;
pub mod coordination;
pub mod error;
pub mod events;
pub mod metrics;
pub mod tx;

pub use error::{RelayerError, RelayerResult};
