//! Offchain relay of ledger intents
//!
//! The relay engine:
//! 1. Observes ledger logs on every configured chain
//! 2. Decodes intents and resolves their destination chain
//! 3. Builds the outbound message and checks the ledger can fund it
//! 4. Submits the authenticated report and records the outcome

pub mod builder;
pub mod engine;
pub mod outcome;
pub mod pipeline;
pub mod preflight;
pub mod sink;

pub use builder::build_message;
pub use engine::{ChainTrigger, RelayEngine};
pub use outcome::{ErrorReason, Outcome, SkipReason};
pub use pipeline::IntentPipeline;
pub use preflight::{Preflight, Shortfall};
pub use sink::{OutcomeSink, OutcomeTallies, OutcomeTally, TracingSink};
