//! Onchain side of the settlement system
//!
//! The ledger, receiver and router run against an in-memory token book inside
//! a per-chain [`Chain`] environment that gives every call all-or-nothing
//! semantics.

pub mod auth;
pub mod chain;
pub mod error;
pub mod ledger;
pub mod receiver;
pub mod router;
pub mod token;

pub use auth::{guards, has_role, require_any, Ownership, Role, RoleBindings};
pub use chain::{CallEnv, Chain, ChainAddresses};
pub use error::{ContractError, ContractResult};
pub use ledger::Ledger;
pub use receiver::Receiver;
pub use router::{LocalRouter, OutboundRecord};
pub use token::TokenBook;
