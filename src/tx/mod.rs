//! Report submission with signing and gas limit resolution

pub mod gas;
mod sender;

pub use gas::{resolve_send_gas_limit, DEFAULT_SEND_GAS_LIMIT};
pub use sender::TransactionSender;
