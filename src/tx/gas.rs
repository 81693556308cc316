//! Gas limits for report submission and destination execution

use crate::config::RelayerConfig;

/// Gas limit of a report transaction when none is configured
pub const DEFAULT_SEND_GAS_LIMIT: u64 = 500_000;

/// Gas limit requested from the report writer
pub fn resolve_send_gas_limit(config: &RelayerConfig) -> u64 {
    config.send_gas_limit.unwrap_or(DEFAULT_SEND_GAS_LIMIT)
}

/// Execution gas limit encoded in the outbound extra args; `None` leaves the
/// transport default in place
pub fn destination_gas_limit(config: &RelayerConfig) -> Option<u64> {
    config.dest_gas_limit
}
