//! Safety confidence at which logs are observed
//!
//! Chains expose three block tags of increasing safety:
//! - `latest`: the current head, may be reorged
//! - `safe`: justified by the consensus layer, unlikely to reorg
//! - `finalized`: irreversible
//!
//! The listener never reads past the block selected by the configured tag.

use ethers::types::BlockNumber;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyConfidence {
    Latest,
    Safe,
    #[default]
    Finalized,
}

impl SafetyConfidence {
    /// Block tag to query the head with
    pub fn block_tag(&self) -> BlockNumber {
        match self {
            SafetyConfidence::Latest => BlockNumber::Latest,
            SafetyConfidence::Safe => BlockNumber::Safe,
            SafetyConfidence::Finalized => BlockNumber::Finalized,
        }
    }
}

impl fmt::Display for SafetyConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SafetyConfidence::Latest => "latest",
            SafetyConfidence::Safe => "safe",
            SafetyConfidence::Finalized => "finalized",
        };
        f.write_str(name)
    }
}
