//! Solvency checks run before a report is submitted
//!
//! Reads only: the fee quote from the source router and the ledger's
//! balances of the fee token and the transferred token. When the transferred
//! token is the fee token, the one balance must cover the fee plus the amount.

use crate::chain::{ChainEntry, ContractCaller};
use crate::codec::{decode_uint, encode_balance_of, encode_get_fee, Evm2AnyMessage};
use crate::error::RelayerResult;

use ethers::types::{Address, U256};
use tracing::debug;

/// Which checks run before sending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preflight {
    pub check_fee_token: bool,
    pub check_token: bool,
}

/// A balance the ledger is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortfall {
    pub token: Address,
    pub available: U256,
    pub required: U256,
}

impl Preflight {
    /// `Ok(None)` when every enabled check passes
    pub async fn run(
        &self,
        caller: &dyn ContractCaller,
        source: &ChainEntry,
        destination_chain: u64,
        message: &Evm2AnyMessage,
    ) -> RelayerResult<Option<Shortfall>> {
        let ledger = source.contracts.ledger;
        let mut quoted_fee = None;

        if self.check_fee_token {
            let fee = decode_uint(
                &caller
                    .call(source.contracts.router, encode_get_fee(destination_chain, message))
                    .await?,
            )?;
            let available = balance_of(caller, message.fee_token, ledger).await?;
            debug!(%fee, %available, "Fee token preflight");
            if available < fee {
                return Ok(Some(Shortfall {
                    token: message.fee_token,
                    available,
                    required: fee,
                }));
            }
            quoted_fee = Some(fee);
        }

        if self.check_token {
            if let Some(transfer) = message.first_transfer() {
                let required = match quoted_fee {
                    Some(fee) if transfer.token == message.fee_token => {
                        transfer.amount.saturating_add(fee)
                    }
                    _ => transfer.amount,
                };
                let available = balance_of(caller, transfer.token, ledger).await?;
                debug!(%required, %available, "Token preflight");
                if available < required {
                    return Ok(Some(Shortfall {
                        token: transfer.token,
                        available,
                        required,
                    }));
                }
            }
        }

        Ok(None)
    }
}

async fn balance_of(caller: &dyn ContractCaller, token: Address, holder: Address) -> RelayerResult<U256> {
    Ok(decode_uint(&caller.call(token, encode_balance_of(holder)).await?)?)
}
