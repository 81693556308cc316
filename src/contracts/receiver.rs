//! Inbound message validator and dispatcher
//!
//! `Validate -> Decode -> Transfer -> Dispatch`: provenance is checked
//! against the allowlists, the payload is decoded into an [`Operation`], the
//! first attached token transfer is moved into ledger custody, and the
//! matching ledger entry point is invoked with the receiver as caller.

use super::auth::{guards, require_any, require_non_zero, Ownership, Role, RoleBindings};
use super::chain::CallEnv;
use super::error::{ContractError, ContractResult};
use super::ledger::Ledger;
use crate::codec::{decode_address, Any2EvmMessage, CodecError, Operation, OperationKind};
use crate::events::ContractEvent;

use ethers::types::{Address, U256};
use std::collections::HashSet;
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct Receiver {
    address: Address,
    router: Address,
    ownership: Ownership,
    ledger: Option<Address>,
    allowed_source_chains: HashSet<u64>,
    allowed_senders: HashSet<Address>,
}

impl RoleBindings for Receiver {
    fn holder(&self, role: Role) -> Option<Address> {
        match role {
            Role::Owner => Some(self.ownership.owner()),
            Role::Router => Some(self.router),
            Role::Forwarder | Role::Receiver => None,
        }
    }
}

impl Receiver {
    pub fn new(address: Address, router: Address, owner: Address) -> Self {
        Self {
            address,
            router,
            ownership: Ownership::new(owner),
            ledger: None,
            allowed_source_chains: HashSet::new(),
            allowed_senders: HashSet::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.ownership.owner()
    }

    pub fn ledger(&self) -> Option<Address> {
        self.ledger
    }

    pub fn is_source_chain_allowed(&self, chain: u64) -> bool {
        self.allowed_source_chains.contains(&chain)
    }

    pub fn is_sender_allowed(&self, sender: Address) -> bool {
        self.allowed_senders.contains(&sender)
    }

    /// Router entry point for an inbound message
    pub fn ccip_receive(
        &mut self,
        env: &mut CallEnv<'_>,
        ledger: &mut Ledger,
        message: &Any2EvmMessage,
    ) -> ContractResult<()> {
        if require_any(self, env.caller, guards::INBOUND).is_err() {
            return Err(ContractError::InvalidRouter(env.caller));
        }

        // Validate
        if !self.is_source_chain_allowed(message.source_chain_selector) {
            return Err(ContractError::SourceChainNotAllowed(
                message.source_chain_selector,
            ));
        }
        let sender = decode_address(&message.sender)?;
        if !self.is_sender_allowed(sender) {
            return Err(ContractError::SenderNotAllowed(sender));
        }
        if self.ledger != Some(ledger.address()) {
            return Err(ContractError::LedgerNotConfigured);
        }

        // Decode
        let (tag, params) = Operation::split_payload(&message.data)?;
        let kind = OperationKind::from_str(&tag).map_err(|e| match e {
            CodecError::UnknownOperation(tag) => ContractError::InvalidOperation(tag),
            other => ContractError::Codec(other),
        })?;
        let operation = Operation::decode_params(kind, &params)?;

        // Transfer: only the first entry is honored
        let (token, amount) = match message.dest_token_amounts.first() {
            Some(transfer) => {
                env.tokens
                    .transfer(transfer.token, self.address, ledger.address(), transfer.amount)?;
                (transfer.token, transfer.amount)
            }
            None => (Address::zero(), U256::zero()),
        };
        if message.dest_token_amounts.len() > 1 {
            debug!(
                message_id = ?message.message_id,
                ignored = message.dest_token_amounts.len() - 1,
                "Ignoring extra token transfers"
            );
        }

        // Dispatch
        {
            let mut as_receiver = env.reborrow(self.address);
            match operation {
                Operation::Deposit { user } => {
                    ledger.credit_user(&mut as_receiver, user, token, amount)?;
                }
                Operation::Withdraw {
                    user,
                    token,
                    amount,
                    destination_chain,
                } => {
                    ledger.execute_withdraw(&mut as_receiver, user, token, amount, destination_chain)?;
                }
            }
        }

        info!(
            message_id = ?message.message_id,
            source_chain = message.source_chain_selector,
            operation = %kind,
            "Applied inbound message"
        );
        env.emit(
            self.address,
            ContractEvent::MessageReceived {
                message_id: message.message_id,
                source_chain: message.source_chain_selector,
                sender,
                operation: tag,
                token,
                amount,
            },
        );
        Ok(())
    }

    // Admin

    pub fn set_ledger(&mut self, env: &mut CallEnv<'_>, ledger: Address) -> ContractResult<()> {
        require_any(self, env.caller, guards::ADMIN)?;
        self.ledger = Some(require_non_zero(ledger)?);
        Ok(())
    }

    pub fn allowlist_source_chain(
        &mut self,
        env: &mut CallEnv<'_>,
        chain: u64,
        allowed: bool,
    ) -> ContractResult<()> {
        require_any(self, env.caller, guards::ADMIN)?;
        if allowed {
            self.allowed_source_chains.insert(chain);
        } else {
            self.allowed_source_chains.remove(&chain);
        }
        Ok(())
    }

    pub fn allowlist_sender(
        &mut self,
        env: &mut CallEnv<'_>,
        sender: Address,
        allowed: bool,
    ) -> ContractResult<()> {
        require_any(self, env.caller, guards::ADMIN)?;
        if allowed {
            self.allowed_senders.insert(sender);
        } else {
            self.allowed_senders.remove(&sender);
        }
        Ok(())
    }

    pub fn transfer_ownership(&mut self, env: &mut CallEnv<'_>, new_owner: Address) -> ContractResult<()> {
        self.ownership.transfer(env.caller, new_owner)
    }

    pub fn accept_ownership(&mut self, env: &mut CallEnv<'_>) -> ContractResult<()> {
        self.ownership.accept(env.caller).map(|_| ())
    }
}
