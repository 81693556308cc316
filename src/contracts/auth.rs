//! Authorization gate shared by the ledger and the receiver
//!
//! Every mutating entry point calls one of these predicates before touching
//! state. They are pure: the only inputs are the caller and the contract's
//! current role bindings.

use super::error::{ContractError, ContractResult};

use ethers::types::Address;

/// Roles a caller can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Governance
    Owner,
    /// Sole caller of the authenticated report entry point
    Forwarder,
    /// Sole non-owner caller of the remote-effect entry points
    Receiver,
    /// Transport router delivering inbound messages
    Router,
}

/// Who may call which ledger entry point
pub mod guards {
    use super::Role;

    pub const REMOTE_EFFECT: &[Role] = &[Role::Receiver, Role::Owner];
    pub const EXECUTE_SEND: &[Role] = &[Role::Owner, Role::Forwarder];
    pub const ON_REPORT: &[Role] = &[Role::Forwarder];
    pub const ADMIN: &[Role] = &[Role::Owner];
    pub const INBOUND: &[Role] = &[Role::Router];
}

/// Role bindings held by a contract
pub trait RoleBindings {
    fn holder(&self, role: Role) -> Option<Address>;
}

/// Whether `caller` holds `role`
pub fn has_role(bindings: &impl RoleBindings, caller: Address, role: Role) -> bool {
    bindings.holder(role) == Some(caller)
}

/// Fail with `Unauthorized` unless `caller` holds one of `roles`
pub fn require_any(
    bindings: &impl RoleBindings,
    caller: Address,
    roles: &[Role],
) -> ContractResult<()> {
    if roles.iter().any(|role| has_role(bindings, caller, *role)) {
        Ok(())
    } else {
        Err(ContractError::Unauthorized { caller })
    }
}

/// Reject the zero address for role bindings and recipients
pub fn require_non_zero(address: Address) -> ContractResult<Address> {
    if address.is_zero() {
        Err(ContractError::ZeroAddress)
    } else {
        Ok(address)
    }
}

/// Two-step ownership: the current owner nominates, the nominee accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    owner: Address,
    pending: Option<Address>,
}

impl Ownership {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            pending: None,
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn pending_owner(&self) -> Option<Address> {
        self.pending
    }

    /// Nominate `new_owner`; ownership does not move until it is accepted
    pub fn transfer(&mut self, caller: Address, new_owner: Address) -> ContractResult<()> {
        if caller != self.owner {
            return Err(ContractError::Unauthorized { caller });
        }
        self.pending = Some(require_non_zero(new_owner)?);
        Ok(())
    }

    pub fn accept(&mut self, caller: Address) -> ContractResult<Address> {
        match self.pending {
            Some(pending) if pending == caller => {
                let previous = self.owner;
                self.owner = pending;
                self.pending = None;
                Ok(previous)
            }
            _ => Err(ContractError::NotPendingOwner(caller)),
        }
    }
}
