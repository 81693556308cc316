//! Balance ledger: intents, remote effects and the authenticated send
//!
//! Entry points validate and authorize first, then stage every effect; the
//! chain environment rolls the whole call back if any later step fails, so a
//! failed call never leaves a partial balance or token movement behind.

use super::auth::{guards, require_any, require_non_zero, Ownership, Role, RoleBindings};
use super::chain::CallEnv;
use super::error::{ContractError, ContractResult};
use crate::codec::{decode_execute_send_args, execute_send_selector, Evm2AnyMessage, SELECTOR_LEN};
use crate::events::{ContractEvent, Intent, IntentKind};

use ethers::types::{Address, H256, U256};
use std::collections::HashMap;
use tracing::debug;

/// Per-user, per-token balances
#[derive(Debug, Clone, Default)]
pub struct BalanceStore {
    entries: HashMap<(Address, Address), U256>,
}

impl BalanceStore {
    pub fn get(&self, user: Address, token: Address) -> U256 {
        self.entries
            .get(&(user, token))
            .copied()
            .unwrap_or_default()
    }

    /// Balance after crediting `amount`, without writing it
    fn credited(&self, user: Address, token: Address, amount: U256) -> ContractResult<U256> {
        self.get(user, token)
            .checked_add(amount)
            .ok_or(ContractError::Overflow)
    }

    /// Balance after debiting `amount`, without writing it
    fn debited(&self, user: Address, token: Address, amount: U256) -> ContractResult<U256> {
        let available = self.get(user, token);
        available
            .checked_sub(amount)
            .ok_or(ContractError::InsufficientBalance {
                token,
                available,
                required: amount,
            })
    }

    fn set(&mut self, user: Address, token: Address, balance: U256) {
        if balance.is_zero() {
            self.entries.remove(&(user, token));
        } else {
            self.entries.insert((user, token), balance);
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ledger {
    address: Address,
    ownership: Ownership,
    receiver: Option<Address>,
    forwarder: Option<Address>,
    balances: BalanceStore,
}

impl RoleBindings for Ledger {
    fn holder(&self, role: Role) -> Option<Address> {
        match role {
            Role::Owner => Some(self.ownership.owner()),
            Role::Forwarder => self.forwarder,
            Role::Receiver => self.receiver,
            Role::Router => None,
        }
    }
}

impl Ledger {
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            ownership: Ownership::new(owner),
            receiver: None,
            forwarder: None,
            balances: BalanceStore::default(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.ownership.owner()
    }

    pub fn pending_owner(&self) -> Option<Address> {
        self.ownership.pending_owner()
    }

    pub fn receiver(&self) -> Option<Address> {
        self.receiver
    }

    pub fn forwarder(&self) -> Option<Address> {
        self.forwarder
    }

    pub fn balance_of(&self, user: Address, token: Address) -> U256 {
        self.balances.get(user, token)
    }

    // User intents

    /// Lock `amount` of `token` from the caller and request a deposit on
    /// `destination_chain`
    pub fn request_deposit(
        &mut self,
        env: &mut CallEnv<'_>,
        token: Address,
        amount: U256,
        destination_chain: u64,
    ) -> ContractResult<()> {
        let user = env.caller;
        if amount.is_zero() {
            return Err(ContractError::InvalidAmount);
        }

        let balance = self.balances.credited(user, token, amount)?;
        env.tokens
            .transfer_from(token, self.address, user, self.address, amount)?;
        self.balances.set(user, token, balance);

        self.emit_intent(env, IntentKind::DepositRequested, user, token, amount, destination_chain);
        Ok(())
    }

    /// Debit the caller and request the funds back from `destination_chain`;
    /// nothing leaves custody here
    pub fn request_withdraw(
        &mut self,
        env: &mut CallEnv<'_>,
        token: Address,
        amount: U256,
        destination_chain: u64,
    ) -> ContractResult<()> {
        let user = env.caller;
        self.debit(user, token, amount)?;
        self.emit_intent(env, IntentKind::WithdrawRequested, user, token, amount, destination_chain);
        Ok(())
    }

    // Remote effects (receiver or owner)

    /// Credit `user`; the caller has already moved the tokens into custody
    pub fn credit_user(
        &mut self,
        env: &mut CallEnv<'_>,
        user: Address,
        token: Address,
        amount: U256,
    ) -> ContractResult<()> {
        require_any(self, env.caller, guards::REMOTE_EFFECT)?;

        let balance = self.balances.credited(user, token, amount)?;
        self.balances.set(user, token, balance);
        debug!(?user, ?token, %amount, "Credited user");
        Ok(())
    }

    /// Debit `user` and ask for the funds to be returned on `destination_chain`
    pub fn execute_withdraw(
        &mut self,
        env: &mut CallEnv<'_>,
        user: Address,
        token: Address,
        amount: U256,
        destination_chain: u64,
    ) -> ContractResult<()> {
        require_any(self, env.caller, guards::REMOTE_EFFECT)?;

        self.debit(user, token, amount)?;
        self.emit_intent(
            env,
            IntentKind::WithdrawExecutionRequested,
            user,
            token,
            amount,
            destination_chain,
        );
        Ok(())
    }

    // Outbound sends

    /// Pay the relay fee from custody and hand `message` to the router
    pub fn execute_send(
        &mut self,
        env: &mut CallEnv<'_>,
        destination_chain: u64,
        message: Evm2AnyMessage,
    ) -> ContractResult<H256> {
        require_any(self, env.caller, guards::EXECUTE_SEND)?;
        self.send(env, destination_chain, message)
    }

    /// Authenticated report entry point
    ///
    /// `report` must be the `executeSend` selector followed by its ABI
    /// encoded arguments. `metadata` is accepted and ignored.
    pub fn on_report(
        &mut self,
        env: &mut CallEnv<'_>,
        _metadata: &[u8],
        report: &[u8],
    ) -> ContractResult<H256> {
        require_any(self, env.caller, guards::ON_REPORT)?;

        if report.len() < SELECTOR_LEN {
            return Err(ContractError::InvalidReport(format!(
                "report is {} bytes, shorter than a selector",
                report.len()
            )));
        }
        let (head, args) = report.split_at(SELECTOR_LEN);
        let expected = execute_send_selector();
        if head != expected {
            return Err(ContractError::InvalidReport(format!(
                "selector 0x{} does not match executeSend 0x{}",
                hex::encode(head),
                hex::encode(expected)
            )));
        }
        let (destination_chain, message) = decode_execute_send_args(args)
            .map_err(|e| ContractError::InvalidReport(e.to_string()))?;

        self.send(env, destination_chain, message)
    }

    fn send(
        &mut self,
        env: &mut CallEnv<'_>,
        destination_chain: u64,
        message: Evm2AnyMessage,
    ) -> ContractResult<H256> {
        let router = env.router.address();
        let fee = env.router.get_fee(destination_chain, &message)?;
        let available = env.tokens.balance_of(message.fee_token, self.address);
        if available < fee {
            return Err(ContractError::InsufficientFeeToken {
                available,
                required: fee,
            });
        }

        // Allowances are set to exactly what this send needs
        let mut fee_allowance = fee;
        if let Some(transfer) = message.first_transfer() {
            if transfer.token == message.fee_token {
                fee_allowance = fee_allowance
                    .checked_add(transfer.amount)
                    .ok_or(ContractError::Overflow)?;
            } else {
                env.tokens
                    .approve(transfer.token, self.address, router, transfer.amount);
            }
        }
        env.tokens
            .approve(message.fee_token, self.address, router, fee_allowance);

        let message_id = env
            .router
            .ccip_send(env.tokens, self.address, destination_chain, message)?;

        env.emit(
            self.address,
            ContractEvent::MessageSent {
                message_id,
                destination_chain,
            },
        );
        Ok(message_id)
    }

    // Admin

    pub fn set_receiver(&mut self, env: &mut CallEnv<'_>, receiver: Address) -> ContractResult<()> {
        require_any(self, env.caller, guards::ADMIN)?;
        self.receiver = Some(require_non_zero(receiver)?);
        Ok(())
    }

    pub fn set_forwarder(&mut self, env: &mut CallEnv<'_>, forwarder: Address) -> ContractResult<()> {
        require_any(self, env.caller, guards::ADMIN)?;
        self.forwarder = Some(require_non_zero(forwarder)?);
        Ok(())
    }

    /// Move stray tokens out of custody
    pub fn recover_tokens(
        &mut self,
        env: &mut CallEnv<'_>,
        token: Address,
        to: Address,
        amount: U256,
    ) -> ContractResult<()> {
        require_any(self, env.caller, guards::ADMIN)?;
        let to = require_non_zero(to)?;
        env.tokens.transfer(token, self.address, to, amount)
    }

    pub fn transfer_ownership(&mut self, env: &mut CallEnv<'_>, new_owner: Address) -> ContractResult<()> {
        self.ownership.transfer(env.caller, new_owner)
    }

    pub fn accept_ownership(&mut self, env: &mut CallEnv<'_>) -> ContractResult<()> {
        self.ownership.accept(env.caller).map(|_| ())
    }

    fn debit(&mut self, user: Address, token: Address, amount: U256) -> ContractResult<()> {
        if amount.is_zero() {
            return Err(ContractError::InvalidAmount);
        }
        let balance = self.balances.debited(user, token, amount)?;
        self.balances.set(user, token, balance);
        Ok(())
    }

    fn emit_intent(
        &self,
        env: &mut CallEnv<'_>,
        kind: IntentKind,
        user: Address,
        token: Address,
        amount: U256,
        destination_chain: u64,
    ) {
        env.emit(
            self.address,
            ContractEvent::Intent(Intent {
                kind,
                user,
                token,
                amount,
                destination_chain,
            }),
        );
    }
}
