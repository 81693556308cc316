//! Execution environment of one chain
//!
//! A [`Chain`] owns the token book, router, ledger, receiver and emitted logs
//! of a single chain. Every entry point runs through [`Chain::atomic`]: the
//! environment is snapshotted before the call and restored if the call
//! fails, so callers observe either the full pre-state or the full
//! post-state.

use super::error::{ContractError, ContractResult};
use super::ledger::Ledger;
use super::receiver::Receiver;
use super::router::{LocalRouter, OutboundRecord};
use super::token::TokenBook;
use crate::codec::{keccak256, Any2EvmMessage, Evm2AnyMessage, ReadCall};
use crate::events::ContractEvent;

use ethers::abi::{self, Token};
use ethers::types::{Address, Bytes, Log, H256, U256, U64};
use tracing::{debug, warn};

/// Caller context and the shared state a contract call may touch
pub struct CallEnv<'a> {
    pub caller: Address,
    pub tokens: &'a mut TokenBook,
    pub router: &'a mut LocalRouter,
    pub logs: &'a mut Vec<Log>,
}

impl<'a> CallEnv<'a> {
    /// Same state, different caller (contract-to-contract calls)
    pub fn reborrow(&mut self, caller: Address) -> CallEnv<'_> {
        CallEnv {
            caller,
            tokens: &mut *self.tokens,
            router: &mut *self.router,
            logs: &mut *self.logs,
        }
    }

    pub fn emit(&mut self, emitter: Address, event: ContractEvent) {
        debug!(event = event.name(), ?emitter, "Event emitted");
        self.logs.push(event.to_log(emitter));
    }
}

/// Contract addresses deployed on a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainAddresses {
    pub ledger: Address,
    pub receiver: Address,
    pub router: Address,
}

#[derive(Debug, Clone)]
pub struct Chain {
    name: String,
    selector: u64,
    tokens: TokenBook,
    router: LocalRouter,
    ledger: Ledger,
    receiver: Receiver,
    logs: Vec<Log>,
    block_number: u64,
    tx_count: u64,
    last_tx_hash: H256,
}

impl Chain {
    /// Deploy ledger, receiver and router, all owned by `owner`
    pub fn new(name: impl Into<String>, selector: u64, owner: Address, addresses: ChainAddresses) -> Self {
        Self {
            name: name.into(),
            selector,
            tokens: TokenBook::new(),
            router: LocalRouter::new(addresses.router, selector),
            ledger: Ledger::new(addresses.ledger, owner),
            receiver: Receiver::new(addresses.receiver, addresses.router, owner),
            logs: Vec::new(),
            block_number: 0,
            tx_count: 0,
            last_tx_hash: H256::zero(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selector(&self) -> u64 {
        self.selector
    }

    pub fn addresses(&self) -> ChainAddresses {
        ChainAddresses {
            ledger: self.ledger.address(),
            receiver: self.receiver.address(),
            router: self.router.address(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    /// Hash of the most recent call, committed or reverted
    pub fn last_tx_hash(&self) -> H256 {
        self.last_tx_hash
    }

    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    pub fn token_balance(&self, token: Address, holder: Address) -> U256 {
        self.tokens.balance_of(token, holder)
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.tokens.allowance(token, owner, spender)
    }

    /// Run `f` as one atomic call by `caller`
    fn atomic<T>(
        &mut self,
        caller: Address,
        f: impl FnOnce(&mut Ledger, &mut Receiver, &mut CallEnv<'_>) -> ContractResult<T>,
    ) -> ContractResult<T> {
        let snapshot = self.clone();
        let first_new_log = self.logs.len();

        let tx_hash = H256(keccak256(abi::encode(&[
            Token::Uint(U256::from(self.selector)),
            Token::Uint(U256::from(self.tx_count)),
            Token::Address(caller),
        ])));

        let result = {
            let Chain {
                tokens,
                router,
                ledger,
                receiver,
                logs,
                ..
            } = self;
            let mut env = CallEnv {
                caller,
                tokens,
                router,
                logs,
            };
            f(ledger, receiver, &mut env)
        };

        match result {
            Ok(value) => {
                self.block_number += 1;
                let block_number = self.block_number;
                for (index, log) in self.logs[first_new_log..].iter_mut().enumerate() {
                    log.block_number = Some(U64::from(block_number));
                    log.transaction_hash = Some(tx_hash);
                    log.log_index = Some(U256::from(index));
                }
                self.tx_count += 1;
                self.last_tx_hash = tx_hash;
                Ok(value)
            }
            Err(e) => {
                warn!(chain = %self.name, ?caller, error = %e, "Call reverted");
                *self = snapshot;
                self.tx_count += 1;
                self.last_tx_hash = tx_hash;
                Err(e)
            }
        }
    }

    // Tokens

    pub fn mint(&mut self, token: Address, to: Address, amount: U256) -> ContractResult<()> {
        self.atomic(to, |_, _, env| env.tokens.mint(token, to, amount))
    }

    pub fn approve(&mut self, caller: Address, token: Address, spender: Address, amount: U256) -> ContractResult<()> {
        self.atomic(caller, |_, _, env| {
            env.tokens.approve(token, caller, spender, amount);
            Ok(())
        })
    }

    pub fn set_router_fee(&mut self, destination: u64, fee: U256) {
        self.router.set_fee(destination, fee);
    }

    /// Drain messages the router accepted since the last call
    pub fn take_outbox(&mut self) -> Vec<OutboundRecord> {
        self.router.take_outbox()
    }

    // Ledger

    pub fn request_deposit(&mut self, caller: Address, token: Address, amount: U256, destination_chain: u64) -> ContractResult<()> {
        self.atomic(caller, |ledger, _, env| {
            ledger.request_deposit(env, token, amount, destination_chain)
        })
    }

    pub fn request_withdraw(&mut self, caller: Address, token: Address, amount: U256, destination_chain: u64) -> ContractResult<()> {
        self.atomic(caller, |ledger, _, env| {
            ledger.request_withdraw(env, token, amount, destination_chain)
        })
    }

    pub fn credit_user(&mut self, caller: Address, user: Address, token: Address, amount: U256) -> ContractResult<()> {
        self.atomic(caller, |ledger, _, env| ledger.credit_user(env, user, token, amount))
    }

    pub fn execute_withdraw(
        &mut self,
        caller: Address,
        user: Address,
        token: Address,
        amount: U256,
        destination_chain: u64,
    ) -> ContractResult<()> {
        self.atomic(caller, |ledger, _, env| {
            ledger.execute_withdraw(env, user, token, amount, destination_chain)
        })
    }

    pub fn execute_send(&mut self, caller: Address, destination_chain: u64, message: Evm2AnyMessage) -> ContractResult<H256> {
        self.atomic(caller, |ledger, _, env| {
            ledger.execute_send(env, destination_chain, message)
        })
    }

    pub fn on_report(&mut self, caller: Address, metadata: &[u8], report: &[u8]) -> ContractResult<H256> {
        self.atomic(caller, |ledger, _, env| ledger.on_report(env, metadata, report))
    }

    pub fn set_receiver(&mut self, caller: Address, receiver: Address) -> ContractResult<()> {
        self.atomic(caller, |ledger, _, env| ledger.set_receiver(env, receiver))
    }

    pub fn set_forwarder(&mut self, caller: Address, forwarder: Address) -> ContractResult<()> {
        self.atomic(caller, |ledger, _, env| ledger.set_forwarder(env, forwarder))
    }

    pub fn recover_tokens(&mut self, caller: Address, token: Address, to: Address, amount: U256) -> ContractResult<()> {
        self.atomic(caller, |ledger, _, env| ledger.recover_tokens(env, token, to, amount))
    }

    pub fn transfer_ledger_ownership(&mut self, caller: Address, new_owner: Address) -> ContractResult<()> {
        self.atomic(caller, |ledger, _, env| ledger.transfer_ownership(env, new_owner))
    }

    pub fn accept_ledger_ownership(&mut self, caller: Address) -> ContractResult<()> {
        self.atomic(caller, |ledger, _, env| ledger.accept_ownership(env))
    }

    // Receiver

    /// Router delivery: release the bridged tokens to the receiver and run
    /// `ccipReceive` in the same atomic call
    pub fn deliver(&mut self, message: &Any2EvmMessage) -> ContractResult<()> {
        let router = self.router.address();
        self.atomic(router, |ledger, receiver, env| {
            for transfer in &message.dest_token_amounts {
                env.tokens
                    .mint(transfer.token, receiver.address(), transfer.amount)?;
            }
            receiver.ccip_receive(env, ledger, message)
        })
    }

    /// Call `ccipReceive` directly as `caller`
    pub fn ccip_receive(&mut self, caller: Address, message: &Any2EvmMessage) -> ContractResult<()> {
        self.atomic(caller, |ledger, receiver, env| receiver.ccip_receive(env, ledger, message))
    }

    pub fn set_target_ledger(&mut self, caller: Address, ledger_address: Address) -> ContractResult<()> {
        self.atomic(caller, |_, receiver, env| receiver.set_ledger(env, ledger_address))
    }

    pub fn allowlist_source_chain(&mut self, caller: Address, chain: u64, allowed: bool) -> ContractResult<()> {
        self.atomic(caller, |_, receiver, env| {
            receiver.allowlist_source_chain(env, chain, allowed)
        })
    }

    pub fn allowlist_sender(&mut self, caller: Address, sender: Address, allowed: bool) -> ContractResult<()> {
        self.atomic(caller, |_, receiver, env| receiver.allowlist_sender(env, sender, allowed))
    }

    pub fn transfer_receiver_ownership(&mut self, caller: Address, new_owner: Address) -> ContractResult<()> {
        self.atomic(caller, |_, receiver, env| receiver.transfer_ownership(env, new_owner))
    }

    pub fn accept_receiver_ownership(&mut self, caller: Address) -> ContractResult<()> {
        self.atomic(caller, |_, receiver, env| receiver.accept_ownership(env))
    }

    // Reads

    /// Answer a read-only call: `balanceOf` on any token, `getFee` on the router
    pub fn static_call(&self, to: Address, calldata: &[u8]) -> ContractResult<Bytes> {
        let value = match ReadCall::decode(calldata)? {
            ReadCall::BalanceOf { holder } => self.tokens.balance_of(to, holder),
            ReadCall::GetFee {
                destination_chain,
                message,
            } => {
                if to != self.router.address() {
                    return Err(ContractError::InvalidRouter(to));
                }
                self.router.get_fee(destination_chain, &message)?
            }
        };
        Ok(abi::encode(&[Token::Uint(value)]).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{
        encode_address, encode_execute_send, encode_extra_args, Operation, TokenAmount,
    };
    use crate::events::{EventParser, IntentKind};

    const SELECTOR: u64 = 16015286601757825753;
    const REMOTE: u64 = 3478487238524512106;

    fn owner() -> Address {
        Address::repeat_byte(0x0f)
    }
    fn forwarder() -> Address {
        Address::repeat_byte(0xf0)
    }
    fn user() -> Address {
        Address::repeat_byte(0x01)
    }
    fn asset() -> Address {
        Address::repeat_byte(0xa5)
    }
    fn link() -> Address {
        Address::repeat_byte(0x11)
    }
    fn remote_ledger() -> Address {
        Address::repeat_byte(0x7e)
    }
    fn e18() -> U256 {
        U256::exp10(18)
    }

    /// Roles wired, user funded and approved, remote destination enabled, a funded user and a remote destination
    fn deployed_chain() -> Chain {
        let addresses = ChainAddresses {
            ledger: Address::repeat_byte(0x1e),
            receiver: Address::repeat_byte(0x2e),
            router: Address::repeat_byte(0x3e),
        };
        let mut chain = Chain::new("sepolia", SELECTOR, owner(), addresses);
        chain.set_receiver(owner(), addresses.receiver).unwrap();
        chain.set_forwarder(owner(), forwarder()).unwrap();
        chain.set_target_ledger(owner(), addresses.ledger).unwrap();
        chain.allowlist_source_chain(owner(), REMOTE, true).unwrap();
        chain.allowlist_sender(owner(), remote_ledger(), true).unwrap();
        chain.set_router_fee(REMOTE, U256::from(1_000u64));

        chain.mint(asset(), user(), e18() * 10).unwrap();
        chain
            .approve(user(), asset(), addresses.ledger, U256::MAX)
            .unwrap();
        chain
    }

    fn deposit_message(with_transfer: bool) -> Evm2AnyMessage {
        Evm2AnyMessage {
            receiver: encode_address(Address::repeat_byte(0x99)),
            data: Operation::Deposit { user: user() }.encode(),
            token_amounts: if with_transfer {
                vec![TokenAmount {
                    token: asset(),
                    amount: e18(),
                }]
            } else {
                vec![]
            },
            fee_token: link(),
            extra_args: encode_extra_args(Some(200_000)),
        }
    }

    fn inbound(data: Bytes, transfers: Vec<TokenAmount>) -> Any2EvmMessage {
        Any2EvmMessage {
            message_id: H256::repeat_byte(0x42),
            source_chain_selector: REMOTE,
            sender: encode_address(remote_ledger()),
            data,
            dest_token_amounts: transfers,
        }
    }

    // Ledger intents

    #[test]
    fn test_request_deposit_credits_and_pulls_tokens() {
        let mut chain = deployed_chain();
        let ledger = chain.addresses().ledger;
        let before = chain.token_balance(asset(), user());

        chain.request_deposit(user(), asset(), e18(), REMOTE).unwrap();

        assert_eq!(chain.ledger().balance_of(user(), asset()), e18());
        assert_eq!(chain.token_balance(asset(), ledger), e18());
        assert_eq!(chain.token_balance(asset(), user()), before - e18());

        let intent = EventParser::new()
            .parse_log(chain.logs().last().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(intent.kind, IntentKind::DepositRequested);
        assert_eq!(intent.user, user());
        assert_eq!(intent.amount, e18());
        assert_eq!(intent.destination_chain, REMOTE);
    }

    #[test]
    fn test_zero_amount_intents_rejected() {
        let mut chain = deployed_chain();
        let logs = chain.logs().len();
        assert_eq!(
            chain.request_deposit(user(), asset(), U256::zero(), REMOTE),
            Err(ContractError::InvalidAmount)
        );
        assert_eq!(
            chain.request_withdraw(user(), asset(), U256::zero(), REMOTE),
            Err(ContractError::InvalidAmount)
        );
        assert_eq!(chain.ledger().balance_of(user(), asset()), U256::zero());
        assert_eq!(chain.logs().len(), logs);
    }

    #[test]
    fn test_failed_pull_leaves_no_balance() {
        let mut chain = deployed_chain();
        let stranger = Address::repeat_byte(0x55);
        // no tokens, no allowance
        let err = chain
            .request_deposit(stranger, asset(), e18(), REMOTE)
            .unwrap_err();
        assert!(matches!(err, ContractError::InsufficientAllowance { .. }));
        assert_eq!(chain.ledger().balance_of(stranger, asset()), U256::zero());
    }

    #[test]
    fn test_withdraw_more_than_balance() {
        let mut chain = deployed_chain();
        chain.request_deposit(user(), asset(), U256::from(50u64), REMOTE).unwrap();

        assert_eq!(
            chain.request_withdraw(user(), asset(), U256::from(51u64), REMOTE),
            Err(ContractError::InsufficientBalance {
                token: asset(),
                available: U256::from(50u64),
                required: U256::from(51u64),
            })
        );
        assert_eq!(chain.ledger().balance_of(user(), asset()), U256::from(50u64));
    }

    #[test]
    fn test_deposit_then_withdraw_restores_balance() {
        let mut chain = deployed_chain();
        let before = chain.ledger().balance_of(user(), asset());
        chain.request_deposit(user(), asset(), U256::from(100u64), REMOTE).unwrap();
        chain.request_withdraw(user(), asset(), U256::from(100u64), REMOTE).unwrap();
        assert_eq!(chain.ledger().balance_of(user(), asset()), before);

        // withdraw keeps funds in custody
        assert_eq!(
            chain.token_balance(asset(), chain.addresses().ledger),
            U256::from(100u64)
        );
        let intent = EventParser::new()
            .parse_log(chain.logs().last().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(intent.kind, IntentKind::WithdrawRequested);
    }

    // Remote effects

    #[test]
    fn test_credit_and_execute_withdraw_are_gated() {
        let mut chain = deployed_chain();
        let receiver = chain.addresses().receiver;

        assert_eq!(
            chain.credit_user(user(), user(), asset(), e18()),
            Err(ContractError::Unauthorized { caller: user() })
        );
        assert!(matches!(
            chain.execute_withdraw(forwarder(), user(), asset(), e18(), REMOTE),
            Err(ContractError::Unauthorized { .. })
        ));

        chain.credit_user(receiver, user(), asset(), e18()).unwrap();
        chain.credit_user(owner(), user(), asset(), e18()).unwrap();
        assert_eq!(chain.ledger().balance_of(user(), asset()), e18() * 2);

        chain
            .execute_withdraw(receiver, user(), asset(), e18(), REMOTE)
            .unwrap();
        assert_eq!(chain.ledger().balance_of(user(), asset()), e18());
        let intent = EventParser::new()
            .parse_log(chain.logs().last().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(intent.kind, IntentKind::WithdrawExecutionRequested);
    }

    #[test]
    fn test_execute_withdraw_checks_balance() {
        let mut chain = deployed_chain();
        let receiver = chain.addresses().receiver;
        assert!(matches!(
            chain.execute_withdraw(receiver, user(), asset(), e18(), REMOTE),
            Err(ContractError::InsufficientBalance { .. })
        ));
        assert_eq!(
            chain.execute_withdraw(receiver, user(), asset(), U256::zero(), REMOTE),
            Err(ContractError::InvalidAmount)
        );
    }

    // Sends

    #[test]
    fn test_execute_send_without_fee_token_has_no_side_effects() {
        let mut chain = deployed_chain();
        let addresses = chain.addresses();
        chain.request_deposit(user(), asset(), e18(), REMOTE).unwrap();
        chain.mint(link(), addresses.ledger, U256::from(999u64)).unwrap();
        let message = deposit_message(true);

        assert_eq!(
            chain.execute_send(forwarder(), REMOTE, message),
            Err(ContractError::InsufficientFeeToken {
                available: U256::from(999u64),
                required: U256::from(1_000u64),
            })
        );
        assert_eq!(chain.allowance(link(), addresses.ledger, addresses.router), U256::zero());
        assert_eq!(chain.allowance(asset(), addresses.ledger, addresses.router), U256::zero());
        assert_eq!(chain.token_balance(asset(), addresses.ledger), e18());
        assert!(chain.take_outbox().is_empty());
    }

    #[test]
    fn test_execute_send_pays_fee_and_emits() {
        let mut chain = deployed_chain();
        let addresses = chain.addresses();
        chain.request_deposit(user(), asset(), e18(), REMOTE).unwrap();
        chain.mint(link(), addresses.ledger, U256::from(5_000u64)).unwrap();

        let message_id = chain
            .execute_send(owner(), REMOTE, deposit_message(true))
            .unwrap();

        assert_eq!(chain.token_balance(link(), addresses.ledger), U256::from(4_000u64));
        assert_eq!(chain.token_balance(asset(), addresses.ledger), U256::zero());
        assert_eq!(chain.token_balance(asset(), addresses.router), e18());

        let outbox = chain.take_outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].message_id, message_id);
        assert_eq!(outbox[0].sender, addresses.ledger);

        let sent = chain.logs().last().unwrap();
        assert_eq!(sent.topics[1], message_id);
    }

    #[test]
    fn test_execute_send_requires_owner_or_forwarder() {
        let mut chain = deployed_chain();
        assert_eq!(
            chain.execute_send(user(), REMOTE, deposit_message(false)),
            Err(ContractError::Unauthorized { caller: user() })
        );
    }

    #[test]
    fn test_router_failure_rolls_back_allowances() {
        let mut chain = deployed_chain();
        let addresses = chain.addresses();
        chain.mint(link(), addresses.ledger, U256::from(5_000u64)).unwrap();
        // transfer requested without custody of the asset
        let err = chain
            .execute_send(forwarder(), REMOTE, deposit_message(true))
            .unwrap_err();
        assert!(matches!(err, ContractError::InsufficientTokenBalance { .. }));
        assert_eq!(chain.allowance(link(), addresses.ledger, addresses.router), U256::zero());
        assert_eq!(chain.token_balance(link(), addresses.ledger), U256::from(5_000u64));
    }

    // Reports

    #[test]
    fn test_on_report_gating() {
        let mut chain = deployed_chain();
        let addresses = chain.addresses();
        chain.mint(link(), addresses.ledger, U256::from(5_000u64)).unwrap();
        let report = encode_execute_send(REMOTE, &deposit_message(false));

        // owner may call executeSend but not onReport
        assert_eq!(
            chain.on_report(owner(), &[], &report),
            Err(ContractError::Unauthorized { caller: owner() })
        );
        assert!(matches!(
            chain.on_report(forwarder(), &[], &report[..3]),
            Err(ContractError::InvalidReport(_))
        ));

        let mut wrong_selector = report.to_vec();
        wrong_selector[0] ^= 0xff;
        assert!(matches!(
            chain.on_report(forwarder(), &[], &wrong_selector),
            Err(ContractError::InvalidReport(_))
        ));

        assert!(matches!(
            chain.on_report(forwarder(), &[], &report[..40]),
            Err(ContractError::InvalidReport(_))
        ));

        chain.on_report(forwarder(), b"metadata", &report).unwrap();
        assert_eq!(chain.take_outbox().len(), 1);
    }

    // Receiver

    #[test]
    fn test_deliver_deposit_credits_user() {
        let mut chain = deployed_chain();
        let addresses = chain.addresses();
        let message = inbound(
            Operation::Deposit { user: user() }.encode(),
            vec![TokenAmount {
                token: asset(),
                amount: e18(),
            }],
        );

        chain.deliver(&message).unwrap();

        assert_eq!(chain.ledger().balance_of(user(), asset()), e18());
        assert_eq!(chain.token_balance(asset(), addresses.ledger), e18());
        assert_eq!(chain.token_balance(asset(), addresses.receiver), U256::zero());
        assert_eq!(chain.logs().last().unwrap().address, addresses.receiver);
    }

    #[test]
    fn test_deliver_withdraw_emits_execution_intent() {
        let mut chain = deployed_chain();
        let receiver = chain.addresses().receiver;
        chain.credit_user(receiver, user(), asset(), e18()).unwrap();

        let message = inbound(
            Operation::Withdraw {
                user: user(),
                token: asset(),
                amount: e18(),
                destination_chain: REMOTE,
            }
            .encode(),
            vec![],
        );
        chain.deliver(&message).unwrap();

        assert_eq!(chain.ledger().balance_of(user(), asset()), U256::zero());
        let logs = chain.logs();
        let intent = EventParser::new()
            .parse_log(&logs[logs.len() - 2])
            .unwrap()
            .unwrap();
        assert_eq!(intent.kind, IntentKind::WithdrawExecutionRequested);
        assert_eq!(intent.destination_chain, REMOTE);
        // audit event carries zero token/amount when nothing was transferred
        assert_eq!(logs[logs.len() - 1].address, receiver);
    }

    #[test]
    fn test_receiver_rejects_unallowlisted_provenance() {
        let mut chain = deployed_chain();
        let good = inbound(Operation::Deposit { user: user() }.encode(), vec![]);

        let mut wrong_chain = good.clone();
        wrong_chain.source_chain_selector = 1;
        assert_eq!(chain.deliver(&wrong_chain), Err(ContractError::SourceChainNotAllowed(1)));

        let mut wrong_sender = good.clone();
        wrong_sender.sender = encode_address(user());
        assert_eq!(chain.deliver(&wrong_sender), Err(ContractError::SenderNotAllowed(user())));

        chain.allowlist_source_chain(owner(), REMOTE, false).unwrap();
        assert_eq!(chain.deliver(&good), Err(ContractError::SourceChainNotAllowed(REMOTE)));
    }

    #[test]
    fn test_receiver_only_accepts_router() {
        let mut chain = deployed_chain();
        let message = inbound(Operation::Deposit { user: user() }.encode(), vec![]);
        assert_eq!(
            chain.ccip_receive(owner(), &message),
            Err(ContractError::InvalidRouter(owner()))
        );
        let router = chain.addresses().router;
        chain.ccip_receive(router, &message).unwrap();
    }

    #[test]
    fn test_unknown_operation_rolls_back_delivery() {
        let mut chain = deployed_chain();
        let addresses = chain.addresses();
        let data = abi::encode(&[Token::String("STAKE".into()), Token::Bytes(vec![])]);
        let message = inbound(
            data.into(),
            vec![TokenAmount {
                token: asset(),
                amount: e18(),
            }],
        );

        assert_eq!(
            chain.deliver(&message),
            Err(ContractError::InvalidOperation("STAKE".into()))
        );
        assert_eq!(chain.token_balance(asset(), addresses.receiver), U256::zero());
        assert_eq!(chain.token_balance(asset(), addresses.ledger), U256::zero());
    }

    #[test]
    fn test_only_first_transfer_is_applied() {
        let mut chain = deployed_chain();
        let addresses = chain.addresses();
        let message = inbound(
            Operation::Deposit { user: user() }.encode(),
            vec![
                TokenAmount {
                    token: asset(),
                    amount: e18(),
                },
                TokenAmount {
                    token: link(),
                    amount: e18(),
                },
            ],
        );
        chain.deliver(&message).unwrap();
        assert_eq!(chain.ledger().balance_of(user(), asset()), e18());
        assert_eq!(chain.ledger().balance_of(user(), link()), U256::zero());
        // second transfer is left with the receiver
        assert_eq!(chain.token_balance(link(), addresses.receiver), e18());
    }

    // Admin

    #[test]
    fn test_admin_is_owner_only() {
        let mut chain = deployed_chain();
        assert!(matches!(
            chain.set_forwarder(user(), user()),
            Err(ContractError::Unauthorized { .. })
        ));
        assert!(matches!(
            chain.allowlist_sender(user(), user(), true),
            Err(ContractError::Unauthorized { .. })
        ));
        assert_eq!(
            chain.set_receiver(owner(), Address::zero()),
            Err(ContractError::ZeroAddress)
        );
    }

    #[test]
    fn test_recover_tokens_and_ownership_handshake() {
        let mut chain = deployed_chain();
        let ledger = chain.addresses().ledger;
        let next_owner = Address::repeat_byte(0x77);
        chain.mint(link(), ledger, U256::from(10u64)).unwrap();

        chain
            .recover_tokens(owner(), link(), owner(), U256::from(10u64))
            .unwrap();
        assert_eq!(chain.token_balance(link(), owner()), U256::from(10u64));

        chain.transfer_ledger_ownership(owner(), next_owner).unwrap();
        assert_eq!(chain.ledger().owner(), owner());
        chain.accept_ledger_ownership(next_owner).unwrap();
        assert_eq!(chain.ledger().owner(), next_owner);
        assert!(chain
            .recover_tokens(owner(), link(), owner(), U256::zero())
            .is_err());
    }

    #[test]
    fn test_receiver_ownership_handshake() {
        let mut chain = deployed_chain();
        let next_owner = Address::repeat_byte(0x78);

        chain.transfer_receiver_ownership(owner(), next_owner).unwrap();
        assert!(matches!(
            chain.accept_receiver_ownership(owner()),
            Err(ContractError::NotPendingOwner(_))
        ));
        chain.accept_receiver_ownership(next_owner).unwrap();
        assert_eq!(chain.receiver().owner(), next_owner);
        assert!(chain.allowlist_source_chain(owner(), 7, true).is_err());
    }

    #[test]
    fn test_static_calls() {
        let mut chain = deployed_chain();
        let addresses = chain.addresses();
        chain.mint(link(), addresses.ledger, U256::from(7u64)).unwrap();

        let balance = chain
            .static_call(link(), &crate::codec::encode_balance_of(addresses.ledger))
            .unwrap();
        assert_eq!(crate::codec::decode_uint(&balance).unwrap(), U256::from(7u64));

        let message = deposit_message(false);
        let fee = chain
            .static_call(addresses.router, &crate::codec::encode_get_fee(REMOTE, &message))
            .unwrap();
        assert_eq!(crate::codec::decode_uint(&fee).unwrap(), U256::from(1_000u64));
    }

    #[test]
    fn test_committed_logs_are_stamped() {
        let mut chain = deployed_chain();
        chain.request_deposit(user(), asset(), e18(), REMOTE).unwrap();
        let log = chain.logs().last().unwrap();
        assert_eq!(log.block_number, Some(U64::from(chain.block_number())));
        assert_eq!(log.transaction_hash, Some(chain.last_tx_hash()));
    }
}
