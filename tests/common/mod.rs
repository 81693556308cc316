//! Two local chains wired for relaying in both directions

#![allow(dead_code)]

use async_trait::async_trait;
use ethers::types::{Address, Bytes, Log, U256};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use xchain_settlement::chain::local::{shared, LocalCaller, LocalLogFeed, LocalWriter, SharedChain};
use xchain_settlement::chain::{
    ChainDirectory, ChainEntry, ContractCaller, ReportWriter, WriteReceipt,
};
use xchain_settlement::config::ChainContracts;
use xchain_settlement::contracts::{Chain, ChainAddresses};
use xchain_settlement::coordination::{IntentPipeline, Outcome, OutcomeSink, Preflight};
use xchain_settlement::RelayerResult;

pub const X_SELECTOR: u64 = 16015286601757825753;
pub const S_SELECTOR: u64 = 3478487238524512106;
pub const ROUTER_FEE: u64 = 1_000_000;
pub const DEST_GAS_LIMIT: u64 = 200_000;

pub fn owner() -> Address {
    Address::repeat_byte(0x0f)
}

/// The relayer's key, bound as forwarder on both ledgers
pub fn forwarder() -> Address {
    Address::repeat_byte(0xf0)
}

pub fn user() -> Address {
    Address::repeat_byte(0x01)
}

/// Bridged asset, same address on both chains
pub fn asset() -> Address {
    Address::repeat_byte(0xa5)
}

pub fn e18() -> U256 {
    U256::exp10(18)
}

fn contracts(base: u8) -> ChainContracts {
    ChainContracts {
        ledger: Address::repeat_byte(base),
        receiver: Address::repeat_byte(base + 1),
        router: Address::repeat_byte(base + 2),
        fee_token: Address::repeat_byte(base + 3),
    }
}

/// Counts calls going through a capability
pub struct Counting<T> {
    inner: T,
    pub calls: AtomicUsize,
}

impl<T> Counting<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: ContractCaller> ContractCaller for Counting<T> {
    async fn call(&self, to: Address, data: Bytes) -> RelayerResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.call(to, data).await
    }
}

#[async_trait]
impl<T: ReportWriter> ReportWriter for Counting<T> {
    async fn write_report(
        &self,
        ledger: Address,
        report: Bytes,
        gas_limit: Option<u64>,
    ) -> RelayerResult<WriteReceipt> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.write_report(ledger, report, gas_limit).await
    }
}

/// Collects outcomes in arrival order
#[derive(Default)]
pub struct CollectingSink {
    pub outcomes: Mutex<Vec<(String, Outcome)>>,
}

impl CollectingSink {
    pub fn snapshot(&self) -> Vec<(String, Outcome)> {
        self.outcomes.lock().unwrap().clone()
    }
}

impl OutcomeSink for CollectingSink {
    fn record(&self, chain: &str, _log: &Log, outcome: &Outcome) {
        self.outcomes
            .lock()
            .unwrap()
            .push((chain.to_string(), outcome.clone()));
    }
}

/// Local side of one chain plus the relayer's view of it
pub struct Side {
    pub chain: SharedChain,
    pub entry: ChainEntry,
    pub caller: Arc<Counting<LocalCaller>>,
    pub writer: Arc<Counting<LocalWriter>>,
}

impl Side {
    pub fn pipeline(&self, directory: Arc<ChainDirectory>) -> IntentPipeline {
        IntentPipeline::new(
            self.entry.clone(),
            directory,
            self.caller.clone(),
            self.writer.clone(),
            Preflight {
                check_fee_token: true,
                check_token: true,
            },
        )
        .with_dest_gas_limit(Some(DEST_GAS_LIMIT))
    }

    pub fn feed(&self) -> LocalLogFeed {
        LocalLogFeed::new(self.chain.clone()).unwrap()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut Chain) -> R) -> R {
        f(&mut self.chain.lock().unwrap())
    }
}

pub struct World {
    pub x: Side,
    pub s: Side,
    pub directory: Arc<ChainDirectory>,
}

fn deploy(name: &str, selector: u64, own: ChainContracts, remote: u64, remote_ledger: Address) -> Chain {
    let mut chain = Chain::new(
        name,
        selector,
        owner(),
        ChainAddresses {
            ledger: own.ledger,
            receiver: own.receiver,
            router: own.router,
        },
    );
    chain.set_receiver(owner(), own.receiver).unwrap();
    chain.set_forwarder(owner(), forwarder()).unwrap();
    chain.set_target_ledger(owner(), own.ledger).unwrap();
    chain.allowlist_source_chain(owner(), remote, true).unwrap();
    chain.allowlist_sender(owner(), remote_ledger, true).unwrap();
    chain.set_router_fee(remote, U256::from(ROUTER_FEE));

    // fee budget for a handful of sends
    chain
        .mint(own.fee_token, own.ledger, U256::from(ROUTER_FEE * 10))
        .unwrap();
    chain.mint(asset(), user(), e18() * 5).unwrap();
    chain.approve(user(), asset(), own.ledger, U256::MAX).unwrap();
    chain
}

fn side(chain: Chain, entry: ChainEntry) -> Side {
    let chain = shared(chain);
    Side {
        caller: Arc::new(Counting::new(LocalCaller::new(chain.clone()))),
        writer: Arc::new(Counting::new(LocalWriter::new(chain.clone(), forwarder()))),
        chain,
        entry,
    }
}

impl World {
    pub fn new() -> Self {
        let (x_contracts, s_contracts) = (contracts(0x10), contracts(0x20));

        let x_entry = ChainEntry {
            name: "x".into(),
            selector: X_SELECTOR,
            contracts: x_contracts,
        };
        let s_entry = ChainEntry {
            name: "s".into(),
            selector: S_SELECTOR,
            contracts: s_contracts,
        };

        let mut directory = ChainDirectory::new();
        directory.insert(x_entry.clone());
        directory.insert(s_entry.clone());

        Self {
            x: side(
                deploy("x", X_SELECTOR, x_contracts, S_SELECTOR, s_contracts.ledger),
                x_entry,
            ),
            s: side(
                deploy("s", S_SELECTOR, s_contracts, X_SELECTOR, x_contracts.ledger),
                s_entry,
            ),
            directory: Arc::new(directory),
        }
    }
}
