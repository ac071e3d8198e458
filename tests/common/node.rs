use std::{
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use ed25519_dalek::SigningKey;
use rialto::{
    chain::genesis::Genesis,
    config::{BftTimeouts, ChainSpec, Configuration},
    events::{FinalizeBlockEvent, HaltEvent, StartSyncEvent},
    node::{Node, NodeSpec},
    pending::PendingError,
    state::account_state::Account,
    types::{
        amount::{Amount, Unit},
        block::Block,
        crypto_primitives::Keypair,
        data_types::{Address, CryptoHash},
        transaction::Transaction,
    },
};

use super::{mem_db::MemDB, network::NetworkStub, vm::FakeVm};

/// The chain parameters every test node uses.
pub(crate) fn test_chain_spec() -> ChainSpec {
    ChainSpec::devnet()
}

/// A genesis that registers `validators` as the initial delegates (named `validator_0`,
/// `validator_1`, ...), and gives 1000 coins to each of `funded`.
pub(crate) fn test_genesis(validators: &[Address], funded: &[Address]) -> Genesis {
    Genesis {
        timestamp: 0,
        premine: funded
            .iter()
            .map(|address| (*address, Amount::new(1_000 * Unit::Coin.factor())))
            .collect(),
        delegates: validators
            .iter()
            .enumerate()
            .map(|(i, address)| (*address, format!("validator_{}", i)))
            .collect(),
        data: Vec::new(),
    }
}

/// What a node's event handlers recorded.
#[derive(Clone, Default)]
pub(crate) struct Recorded {
    pub(crate) finalized: Arc<Mutex<Vec<u64>>>,
    pub(crate) sync_targets: Arc<Mutex<Vec<u64>>>,
    pub(crate) halts: Arc<Mutex<Vec<String>>>,
}

/// A running node over an in-memory store, a stub network, and a fake VM.
pub(crate) struct TestNode {
    address: Address,
    kv_store: MemDB,
    recorded: Recorded,
    node: Node<MemDB, NetworkStub>,
}

impl TestNode {
    pub(crate) fn new(signing_key: SigningKey, network: NetworkStub, genesis: &Genesis) -> TestNode {
        TestNode::with_timeouts(
            signing_key,
            network,
            genesis,
            BftTimeouts::uniform(Duration::from_millis(300)),
            Duration::from_secs(10),
        )
    }

    pub(crate) fn with_timeouts(
        signing_key: SigningKey,
        network: NetworkStub,
        genesis: &Genesis,
        timeouts: BftTimeouts,
        sync_timeout: Duration,
    ) -> TestNode {
        let kv_store = MemDB::new();
        Node::<MemDB, NetworkStub>::initialize(kv_store.clone(), genesis, test_chain_spec()).unwrap();

        let address = Keypair::new(signing_key.clone()).address();
        let recorded = Recorded::default();

        let configuration = Configuration::builder()
            .me(signing_key)
            .timeouts(timeouts)
            .sync_timeout(sync_timeout)
            .sync_request_timeout(Duration::from_millis(500))
            .log_events(true)
            .build();

        let node = NodeSpec::builder()
            .kv_store(kv_store.clone())
            .network(network)
            .vm(FakeVm::new())
            .chain_spec(test_chain_spec())
            .configuration(configuration)
            .on_finalize_block(finalize_block_handler(recorded.finalized.clone()))
            .on_start_sync(start_sync_handler(recorded.sync_targets.clone()))
            .on_halt(halt_handler(recorded.halts.clone()))
            .build()
            .start();

        TestNode {
            address,
            kv_store,
            recorded,
            node,
        }
    }

    pub(crate) fn address(&self) -> Address {
        self.address
    }

    pub(crate) fn kv_store(&self) -> &MemDB {
        &self.kv_store
    }

    pub(crate) fn recorded(&self) -> &Recorded {
        &self.recorded
    }

    pub(crate) fn submit_transaction(&self, tx: Transaction) -> Result<(), PendingError> {
        self.node.submit_transaction(tx)
    }

    pub(crate) fn latest_block_number(&self) -> u64 {
        self.node
            .camera()
            .snapshot()
            .latest_block_number()
            .unwrap()
            .unwrap()
    }

    pub(crate) fn block(&self, number: u64) -> Option<Block> {
        self.node.camera().snapshot().block(number).unwrap()
    }

    pub(crate) fn account(&self, address: &Address) -> Account {
        self.node.camera().snapshot().account(address).unwrap()
    }

    pub(crate) fn has_transaction(&self, hash: &CryptoHash) -> bool {
        self.node.camera().snapshot().transaction(hash).unwrap().is_some()
    }

    pub(crate) fn state_root(&self, number: u64) -> CryptoHash {
        self.block(number).unwrap().header.state_root
    }
}

/// Poll `condition` every 100 milliseconds until it holds. Panics if it does not hold within
/// `timeout`.
pub(crate) fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + timeout;
    while !condition() {
        if Instant::now() > deadline {
            panic!("Condition did not hold within {:?}", timeout);
        }
        thread::sleep(Duration::from_millis(100));
    }
}

fn finalize_block_handler(
    finalized: Arc<Mutex<Vec<u64>>>,
) -> impl Fn(&FinalizeBlockEvent) + Send + 'static {
    move |finalize_block_event| {
        finalized
            .lock()
            .unwrap()
            .push(finalize_block_event.block.number())
    }
}

fn start_sync_handler(sync_targets: Arc<Mutex<Vec<u64>>>) -> impl Fn(&StartSyncEvent) + Send + 'static {
    move |start_sync_event| sync_targets.lock().unwrap().push(start_sync_event.target)
}

fn halt_handler(halts: Arc<Mutex<Vec<String>>>) -> impl Fn(&HaltEvent) + Send + 'static {
    move |halt_event| halts.lock().unwrap().push(halt_event.reason.clone())
}
