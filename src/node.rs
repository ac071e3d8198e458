/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Methods to build, run, and initialize the storage of a node.
//!
//! The key components of this module are:
//! - The builder-pattern interface to construct a [specification of the node](NodeSpec) with:
//!   1. `NodeSpec::builder` to construct a `NodeSpecBuilder`,
//!   2. The setters of the `NodeSpecBuilder`, and
//!   3. The `NodeSpecBuilder::build` method to construct a [NodeSpec],
//! - The function to [start](NodeSpec::start) a [Node] given its specification,
//! - The function to [initialize](Node::initialize) the node's chain with a [Genesis],
//! - [The type](Node) which keeps the node alive.
//!
//! ## Starting a node
//!
//! Here is an example that demonstrates how to build and start running a node using the builder
//! pattern:
//!
//! ```ignore
//! Node::initialize(kv_store.clone(), &genesis, chain_spec.clone())?;
//!
//! let node =
//!     NodeSpec::builder()
//!     .kv_store(kv_store)
//!     .network(network)
//!     .vm(vm)
//!     .chain_spec(chain_spec)
//!     .configuration(configuration)
//!     .on_finalize_block(finalize_block_handler)
//!     .build()
//!     .start();
//! ```
//!
//! ### Required setters
//!
//! The required setters are for providing the trait implementations and parameters required to run a
//! node:
//! - `.kv_store(...)`
//! - `.network(...)`
//! - `.vm(...)`
//! - `.chain_spec(...)`
//! - `.configuration(...)`
//!
//! ### Optional setters
//!
//! The optional setters are for registering user-defined event handlers for events from
//! [crate::events]:
//! - `.on_finalize_block(...)`
//! - `.on_update_validators(...)`
//! - `.on_propose(...)`
//! - `.on_vote(...)`
//! - `.on_receive_proposal(...)`
//! - `.on_receive_vote(...)`
//! - `.on_new_height(...)`
//! - `.on_new_view(...)`
//! - `.on_view_timeout(...)`
//! - `.on_equivocation(...)`
//! - `.on_start_sync(...)`
//! - `.on_end_sync(...)`
//! - `.on_receive_block_request(...)`
//! - `.on_halt(...)`
//!
//! ## Validators and full nodes
//!
//! Every node runs the same threads. A node whose address is not in the validator list still follows
//! the protocol and finalizes blocks, but its votes are not counted and it is never the primary.

use std::{
    sync::{
        mpsc::{self, Sender},
        Arc, Mutex, PoisonError,
    },
    thread::JoinHandle,
};

use typed_builder::TypedBuilder;

use crate::{
    bft::implementation::{start_bft, BftEngine},
    block_sync::{client::BlockSyncClient, server::BlockServer},
    chain::{
        blockchain::{now_ms, Blockchain},
        camera::BlockchainCamera,
        genesis::Genesis,
        ChainError,
    },
    config::{ChainSpec, Configuration},
    event_bus::*,
    events::*,
    executor::vm::Vm,
    networking::{messages::Message, network::Network, receiving::start_polling},
    pending::{PendingError, PendingPool},
    state::pluggables::KVStore,
    types::transaction::Transaction,
};

/// Stores all necessary parameters and trait implementations required to run a [Node].
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [NodeSpec]. On the builder call the following methods to construct
    a valid [NodeSpec].

    Required:
    - `.kv_store(...)`
    - `.network(...)`
    - `.vm(...)`
    - `.chain_spec(...)`
    - `.configuration(...)`

    Optional:
    - `.on_finalize_block(...)`
    - `.on_update_validators(...)`
    - `.on_propose(...)`
    - `.on_vote(...)`
    - `.on_receive_proposal(...)`
    - `.on_receive_vote(...)`
    - `.on_new_height(...)`
    - `.on_new_view(...)`
    - `.on_view_timeout(...)`
    - `.on_equivocation(...)`
    - `.on_start_sync(...)`
    - `.on_end_sync(...)`
    - `.on_receive_block_request(...)`
    - `.on_halt(...)`
    "
))]
pub struct NodeSpec<K: KVStore, N: Network + 'static, V: Vm> {
    // Required parameters
    #[builder(setter(doc = "Set the implementation of the node's Key-Value store. The argument must implement the [KVStore](crate::state::pluggables::KVStore) trait, and must already be [initialized](Node::initialize). Required."))]
    kv_store: K,
    #[builder(setter(doc = "Set the implementation of peer-to-peer networking. The argument must implement the [Network](crate::networking::network::Network) trait. Required."))]
    network: N,
    #[builder(setter(doc = "Set the virtual machine that executes contract calls. The argument must implement the [Vm](crate::executor::vm::Vm) trait. Required."))]
    vm: V,
    #[builder(setter(doc = "Set the [parameters of the chain](ChainSpec). Must be the same on every node of the network. Required."))]
    chain_spec: ChainSpec,
    #[builder(setter(doc = "Set the [configuration](Configuration), which contains the node-local parameters. Required."))]
    configuration: Configuration,

    // Optional parameters
    #[builder(default, setter(transform = |handler: impl Fn(&FinalizeBlockEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<FinalizeBlockEvent>),
    doc = "Register a handler closure to be invoked after the node finalizes a block. Optional."))]
    on_finalize_block: Option<HandlerPtr<FinalizeBlockEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&UpdateValidatorsEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<UpdateValidatorsEvent>),
    doc = "Register a handler closure to be invoked after a finalized block re-computes the validator list. Optional."))]
    on_update_validators: Option<HandlerPtr<UpdateValidatorsEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ProposeEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ProposeEvent>),
    doc = "Register a handler closure to be invoked after the node broadcasts a proposal. Optional."))]
    on_propose: Option<HandlerPtr<ProposeEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&VoteEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<VoteEvent>),
    doc = "Register a handler closure to be invoked after the node casts a vote. Optional."))]
    on_vote: Option<HandlerPtr<VoteEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceiveProposalEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceiveProposalEvent>),
    doc = "Register a handler closure to be invoked after the node accepts a proposal from a peer. Optional."))]
    on_receive_proposal: Option<HandlerPtr<ReceiveProposalEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceiveVoteEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceiveVoteEvent>),
    doc = "Register a handler closure to be invoked after the node receives a vote for its current height and view. Optional."))]
    on_receive_vote: Option<HandlerPtr<ReceiveVoteEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&NewHeightEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<NewHeightEvent>),
    doc = "Register a handler closure to be invoked after the node starts a new height. Optional."))]
    on_new_height: Option<HandlerPtr<NewHeightEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&NewViewEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<NewViewEvent>),
    doc = "Register a handler closure to be invoked after the node enters the propose state of a view. Optional."))]
    on_new_view: Option<HandlerPtr<NewViewEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ViewTimeoutEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ViewTimeoutEvent>),
    doc = "Register a handler closure to be invoked after a consensus state times out. Optional."))]
    on_view_timeout: Option<HandlerPtr<ViewTimeoutEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&EquivocationEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<EquivocationEvent>),
    doc = "Register a handler closure to be invoked after the node catches a validator casting conflicting votes. Optional."))]
    on_equivocation: Option<HandlerPtr<EquivocationEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&StartSyncEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<StartSyncEvent>),
    doc = "Register a handler closure to be invoked after the node starts syncing. Optional."))]
    on_start_sync: Option<HandlerPtr<StartSyncEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&EndSyncEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<EndSyncEvent>),
    doc = "Register a handler closure to be invoked after the node finishes syncing. Optional."))]
    on_end_sync: Option<HandlerPtr<EndSyncEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceiveBlockRequestEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceiveBlockRequestEvent>),
    doc = "Register a handler closure to be invoked after the node receives a request for a block from a peer. Optional."))]
    on_receive_block_request: Option<HandlerPtr<ReceiveBlockRequestEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&HaltEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<HaltEvent>),
    doc = "Register a handler closure to be invoked after the consensus engine halts on a fatal error. Optional."))]
    on_halt: Option<HandlerPtr<HaltEvent>>,
}

impl<K: KVStore, N: Network + 'static, V: Vm> NodeSpec<K, N, V> {
    /// Start the node's threads: the poller, the block server, the consensus engine, and (if any
    /// handler is registered, or events are logged) the event bus.
    pub fn start(self) -> Node<K, N> {
        let event_handlers = EventHandlers::new(
            self.configuration.log_events,
            self.on_finalize_block,
            self.on_update_validators,
            self.on_propose,
            self.on_vote,
            self.on_receive_proposal,
            self.on_receive_vote,
            self.on_new_height,
            self.on_new_view,
            self.on_view_timeout,
            self.on_equivocation,
            self.on_start_sync,
            self.on_end_sync,
            self.on_receive_block_request,
            self.on_halt,
        );
        let (event_publisher, event_subscriber) = if !event_handlers.is_empty() {
            Some(mpsc::channel()).unzip()
        } else {
            (None, None)
        };

        let chain = Blockchain::new(self.kv_store.clone(), self.chain_spec.clone());
        let mut network = self.network;
        // If the validators cannot be read, the engine halts as soon as it starts.
        if let Ok(validators) = chain.validators() {
            network.update_validators(&validators);
        }

        let (poller_shutdown, poller_shutdown_receiver) = mpsc::channel();
        let (poller, inboxes) = start_polling(network.clone(), poller_shutdown_receiver);

        let (block_server_shutdown, block_server_shutdown_receiver) = mpsc::channel();
        let block_server = BlockServer::new(
            BlockchainCamera::new(self.kv_store.clone()),
            inboxes.block_requests,
            network.clone(),
            block_server_shutdown_receiver,
            event_publisher.clone(),
        )
        .start();

        let pending = Arc::new(Mutex::new(PendingPool::new(
            self.chain_spec.network,
            self.chain_spec.max_transaction_time_drift_ms,
            self.configuration.max_pending_transactions,
        )));
        let sync_client = BlockSyncClient::new(
            network.clone(),
            inboxes.block_responses,
            self.configuration.sync_request_timeout,
        );

        let (engine_shutdown, engine_shutdown_receiver) = mpsc::channel();
        let engine = BftEngine::new(
            chain,
            self.vm,
            pending.clone(),
            sync_client,
            network.clone(),
            inboxes.bft,
            inboxes.transactions,
            &self.configuration,
            event_publisher,
        );
        let engine = start_bft(engine, engine_shutdown_receiver);

        let (event_bus, event_bus_shutdown) = match event_subscriber {
            Some(event_subscriber) => {
                let (event_bus_shutdown, event_bus_shutdown_receiver) = mpsc::channel();
                let event_bus =
                    start_event_bus(event_handlers, event_subscriber, event_bus_shutdown_receiver);
                (Some(event_bus), Some(event_bus_shutdown))
            }
            None => (None, None),
        };

        Node {
            camera: BlockchainCamera::new(self.kv_store),
            network,
            pending,
            poller: Some(poller),
            poller_shutdown,
            engine: Some(engine),
            engine_shutdown,
            block_server: Some(block_server),
            block_server_shutdown,
            event_bus,
            event_bus_shutdown,
        }
    }
}

/// A handle to the background threads of a node. When this value is dropped, all background threads
/// are gracefully shut down.
pub struct Node<K: KVStore, N: Network> {
    camera: BlockchainCamera<K>,
    network: N,
    pending: Arc<Mutex<PendingPool>>,
    poller: Option<JoinHandle<()>>,
    poller_shutdown: Sender<()>,
    engine: Option<JoinHandle<()>>,
    engine_shutdown: Sender<()>,
    block_server: Option<JoinHandle<()>>,
    block_server_shutdown: Sender<()>,
    event_bus: Option<JoinHandle<()>>,
    event_bus_shutdown: Option<Sender<()>>,
}

impl<K: KVStore, N: Network> Node<K, N> {
    /// Initialize the chain in `kv_store` with the genesis block and initial state described by
    /// `genesis`. Does nothing if the store already holds a chain.
    pub fn initialize(kv_store: K, genesis: &Genesis, chain_spec: ChainSpec) -> Result<(), ChainError> {
        Blockchain::new(kv_store, chain_spec).initialize(genesis)
    }

    /// Returns a [camera](BlockchainCamera) which can be used to read the chain while the node runs.
    pub fn camera(&self) -> &BlockchainCamera<K> {
        &self.camera
    }

    /// Add `tx` to the pending pool and broadcast it to peers.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<(), PendingError> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add_transaction(tx.clone(), now_ms())?;

        let mut network = self.network.clone();
        network.broadcast(Message::Transaction(tx));
        Ok(())
    }

    /// The number of transactions waiting to be included in a block.
    pub fn pending_transactions(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl<K: KVStore, N: Network> Drop for Node<K, N> {
    fn drop(&mut self) {
        // The engine and the block server receive from the poller, and publish to the event bus, so
        // they are shut down first. A thread that has already exited (e.g., a halted engine) has
        // dropped its receiver, so send errors are ignored.
        let _ = self.engine_shutdown.send(());
        if let Some(engine) = self.engine.take() {
            let _ = engine.join();
        }

        let _ = self.block_server_shutdown.send(());
        if let Some(block_server) = self.block_server.take() {
            let _ = block_server.join();
        }

        let _ = self.poller_shutdown.send(());
        if let Some(poller) = self.poller.take() {
            let _ = poller.join();
        }

        if let Some(event_bus_shutdown) = &self.event_bus_shutdown {
            let _ = event_bus_shutdown.send(());
        }
        if let Some(event_bus) = self.event_bus.take() {
            let _ = event_bus.join();
        }
    }
}
