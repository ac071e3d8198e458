/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The library's [`SyncManager`]: downloads finalized blocks one by one from random active peers.
//!
//! For each missing block, the client asks a random active peer for it, waits up to the request
//! timeout, and [imports](Blockchain::import_block) the response. A peer that answers with a block
//! that fails to import is reported to the network provider and not asked again during this sync.
//! The client stops when the chain reaches the target, when the deadline passes, or when no peer is
//! left to ask.

use std::{
    collections::HashSet,
    sync::mpsc::Receiver,
    thread,
    time::{Duration, Instant},
};

use log::{debug, warn};
use rand::seq::SliceRandom;

use crate::{
    chain::{blockchain::Blockchain, ImportError},
    executor::vm::Vm,
    networking::{
        messages::Message,
        network::Network,
        receiving::{BlockSyncClientStub, BlockSyncResponseReceiveError},
        sending::SenderHandle,
    },
    state::pluggables::KVStore,
    types::data_types::Address,
};

use super::{SyncError, SyncManager, SyncOutcome};

/// How long the client waits before looking for peers again when it is connected to none.
const NO_PEERS_BACKOFF: Duration = Duration::from_millis(50);

pub struct BlockSyncClient<N: Network> {
    sender: SenderHandle<N>,
    responses: BlockSyncClientStub,
    request_timeout: Duration,
}

impl<N: Network> BlockSyncClient<N> {
    pub(crate) fn new(
        network: N,
        responses: Receiver<(Address, Message)>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            sender: SenderHandle::new(network),
            responses: BlockSyncClientStub::new(responses),
            request_timeout,
        }
    }
}

impl<K: KVStore, V: Vm, N: Network + 'static> SyncManager<K, V> for BlockSyncClient<N> {
    fn request_sync_to(
        &mut self,
        chain: &mut Blockchain<K>,
        vm: &mut V,
        target: u64,
        deadline: Instant,
    ) -> Result<SyncOutcome, SyncError> {
        let mut blocks_synced = 0;
        let mut excluded = HashSet::new();

        loop {
            let next = chain.latest_block_number()? + 1;
            if next >= target {
                return Ok(SyncOutcome {
                    blocks_synced,
                    reached_target: true,
                });
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }

            let peers: Vec<Address> = self
                .sender
                .active_peers()
                .into_iter()
                .filter(|peer| !excluded.contains(peer))
                .collect();
            let peer = match peers.choose(&mut rand::thread_rng()) {
                Some(peer) => *peer,
                None if excluded.is_empty() => {
                    thread::sleep(NO_PEERS_BACKOFF.min(deadline - now));
                    continue;
                }
                None => break,
            };

            self.sender.send(peer, Message::GetBlock(next));
            let block = match self.responses.recv_block(
                peer,
                next,
                (now + self.request_timeout).min(deadline),
            ) {
                Ok(block) => block,
                Err(BlockSyncResponseReceiveError::Timeout) => {
                    debug!("Peer {} did not send block {} in time", peer, next);
                    continue;
                }
                Err(BlockSyncResponseReceiveError::Disconnected) => break,
            };

            match chain.import_block(&block, vm) {
                Ok(new_validators) => {
                    blocks_synced += 1;
                    if let Some(validators) = new_validators {
                        self.sender.update_validators(&validators);
                    }
                }
                Err(ImportError::Chain(err)) => return Err(SyncError::Chain(err)),
                Err(err) => {
                    warn!("Peer {} sent block {} that failed to import: {}", peer, next, err);
                    self.sender.report_misbehavior(peer);
                    excluded.insert(peer);
                }
            }
        }

        Ok(SyncOutcome {
            blocks_synced,
            reached_target: chain.latest_block_number()? + 1 >= target,
        })
    }
}
