/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Implements the [BlockServer], which answers peers' requests for finalized blocks and headers so
//! that peers lagging behind can catch up.
//!
//! The server reads through a [camera](crate::chain::camera::BlockchainCamera), so it runs on its own
//! thread and never blocks the consensus engine. Requests for blocks the server does not have are
//! left unanswered; the requester times out and asks another peer.

use std::{
    sync::mpsc::{Receiver, Sender, TryRecvError},
    thread::{self, JoinHandle},
    time::{Duration, Instant, SystemTime},
};

use log::{debug, error};

use crate::{
    chain::camera::BlockchainCamera,
    events::{Event, ReceiveBlockRequestEvent},
    networking::{
        messages::Message,
        network::Network,
        receiving::{BlockSyncRequestReceiveError, BlockSyncServerStub},
        sending::SenderHandle,
    },
    state::pluggables::KVStore,
    types::data_types::Address,
};

/// How long the server waits for a request before checking for the shutdown signal again.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub(crate) struct BlockServer<N: Network + 'static, K: KVStore> {
    camera: BlockchainCamera<K>,
    receiver: BlockSyncServerStub,
    sender: SenderHandle<N>,
    shutdown_signal: Receiver<()>,
    event_publisher: Option<Sender<Event>>,
}

impl<N: Network + 'static, K: KVStore> BlockServer<N, K> {
    pub(crate) fn new(
        camera: BlockchainCamera<K>,
        requests: Receiver<(Address, Message)>,
        network: N,
        shutdown_signal: Receiver<()>,
        event_publisher: Option<Sender<Event>>,
    ) -> Self {
        Self {
            camera,
            receiver: BlockSyncServerStub::new(requests),
            sender: SenderHandle::new(network),
            shutdown_signal,
            event_publisher,
        }
    }

    pub(crate) fn start(mut self) -> JoinHandle<()> {
        thread::spawn(move || loop {
            match self.shutdown_signal.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => return,
                Err(TryRecvError::Empty) => (),
            }

            match self.receiver.recv_request(Instant::now() + POLL_INTERVAL) {
                Ok((origin, request)) => self.on_request(origin, request),
                Err(BlockSyncRequestReceiveError::NotAvailable) => (),
                // The poller only hangs up after the server has been told to shut down.
                Err(BlockSyncRequestReceiveError::Disconnected) => thread::sleep(POLL_INTERVAL),
            }
        })
    }

    fn on_request(&mut self, origin: Address, request: Message) {
        let (number, header_only) = match request {
            Message::GetBlock(number) => (number, false),
            Message::GetBlockHeader(number) => (number, true),
            _ => return,
        };

        Event::ReceiveBlockRequest(ReceiveBlockRequestEvent {
            timestamp: SystemTime::now(),
            peer: origin,
            number,
            header_only,
        })
        .publish(&self.event_publisher);

        let snapshot = self.camera.snapshot();
        let response = if header_only {
            snapshot
                .block_header(number)
                .map(|header| header.map(Message::BlockHeader))
        } else {
            snapshot.block(number).map(|block| block.map(Message::Block))
        };
        drop(snapshot);

        match response {
            Ok(Some(response)) => self.sender.send(origin, response),
            Ok(None) => debug!("Peer {} requested block {}, which is not finalized here", origin, number),
            Err(err) => error!("Failed to read block {} for peer {}: {}", number, origin, err),
        }
    }
}
