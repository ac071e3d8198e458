/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions and types for receiving messages from the P2P network.

use std::{
    sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError},
    thread::{self, JoinHandle},
    time::Instant,
};

use crate::types::{
    block::Block,
    data_types::Address,
    transaction::Transaction,
};

use super::{messages::Message, network::Network};

/// The receiving ends of the channels that the poller thread distributes messages into.
pub(crate) struct Inboxes {
    /// `NewHeight`, `NewView`, `Proposal`, and `Vote` messages.
    pub(crate) bft: Receiver<(Address, Message)>,
    /// `GetBlock` and `GetBlockHeader` requests.
    pub(crate) block_requests: Receiver<(Address, Message)>,
    /// `Block` and `BlockHeader` responses.
    pub(crate) block_responses: Receiver<(Address, Message)>,
    pub(crate) transactions: Receiver<(Address, Transaction)>,
}

/// Spawn the poller thread, which polls the [`Network`] for messages and distributes them into the
/// [`Inboxes`].
pub(crate) fn start_polling<N: Network + 'static>(
    mut network: N,
    shutdown_signal: Receiver<()>,
) -> (JoinHandle<()>, Inboxes) {
    let (to_bft, bft) = mpsc::channel();
    let (to_block_requests, block_requests) = mpsc::channel();
    let (to_block_responses, block_responses) = mpsc::channel();
    let (to_transactions, transactions) = mpsc::channel();

    let poller_thread = thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => return,
            Err(TryRecvError::Empty) => (),
        }

        if let Some((origin, msg)) = network.recv() {
            // A receiver is only dropped when its thread has shut down, so send errors are ignored.
            match msg {
                Message::NewHeight(_)
                | Message::NewView(_)
                | Message::Proposal(_)
                | Message::Vote(_) => {
                    let _ = to_bft.send((origin, msg));
                }
                Message::GetBlock(_) | Message::GetBlockHeader(_) => {
                    let _ = to_block_requests.send((origin, msg));
                }
                Message::Block(_) | Message::BlockHeader(_) => {
                    let _ = to_block_responses.send((origin, msg));
                }
                Message::Transaction(tx) => {
                    let _ = to_transactions.send((origin, tx));
                }
            }
        } else {
            thread::yield_now()
        }
    });

    (
        poller_thread,
        Inboxes {
            bft,
            block_requests,
            block_responses,
            transactions,
        },
    )
}

/// A receiving end for responses to block requests. [`BlockSyncClientStub::recv_block`] returns the
/// response of a given peer.
pub(crate) struct BlockSyncClientStub {
    responses: Receiver<(Address, Message)>,
}

impl BlockSyncClientStub {
    pub(crate) fn new(responses: Receiver<(Address, Message)>) -> BlockSyncClientStub {
        BlockSyncClientStub { responses }
    }

    /// Receive the block numbered `number` from `peer`. Waits for the response until the deadline is
    /// reached, and if no response is received it returns [BlockSyncResponseReceiveError::Timeout].
    pub(crate) fn recv_block(
        &self,
        peer: Address,
        number: u64,
        deadline: Instant,
    ) -> Result<Block, BlockSyncResponseReceiveError> {
        self.recv_response(peer, deadline, |msg| match msg {
            Message::Block(block) if block.number() == number => Some(block),
            _ => None,
        })
    }

    fn recv_response<T>(
        &self,
        peer: Address,
        deadline: Instant,
        matches: impl Fn(Message) -> Option<T>,
    ) -> Result<T, BlockSyncResponseReceiveError> {
        while Instant::now() < deadline {
            match self.responses.recv_timeout(deadline - Instant::now()) {
                Ok((sender, msg)) => {
                    if sender == peer {
                        if let Some(response) = matches(msg) {
                            return Ok(response);
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => thread::yield_now(),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(BlockSyncResponseReceiveError::Disconnected)
                }
            }
        }

        Err(BlockSyncResponseReceiveError::Timeout)
    }
}

#[derive(Debug)]
pub enum BlockSyncResponseReceiveError {
    Disconnected,
    Timeout,
}

/// A receiving end for block requests. The [`BlockSyncServerStub::recv_request`] method returns the
/// received request.
pub(crate) struct BlockSyncServerStub {
    requests: Receiver<(Address, Message)>,
}

impl BlockSyncServerStub {
    pub(crate) fn new(requests: Receiver<(Address, Message)>) -> BlockSyncServerStub {
        BlockSyncServerStub { requests }
    }

    /// Receive a request if one arrives before `deadline`.
    pub(crate) fn recv_request(
        &self,
        deadline: Instant,
    ) -> Result<(Address, Message), BlockSyncRequestReceiveError> {
        match self
            .requests
            .recv_timeout(deadline.saturating_duration_since(Instant::now()))
        {
            Ok((origin, request)) => Ok((origin, request)),
            Err(RecvTimeoutError::Disconnected) => Err(BlockSyncRequestReceiveError::Disconnected),
            Err(RecvTimeoutError::Timeout) => Err(BlockSyncRequestReceiveError::NotAvailable),
        }
    }
}

#[derive(Debug)]
pub enum BlockSyncRequestReceiveError {
    Disconnected,
    NotAvailable,
}
