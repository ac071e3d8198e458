/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Subprotocol that catches the local chain up with its peers when the node falls behind.
//!
//! The consensus engine decides *when* to sync: when a quorum of the active validators announce a
//! height above the local one (see [`sync_target`](crate::bft::implementation::sync_target)). It
//! then hands the chain to a [`SyncManager`] until the target height or a deadline is reached.
//!
//! The library's own sync manager is the [`BlockSyncClient`](client::BlockSyncClient), which
//! downloads finalized blocks one by one from the [`BlockServer`](server::BlockServer)s of its peers.
//! Downloaded blocks are only put after their votes and execution are checked (see
//! [`import_block`](crate::chain::blockchain::Blockchain::import_block)).

use std::{
    fmt::{self, Display, Formatter},
    time::Instant,
};

use crate::{
    chain::{blockchain::Blockchain, ChainError},
    executor::vm::Vm,
    state::pluggables::KVStore,
};

pub mod client;

pub(crate) mod server;

/// Catch-up driver that the consensus engine hands the chain to while it is behind its peers.
pub trait SyncManager<K: KVStore, V: Vm>: Send + 'static {
    /// Import finalized blocks into `chain` until it holds the block before `target`, or until
    /// `deadline` passes.
    ///
    /// Only storage failures are errors. Running out of time, or out of peers that send valid blocks,
    /// is a normal outcome.
    fn request_sync_to(
        &mut self,
        chain: &mut Blockchain<K>,
        vm: &mut V,
        target: u64,
        deadline: Instant,
    ) -> Result<SyncOutcome, SyncError>;
}

/// What a call to [`SyncManager::request_sync_to`] achieved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncOutcome {
    pub blocks_synced: u64,
    /// Whether the chain reached the target.
    pub reached_target: bool,
}

#[derive(Debug)]
pub enum SyncError {
    /// The chain could not be read or written. The node cannot safely continue.
    Chain(ChainError),
}

impl From<ChainError> for SyncError {
    fn from(err: ChainError) -> Self {
        SyncError::Chain(err)
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Chain(err) => write!(f, "sync failed: {}", err),
        }
    }
}
