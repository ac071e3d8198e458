/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The pool of transactions waiting to be included in a block.
//!
//! Transactions enter the pool when they are [submitted](crate::node::Node::submit_transaction) to
//! the node or received from a peer, and leave it when a block that includes them is finalized. The
//! pool checks only what does not depend on the ledger. Whether a transaction can actually be applied
//! is decided when the proposer [builds a block](crate::chain::blockchain::Blockchain::build_block),
//! which skips the candidates that would be rejected.

use std::{
    collections::HashSet,
    fmt::{self, Display, Formatter},
};

use crate::types::{
    block::Block,
    data_types::{CryptoHash, NetworkId},
    transaction::Transaction,
};

pub struct PendingPool {
    network: NetworkId,
    max_time_drift_ms: u64,
    capacity: usize,
    transactions: Vec<Transaction>,
    hashes: HashSet<CryptoHash>,
}

impl PendingPool {
    pub fn new(network: NetworkId, max_time_drift_ms: u64, capacity: usize) -> PendingPool {
        PendingPool {
            network,
            max_time_drift_ms,
            capacity,
            transactions: Vec::new(),
            hashes: HashSet::new(),
        }
    }

    /// Add `tx` to the pool, given the local time `now_ms`.
    ///
    /// The transaction must be valid for the pool's network, not already in the pool, and its
    /// timestamp must be within the maximum time drift of `now_ms`, in either direction. A full pool
    /// first drops its [expired](Self::remove_expired) transactions.
    pub fn add_transaction(&mut self, tx: Transaction, now_ms: u64) -> Result<(), PendingError> {
        if !tx.validate(self.network) {
            return Err(PendingError::Invalid);
        }
        if self.hashes.contains(&tx.hash) {
            return Err(PendingError::Duplicate);
        }
        if tx.timestamp.abs_diff(now_ms) > self.max_time_drift_ms {
            return Err(PendingError::TimeDrift);
        }
        if self.transactions.len() >= self.capacity {
            self.remove_expired(now_ms);
            if self.transactions.len() >= self.capacity {
                return Err(PendingError::Full);
            }
        }

        self.hashes.insert(tx.hash);
        self.transactions.push(tx);
        Ok(())
    }

    /// The transactions in the pool, in the order a proposer should try them: by nonce, and by
    /// arrival among equal nonces, so that each sender's transactions are tried in nonce order.
    pub fn candidates(&self) -> Vec<Transaction> {
        let mut candidates = self.transactions.clone();
        candidates.sort_by_key(|tx| tx.nonce);
        candidates
    }

    /// Remove the transactions included in `block`.
    pub fn remove_included(&mut self, block: &Block) {
        let included: HashSet<CryptoHash> = block.transactions.iter().map(|tx| tx.hash).collect();
        self.retain(|tx| !included.contains(&tx.hash));
    }

    /// Remove the transactions for which `is_stale` returns true, e.g., the ones whose nonce the
    /// sender has already used.
    pub fn remove_stale(&mut self, mut is_stale: impl FnMut(&Transaction) -> bool) {
        self.retain(|tx| !is_stale(tx));
    }

    /// Remove the transactions timestamped more than the maximum time drift before `now_ms`. No
    /// block built from now on could include them.
    pub fn remove_expired(&mut self, now_ms: u64) {
        let max_time_drift_ms = self.max_time_drift_ms;
        self.retain(|tx| now_ms.saturating_sub(tx.timestamp) <= max_time_drift_ms);
    }

    pub fn contains(&self, hash: &CryptoHash) -> bool {
        self.hashes.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    fn retain(&mut self, mut keep: impl FnMut(&Transaction) -> bool) {
        let hashes = &mut self.hashes;
        self.transactions.retain(|tx| {
            let kept = keep(tx);
            if !kept {
                hashes.remove(&tx.hash);
            }
            kept
        });
    }
}

/// Why a transaction was not added to the [`PendingPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingError {
    /// The transaction failed [validation](Transaction::validate).
    Invalid,
    Duplicate,
    /// The transaction's timestamp is too far from the local time.
    TimeDrift,
    Full,
}

impl Display for PendingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PendingError::Invalid => write!(f, "invalid transaction"),
            PendingError::Duplicate => write!(f, "transaction is already pending"),
            PendingError::TimeDrift => write!(f, "transaction timestamp is too far from local time"),
            PendingError::Full => write!(f, "pending pool is full"),
        }
    }
}
