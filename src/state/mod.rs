/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The ledger state: accounts and delegates, persisted in a pluggable key-value store.
//!
//! ## Views and speculative execution
//!
//! Neither [`AccountState`](account_state::AccountState) nor
//! [`DelegateState`](delegate_state::DelegateState) ever writes to the store. Both are journaled views
//! over a read-only base (usually a [snapshot](pluggables::KVStore::snapshot) of the store), and every
//! change made through them is kept in memory until the view is turned into a set of
//! [`StateUpdates`]. The updates of a block are written to the store together with the block itself,
//! in one atomic batch, when the block is finalized. A block that is proposed or validated but never
//! finalized therefore leaves no trace in the store.
//!
//! Within a view, [`track`](journal::Journaled::track) opens a child view that is either committed
//! into, or rolled back from, its parent. The transaction executor runs every transaction body in
//! such a child.
//!
//! ## State root
//!
//! The state root in a block header commits to the block's changes and, through the parent's state
//! root, to the changes of every block before it. See [`state_root`].

use std::fmt::{self, Display, Formatter};

use crate::types::{codec::encode, crypto_primitives::h256, data_types::CryptoHash};

pub mod account_state;

pub mod delegate_state;

pub mod journal;

pub mod pluggables;

pub mod variables;

use pluggables::KVGetError;

/// Compute the state root of a block from the state root of its parent and the block's sorted
/// account and delegate changes (as returned by `changes()` on the respective views).
pub fn state_root(
    parent_root: &CryptoHash,
    account_changes: &[(Vec<u8>, Option<Vec<u8>>)],
    delegate_changes: &[(Vec<u8>, Option<Vec<u8>>)],
) -> CryptoHash {
    let mut bytes = parent_root.bytes().to_vec();
    bytes.extend(encode(account_changes));
    bytes.extend(encode(delegate_changes));
    h256(&bytes)
}

#[derive(Debug)]
pub enum StateError {
    /// A balance would become negative.
    InsufficientBalance,
    /// An amount or nonce would overflow.
    Overflow,
    /// The underlying store returned a value that could not be read.
    KVGetError(KVGetError),
}

impl From<KVGetError> for StateError {
    fn from(err: KVGetError) -> Self {
        StateError::KVGetError(err)
    }
}

impl Display for StateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StateError::InsufficientBalance => write!(f, "insufficient balance"),
            StateError::Overflow => write!(f, "overflow"),
            StateError::KVGetError(err) => write!(f, "storage error: {}", err),
        }
    }
}
