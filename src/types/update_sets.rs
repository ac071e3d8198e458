/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that store updates to the ledger state.

use std::{
    collections::{hash_map, hash_set, HashMap, HashSet},
    hash::Hash,
};

/// Generic set of key-value updates that are written when a particular block is finalized.
///
/// # Uniqueness of Key between `inserts` and `deletes`
///
/// A key is in at most one of `inserts` and `deletes`: scheduling one kind of update for a key
/// cancels any update of the other kind scheduled for it earlier.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateSet<K: Eq + Hash, V: Eq> {
    /// Insertion updates that will be written when a `Block` is finalized.
    inserts: HashMap<K, V>,

    /// Deletion updates that will be written when a `Block` is finalized.
    deletes: HashSet<K>,
}

impl<K: Eq + Hash, V: Eq> UpdateSet<K, V> {
    /// Create a new `UpdateSet` with empty `inserts` and `deletes`.
    pub fn new() -> Self {
        Self {
            inserts: HashMap::new(),
            deletes: HashSet::new(),
        }
    }

    /// Schedule the insertion of a `key`-`value` pair.
    ///
    /// This cancels the deletion of `key`, if it has been scheduled using [`delete`](Self::delete).
    pub fn insert(&mut self, key: K, value: V) {
        self.deletes.remove(&key);
        self.inserts.insert(key, value);
    }

    /// Schedule the deletion of `key`.
    ///
    /// This cancels the insertion of `key`, if it has been scheduled using [`insert`](Self::insert).
    pub fn delete(&mut self, key: K) {
        self.inserts.remove(&key);
        self.deletes.insert(key);
    }

    /// Get whether the `UpdateSet` is scheduled to insert a value to `key`, and if so, returns a
    /// reference to that value.
    pub fn get_insert(&self, key: &K) -> Option<&V> {
        self.inserts.get(key)
    }

    /// Check whether the `UpdateSet` is scheduled to delete `key`.
    pub fn contains_delete(&self, key: &K) -> bool {
        self.deletes.contains(key)
    }

    /// Get an iterator over all of the key-value pairs that this `UpdateSet` will insert.
    pub fn inserts(&self) -> hash_map::Iter<K, V> {
        self.inserts.iter()
    }

    /// Get an iterator over all of the keys that this `UpdateSet` will delete.
    pub fn deletes(&self) -> hash_set::Iter<K> {
        self.deletes.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.deletes.is_empty()
    }

    /// Fold `other` into `self`, with `other`'s updates taking precedence.
    pub fn merge(&mut self, other: UpdateSet<K, V>) {
        for key in other.deletes {
            self.delete(key);
        }
        for (key, value) in other.inserts {
            self.insert(key, value);
        }
    }
}

/// Set of raw key-value updates to the account and delegate state, with keys already prefixed by
/// their [storage location](crate::state::variables).
pub type StateUpdates = UpdateSet<Vec<u8>, Vec<u8>>;
