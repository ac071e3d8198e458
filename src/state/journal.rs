/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Layered write sets over a read-only base, and the scoped [`Tracked`] guard.
//!
//! A [`Journal`] never writes to its base. Writes land in the topmost of a stack of layers, and reads
//! consult the layers from the top down before falling through to the base. Pushing a layer starts a
//! child view; the child is later either merged into the layer below it (commit) or popped and
//! thrown away (rollback). The bottom layer is never popped: it holds everything the owner of the
//! journal has written, and becomes the journal's [`StateUpdates`] when execution is done.

use std::{
    collections::{BTreeMap, HashMap},
    ops::{Deref, DerefMut},
};

use crate::types::update_sets::StateUpdates;

use super::pluggables::KVGet;

/// A pending change to one key: `Some` sets the key, `None` deletes it.
type Layer = HashMap<Vec<u8>, Option<Vec<u8>>>;

pub struct Journal<R: KVGet> {
    base: R,
    layers: Vec<Layer>,
}

impl<R: KVGet> Journal<R> {
    pub fn new(base: R) -> Self {
        Self {
            base,
            layers: vec![Layer::new()],
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        for layer in self.layers.iter().rev() {
            if let Some(change) = layer.get(key) {
                return change.clone();
            }
        }
        self.base.get(key)
    }

    pub fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.top().insert(key, Some(value));
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.top().insert(key, None);
    }

    pub(crate) fn push_layer(&mut self) {
        self.layers.push(Layer::new());
    }

    /// Merge the topmost child layer into the layer below it.
    pub(crate) fn commit_layer(&mut self) {
        if self.layers.len() > 1 {
            if let Some(child) = self.layers.pop() {
                self.top().extend(child);
            }
        }
    }

    /// Discard the topmost child layer.
    pub(crate) fn rollback_layer(&mut self) {
        if self.layers.len() > 1 {
            self.layers.pop();
        }
    }

    /// All changes in the journal, with later layers taking precedence, sorted by key.
    pub fn changes(&self) -> Vec<(Vec<u8>, Option<Vec<u8>>)> {
        let mut merged = BTreeMap::new();
        for layer in &self.layers {
            for (key, change) in layer {
                merged.insert(key.clone(), change.clone());
            }
        }
        merged.into_iter().collect()
    }

    /// Consume the journal, returning all of its changes as a set of updates to the base.
    pub fn into_updates(self) -> StateUpdates {
        let mut updates = StateUpdates::new();
        for layer in self.layers {
            for (key, change) in layer {
                match change {
                    Some(value) => updates.insert(key, value),
                    None => updates.delete(key),
                }
            }
        }
        updates
    }

    fn top(&mut self) -> &mut Layer {
        if self.layers.is_empty() {
            self.layers.push(Layer::new());
        }
        let last = self.layers.len() - 1;
        &mut self.layers[last]
    }
}

/// State that keeps its writes in a [`Journal`] and can therefore be [tracked](Journaled::track).
pub trait Journaled {
    fn begin_layer(&mut self);
    fn commit_layer(&mut self);
    fn rollback_layer(&mut self);

    /// Start a child view of this state. Writes made through the returned guard are kept only if the
    /// guard is [committed](Tracked::commit).
    fn track(&mut self) -> Tracked<'_, Self>
    where
        Self: Sized,
    {
        self.begin_layer();
        Tracked {
            state: self,
            finished: false,
        }
    }
}

impl<S: Journaled> Journaled for &mut S {
    fn begin_layer(&mut self) {
        (**self).begin_layer()
    }

    fn commit_layer(&mut self) {
        (**self).commit_layer()
    }

    fn rollback_layer(&mut self) {
        (**self).rollback_layer()
    }
}

/// Tracks both members together, so that a change spanning them is kept or discarded as one.
impl<A: Journaled, B: Journaled> Journaled for (A, B) {
    fn begin_layer(&mut self) {
        self.0.begin_layer();
        self.1.begin_layer();
    }

    fn commit_layer(&mut self) {
        self.0.commit_layer();
        self.1.commit_layer();
    }

    fn rollback_layer(&mut self) {
        self.0.rollback_layer();
        self.1.rollback_layer();
    }
}

/// A scoped child view of a [`Journaled`] state.
///
/// Exactly one of commit or rollback happens to every `Tracked`: explicitly, through
/// [`commit`](Self::commit) or [`rollback`](Self::rollback), or, if the guard is dropped unfinished
/// (e.g., because of an early return or a panic), a rollback on drop.
pub struct Tracked<'a, S: Journaled> {
    state: &'a mut S,
    finished: bool,
}

impl<'a, S: Journaled> Tracked<'a, S> {
    pub fn commit(mut self) {
        self.state.commit_layer();
        self.finished = true;
    }

    pub fn rollback(mut self) {
        self.state.rollback_layer();
        self.finished = true;
    }
}

impl<'a, S: Journaled> Deref for Tracked<'a, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &*self.state
    }
}

impl<'a, S: Journaled> DerefMut for Tracked<'a, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut *self.state
    }
}

impl<'a, S: Journaled> Drop for Tracked<'a, S> {
    fn drop(&mut self) {
        if !self.finished {
            self.state.rollback_layer();
        }
    }
}
