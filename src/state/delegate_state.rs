/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Registered delegates, their vote tallies, and the votes of each voter.
//!
//! For every delegate `d`, the sum over voters `v` of `vote(v, d)` equals `d.votes`: both sides are
//! only ever changed together, by [`vote`](DelegateState::vote) and
//! [`unvote`](DelegateState::unvote).

use std::fmt::{self, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::{
    amount::Amount, codec::encode, data_types::Address, update_sets::StateUpdates,
};

use super::{
    journal::{Journal, Journaled},
    pluggables::{KVGet, KVGetError, Key},
    variables::{self, concat},
    StateError,
};

/// Shortest allowed delegate name.
pub const MIN_NAME_LENGTH: usize = 3;

/// Longest allowed delegate name.
pub const MAX_NAME_LENGTH: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Delegate {
    pub address: Address,
    pub name: Vec<u8>,
    /// Number of the block that included the registration.
    pub registered_at: u64,
    /// Sum of all votes cast for this delegate.
    pub votes: Amount,
}

impl Delegate {
    pub fn name_str(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

/// Check that `name` is 3 to 16 characters drawn from lowercase letters, digits, and `_`.
pub fn is_valid_name(name: &[u8]) -> bool {
    (MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&name.len())
        && name
            .iter()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == b'_')
}

/// Journaled view of the delegates in the ledger, over a read-only base.
pub struct DelegateState<R: KVGet> {
    journal: Journal<R>,
}

impl<R: KVGet> DelegateState<R> {
    pub fn new(base: R) -> Self {
        Self {
            journal: Journal::new(base),
        }
    }

    /// Create a view in which `updates` have already been applied on top of `base`.
    pub fn with_updates(base: R, updates: &StateUpdates) -> Self {
        let mut journal = Journal::new(base);
        for (key, value) in updates.inserts() {
            journal.set(key.clone(), value.clone());
        }
        for key in updates.deletes() {
            journal.delete(key.clone());
        }
        Self { journal }
    }

    pub fn get_delegate(&self, address: &Address) -> Result<Option<Delegate>, StateError> {
        self.decode(
            &concat(&variables::DELEGATE, &address.bytes()),
            || Key::Delegate { address: *address },
        )
    }

    pub fn get_delegate_by_name(&self, name: &[u8]) -> Result<Option<Delegate>, StateError> {
        let address: Option<Address> = self.decode(
            &concat(&variables::DELEGATE_NAME, name),
            || Key::DelegateName {
                name: name.to_vec(),
            },
        )?;
        match address {
            Some(address) => self.get_delegate(&address),
            None => Ok(None),
        }
    }

    /// Get how much `voter` has voted for `delegate`.
    pub fn get_vote(&self, voter: &Address, delegate: &Address) -> Result<Amount, StateError> {
        Ok(self
            .decode(&variables::vote_key(voter, delegate), || Key::Vote {
                voter: *voter,
                delegate: *delegate,
            })?
            .unwrap_or(Amount::ZERO))
    }

    /// Register `address` as a delegate called `name`, as of block `registered_at`.
    pub fn register(
        &mut self,
        address: &Address,
        name: &[u8],
        registered_at: u64,
    ) -> Result<(), DelegateError> {
        if self.get_delegate(address)?.is_some() {
            return Err(DelegateError::AlreadyDelegate);
        }
        if self.get_delegate_by_name(name)?.is_some() {
            return Err(DelegateError::NameTaken);
        }

        let delegate = Delegate {
            address: *address,
            name: name.to_vec(),
            registered_at,
            votes: Amount::ZERO,
        };
        self.put_delegate(&delegate);
        self.journal
            .set(concat(&variables::DELEGATE_NAME, name), encode(address));

        let mut list = self.delegate_list()?;
        list.push(*address);
        self.journal
            .set(variables::DELEGATE_LIST.to_vec(), encode(&list));
        Ok(())
    }

    /// Record `amount` more votes from `voter` for `delegate`.
    pub fn vote(
        &mut self,
        voter: &Address,
        delegate: &Address,
        amount: Amount,
    ) -> Result<(), DelegateError> {
        let mut record = self
            .get_delegate(delegate)?
            .ok_or(DelegateError::UnknownDelegate)?;
        let vote = self.get_vote(voter, delegate)?;

        record.votes = record
            .votes
            .checked_add(amount)
            .map_err(|_| DelegateError::State(StateError::Overflow))?;
        let vote = vote
            .checked_add(amount)
            .map_err(|_| DelegateError::State(StateError::Overflow))?;

        self.put_delegate(&record);
        self.journal
            .set(variables::vote_key(voter, delegate), encode(&vote));
        Ok(())
    }

    /// Withdraw `amount` of `voter`'s votes for `delegate`. Fails if `voter` has voted less than
    /// `amount` for `delegate`.
    pub fn unvote(
        &mut self,
        voter: &Address,
        delegate: &Address,
        amount: Amount,
    ) -> Result<(), DelegateError> {
        let mut record = self
            .get_delegate(delegate)?
            .ok_or(DelegateError::UnknownDelegate)?;
        let vote = self.get_vote(voter, delegate)?;
        if amount > vote {
            return Err(DelegateError::InsufficientVotes);
        }

        record.votes = record
            .votes
            .checked_sub(amount)
            .map_err(|_| DelegateError::State(StateError::Overflow))?;
        let vote = vote
            .checked_sub(amount)
            .map_err(|_| DelegateError::State(StateError::Overflow))?;

        self.put_delegate(&record);
        let key = variables::vote_key(voter, delegate);
        if vote.is_zero() {
            self.journal.delete(key);
        } else {
            self.journal.set(key, encode(&vote));
        }
        Ok(())
    }

    /// Get all delegates, ordered by vote tally (highest first), with ties broken by name.
    pub fn get_delegates(&self) -> Result<Vec<Delegate>, StateError> {
        let mut delegates = Vec::new();
        for address in self.delegate_list()? {
            let delegate = self
                .get_delegate(&address)?
                .ok_or(StateError::KVGetError(KVGetError::ValueExpectedButNotFound {
                    key: Key::Delegate { address },
                }))?;
            delegates.push(delegate);
        }
        delegates.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.name.cmp(&b.name)));
        Ok(delegates)
    }

    /// Get the addresses of the top `n` delegates by [`get_delegates`](Self::get_delegates) order.
    pub fn validators(&self, n: usize) -> Result<Vec<Address>, StateError> {
        Ok(self
            .get_delegates()?
            .into_iter()
            .take(n)
            .map(|delegate| delegate.address)
            .collect())
    }

    /// All changes made through this view so far, sorted by key.
    pub fn changes(&self) -> Vec<(Vec<u8>, Option<Vec<u8>>)> {
        self.journal.changes()
    }

    pub fn into_updates(self) -> StateUpdates {
        self.journal.into_updates()
    }

    fn delegate_list(&self) -> Result<Vec<Address>, StateError> {
        Ok(self
            .decode(&variables::DELEGATE_LIST, || Key::DelegateList)?
            .unwrap_or_default())
    }

    fn put_delegate(&mut self, delegate: &Delegate) {
        self.journal.set(
            concat(&variables::DELEGATE, &delegate.address.bytes()),
            encode(delegate),
        );
    }

    fn decode<T: BorshDeserialize>(
        &self,
        key: &[u8],
        key_name: impl FnOnce() -> Key,
    ) -> Result<Option<T>, StateError> {
        match self.journal.get(key) {
            Some(bytes) => T::deserialize(&mut bytes.as_slice())
                .map(Some)
                .map_err(|err| {
                    StateError::KVGetError(KVGetError::DeserializeValueError {
                        key: key_name(),
                        source: err,
                    })
                }),
            None => Ok(None),
        }
    }
}

impl<R: KVGet> Journaled for DelegateState<R> {
    fn begin_layer(&mut self) {
        self.journal.push_layer();
    }

    fn commit_layer(&mut self) {
        self.journal.commit_layer();
    }

    fn rollback_layer(&mut self) {
        self.journal.rollback_layer();
    }
}

#[derive(Debug)]
pub enum DelegateError {
    AlreadyDelegate,
    NameTaken,
    UnknownDelegate,
    InsufficientVotes,
    State(StateError),
}

impl From<StateError> for DelegateError {
    fn from(err: StateError) -> Self {
        DelegateError::State(err)
    }
}

impl Display for DelegateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DelegateError::AlreadyDelegate => write!(f, "address is already a delegate"),
            DelegateError::NameTaken => write!(f, "delegate name is taken"),
            DelegateError::UnknownDelegate => write!(f, "no such delegate"),
            DelegateError::InsufficientVotes => write!(f, "unvote exceeds recorded vote"),
            DelegateError::State(err) => write!(f, "{}", err),
        }
    }
}
