/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Balances, nonces, code, and storage of accounts.

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

/// The balances and nonce of an account. Accounts that have never been written to read as
/// `Account::default()`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Account {
    /// Balance that can be spent or transferred.
    pub available: Amount,
    /// Balance that is locked up as votes for delegates.
    pub locked: Amount,
    /// Nonce that the account's next transaction must carry.
    pub nonce: u64,
}

/// Journaled view of the accounts in the ledger, over a read-only base.
pub struct AccountState<R: KVGet> {
    journal: Journal<R>,
}

impl<R: KVGet> AccountState<R> {
    pub fn new(base: R) -> Self {
        Self {
            journal: Journal::new(base),
        }
    }

    pub fn get_account(&self, address: &Address) -> Result<Account, StateError> {
        let key = concat(&variables::ACCOUNT, &address.bytes());
        match self.journal.get(&key) {
            Some(bytes) => Account::deserialize(&mut bytes.as_slice()).map_err(|err| {
                StateError::KVGetError(KVGetError::DeserializeValueError {
                    key: Key::Account { address: *address },
                    source: err,
                })
            }),
            None => Ok(Account::default()),
        }
    }

    fn put_account(&mut self, address: &Address, account: &Account) {
        self.journal.set(
            concat(&variables::ACCOUNT, &address.bytes()),
            encode(account),
        );
    }

    /// Whether `address` has ever been written to.
    pub fn exists(&self, address: &Address) -> bool {
        self.journal
            .get(&concat(&variables::ACCOUNT, &address.bytes()))
            .is_some()
    }

    /// Add `delta` (which may be negative) to the available balance of `address`.
    pub fn adjust_available(&mut self, address: &Address, delta: Amount) -> Result<(), StateError> {
        let mut account = self.get_account(address)?;
        account.available = account
            .available
            .checked_add(delta)
            .map_err(|_| StateError::Overflow)?;
        if account.available.is_negative() {
            return Err(StateError::InsufficientBalance);
        }
        self.put_account(address, &account);
        Ok(())
    }

    /// Add `delta` (which may be negative) to the locked balance of `address`.
    pub fn adjust_locked(&mut self, address: &Address, delta: Amount) -> Result<(), StateError> {
        let mut account = self.get_account(address)?;
        account.locked = account
            .locked
            .checked_add(delta)
            .map_err(|_| StateError::Overflow)?;
        if account.locked.is_negative() {
            return Err(StateError::InsufficientBalance);
        }
        self.put_account(address, &account);
        Ok(())
    }

    /// Move `value` out of `from`'s available balance into `to`'s.
    pub fn transfer(&mut self, from: &Address, to: &Address, value: Amount) -> Result<(), StateError> {
        let negated = value.checked_neg().map_err(|_| StateError::Overflow)?;
        self.adjust_available(from, negated)?;
        self.adjust_available(to, value)
    }

    pub fn increase_nonce(&mut self, address: &Address) -> Result<u64, StateError> {
        let mut account = self.get_account(address)?;
        account.nonce = account.nonce.checked_add(1).ok_or(StateError::Overflow)?;
        self.put_account(address, &account);
        Ok(account.nonce)
    }

    pub fn get_code(&self, address: &Address) -> Option<Vec<u8>> {
        self.journal
            .get(&concat(&variables::CODE, &address.bytes()))
    }

    pub fn set_code(&mut self, address: &Address, code: Vec<u8>) {
        self.journal
            .set(concat(&variables::CODE, &address.bytes()), code);
    }

    pub fn get_storage(&self, address: &Address, key: &[u8]) -> Option<Vec<u8>> {
        self.journal.get(&variables::storage_key(address, key))
    }

    pub fn put_storage(&mut self, address: &Address, key: &[u8], value: Vec<u8>) {
        self.journal
            .set(variables::storage_key(address, key), value);
    }

    pub fn remove_storage(&mut self, address: &Address, key: &[u8]) {
        self.journal.delete(variables::storage_key(address, key));
    }

    /// All changes made through this view so far, sorted by key.
    pub fn changes(&self) -> Vec<(Vec<u8>, Option<Vec<u8>>)> {
        self.journal.changes()
    }

    pub fn into_updates(self) -> StateUpdates {
        self.journal.into_updates()
    }
}

impl<R: KVGet> Journaled for AccountState<R> {
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
