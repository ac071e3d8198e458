/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The interface between the executor and the virtual machine that runs contract code.
//!
//! The library does not ship a virtual machine. The library user provides a type that implements
//! [`Vm`], and the executor calls it for every `CREATE` and `CALL` transaction with a [`Repository`]
//! through which the contract reads and writes the ledger.
//!
//! Like the rest of the state transition function, `Vm::call` must be *deterministic*: given the same
//! repository contents, context, transaction, and code, it must return the same outcome and make the
//! same writes on every node.

use crate::{
    state::{account_state::AccountState, pluggables::KVGet, StateError},
    types::{
        amount::Amount,
        data_types::{Address, CryptoHash},
        transaction::Transaction,
        transaction_result::LogInfo,
    },
};

/// Information about the block in which a transaction is executed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockContext {
    pub number: u64,
    pub coinbase: Address,
    /// Milliseconds since the Unix Epoch.
    pub timestamp: u64,
    pub parent_hash: CryptoHash,
    pub gas_limit: u64,
}

/// What running a contract produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VmOutcome {
    /// Whether the code ran to completion. If `false`, every write the code made is rolled back.
    pub success: bool,
    pub gas_used: u64,
    /// For `CREATE`, the code to be stored at the new contract's address.
    pub return_data: Vec<u8>,
    pub logs: Vec<LogInfo>,
}

pub trait Vm: Send + 'static {
    /// Run `code` for `transaction`. For `CREATE` transactions, `code` is the transaction's init code;
    /// for `CALL` transactions, it is the code stored at the recipient (possibly empty).
    fn call(
        &mut self,
        repository: &mut dyn Repository,
        context: &BlockContext,
        transaction: &Transaction,
        code: &[u8],
    ) -> VmOutcome;
}

/// The view of the accounts that contract code runs against.
pub trait Repository {
    fn available(&self, address: &Address) -> Result<Amount, StateError>;
    fn nonce(&self, address: &Address) -> Result<u64, StateError>;
    fn transfer(&mut self, from: &Address, to: &Address, value: Amount) -> Result<(), StateError>;
    fn increase_nonce(&mut self, address: &Address) -> Result<u64, StateError>;
    fn code(&self, address: &Address) -> Option<Vec<u8>>;
    fn set_code(&mut self, address: &Address, code: Vec<u8>);
    fn storage(&self, address: &Address, key: &[u8]) -> Option<Vec<u8>>;
    fn put_storage(&mut self, address: &Address, key: &[u8], value: Vec<u8>);
    fn remove_storage(&mut self, address: &Address, key: &[u8]);
}

impl<R: KVGet> Repository for AccountState<R> {
    fn available(&self, address: &Address) -> Result<Amount, StateError> {
        Ok(self.get_account(address)?.available)
    }

    fn nonce(&self, address: &Address) -> Result<u64, StateError> {
        Ok(self.get_account(address)?.nonce)
    }

    fn transfer(&mut self, from: &Address, to: &Address, value: Amount) -> Result<(), StateError> {
        AccountState::transfer(self, from, to, value)
    }

    fn increase_nonce(&mut self, address: &Address) -> Result<u64, StateError> {
        AccountState::increase_nonce(self, address)
    }

    fn code(&self, address: &Address) -> Option<Vec<u8>> {
        self.get_code(address)
    }

    fn set_code(&mut self, address: &Address, code: Vec<u8>) {
        AccountState::set_code(self, address, code)
    }

    fn storage(&self, address: &Address, key: &[u8]) -> Option<Vec<u8>> {
        self.get_storage(address, key)
    }

    fn put_storage(&mut self, address: &Address, key: &[u8], value: Vec<u8>) {
        AccountState::put_storage(self, address, key, value)
    }

    fn remove_storage(&mut self, address: &Address, key: &[u8]) {
        AccountState::remove_storage(self, address, key)
    }
}
