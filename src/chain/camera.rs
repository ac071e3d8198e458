/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! General purpose, read-only interface for querying the chain from any thread.

use crate::{
    state::{
        account_state::Account,
        delegate_state::Delegate,
        pluggables::{KVGet, KVStore},
    },
    types::{
        block::{Block, BlockHeader},
        data_types::{Address, CryptoHash},
        transaction::Transaction,
    },
};

use super::ChainError;

/// A factory for [`ChainSnapshot`]s.
#[derive(Clone)]
pub struct BlockchainCamera<K: KVStore>(K);

impl<K: KVStore> BlockchainCamera<K> {
    pub fn new(kv_store: K) -> Self {
        BlockchainCamera(kv_store)
    }

    pub fn snapshot(&self) -> ChainSnapshot<K::Snapshot<'_>> {
        ChainSnapshot(self.0.snapshot())
    }
}

/// A read-only view into the chain that is guaranteed to stay unchanged.
pub struct ChainSnapshot<S: KVGet>(S);

impl<S: KVGet> ChainSnapshot<S> {
    pub fn latest_block_number(&self) -> Result<Option<u64>, ChainError> {
        Ok(self.0.latest_block_number()?)
    }

    pub fn block(&self, number: u64) -> Result<Option<Block>, ChainError> {
        Ok(self.0.block(number)?)
    }

    pub fn block_header(&self, number: u64) -> Result<Option<BlockHeader>, ChainError> {
        Ok(self.0.block_header(number)?)
    }

    pub fn block_by_hash(&self, hash: &CryptoHash) -> Result<Option<Block>, ChainError> {
        match self.0.block_number(hash)? {
            Some(number) => self.block(number),
            None => Ok(None),
        }
    }

    pub fn transaction(&self, hash: &CryptoHash) -> Result<Option<Transaction>, ChainError> {
        let (number, index) = match self.0.transaction_index(hash)? {
            Some(position) => position,
            None => return Ok(None),
        };
        Ok(self
            .0
            .block_transactions(number)?
            .and_then(|txs| txs.into_iter().nth(index as usize)))
    }

    pub fn validators(&self) -> Result<Vec<Address>, ChainError> {
        Ok(self.0.validators()?)
    }

    pub fn account(&self, address: &Address) -> Result<Account, ChainError> {
        Ok(self.0.account(address)?.unwrap_or_default())
    }

    pub fn delegate(&self, address: &Address) -> Result<Option<Delegate>, ChainError> {
        Ok(self.0.delegate(address)?)
    }

    pub fn code(&self, address: &Address) -> Option<Vec<u8>> {
        self.0.code(address)
    }

    pub fn storage(&self, address: &Address, key: &[u8]) -> Option<Vec<u8>> {
        self.0.storage(address, key)
    }
}
