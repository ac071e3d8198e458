/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Traits for pluggable ledger persistence.
//!
//! The library does not ship a storage engine. Instead, the library user provides a type that
//! implements [`KVStore`], and the library reads and writes every [variable](super::variables) of the
//! ledger through it. `KVStore` has only three requirements beyond a point lookup:
//! 1. Writes happen in [batches](WriteBatch) that are applied atomically: readers observe either none
//!    or all of a batch.
//! 2. A [snapshot](KVStore::snapshot) gives a consistent view that concurrent writes do not affect.
//! 3. A write that cannot be made durable returns a [`KVWriteError`] instead of being dropped.

use std::fmt::{self, Display, Formatter};

use borsh::BorshDeserialize;

use crate::types::{
    amount::Amount,
    block::{Block, BlockHeader},
    crypto_primitives::Signature,
    data_types::{Address, CryptoHash},
    transaction::Transaction,
    transaction_result::TransactionResult,
};

use super::{
    account_state::Account,
    delegate_state::Delegate,
    variables::{self, concat},
};

pub trait KVStore: KVGet + Clone + Send + 'static {
    type WriteBatch: WriteBatch;
    type Snapshot<'a>: 'a + KVGet;

    fn write(&mut self, wb: Self::WriteBatch) -> Result<(), KVWriteError>;
    fn clear(&mut self);
    fn snapshot<'b>(&'b self) -> Self::Snapshot<'_>;
}

pub trait KVGet {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /* ↓↓↓ Blocks ↓↓↓ */

    fn block(&self, number: u64) -> Result<Option<Block>, KVGetError> {
        let header = match self.block_header(number)? {
            Some(header) => header,
            None => return Ok(None),
        };
        // If the header is stored, the other parts of the block were stored in the same batch.
        let transactions = self
            .block_transactions(number)?
            .ok_or(KVGetError::ValueExpectedButNotFound {
                key: Key::BlockTransactions { number },
            })?;
        let results = self
            .block_results(number)?
            .ok_or(KVGetError::ValueExpectedButNotFound {
                key: Key::BlockResults { number },
            })?;
        let (view, votes) =
            self.block_votes(number)?
                .ok_or(KVGetError::ValueExpectedButNotFound {
                    key: Key::BlockVotes { number },
                })?;

        Ok(Some(Block {
            header,
            transactions,
            results,
            view,
            votes,
        }))
    }

    fn block_header(&self, number: u64) -> Result<Option<BlockHeader>, KVGetError> {
        decode_value(
            self.get(&concat(&variables::BLOCK_HEADER, &number.to_be_bytes())),
            || Key::BlockHeader { number },
        )
    }

    fn block_transactions(&self, number: u64) -> Result<Option<Vec<Transaction>>, KVGetError> {
        decode_value(
            self.get(&concat(&variables::BLOCK_TRANSACTIONS, &number.to_be_bytes())),
            || Key::BlockTransactions { number },
        )
    }

    fn block_results(&self, number: u64) -> Result<Option<Vec<TransactionResult>>, KVGetError> {
        decode_value(
            self.get(&concat(&variables::BLOCK_RESULTS, &number.to_be_bytes())),
            || Key::BlockResults { number },
        )
    }

    /// Get the view in which block `number` was finalized, and the precommit signatures over it.
    fn block_votes(&self, number: u64) -> Result<Option<(u32, Vec<Signature>)>, KVGetError> {
        decode_value(
            self.get(&concat(&variables::BLOCK_VOTES, &number.to_be_bytes())),
            || Key::BlockVotes { number },
        )
    }

    /* ↓↓↓ Indexes ↓↓↓ */

    fn block_number(&self, hash: &CryptoHash) -> Result<Option<u64>, KVGetError> {
        decode_value(
            self.get(&concat(&variables::BLOCK_NUMBER, &hash.bytes())),
            || Key::BlockNumber { hash: *hash },
        )
    }

    /// Get the number of the block that includes the transaction with `hash`, and its position in the
    /// block.
    fn transaction_index(&self, hash: &CryptoHash) -> Result<Option<(u64, u32)>, KVGetError> {
        decode_value(
            self.get(&concat(&variables::TRANSACTION_INDEX, &hash.bytes())),
            || Key::TransactionIndex { hash: *hash },
        )
    }

    /* ↓↓↓ Chain ↓↓↓ */

    fn latest_block_number(&self) -> Result<Option<u64>, KVGetError> {
        decode_value(self.get(&variables::LATEST_BLOCK_NUMBER), || {
            Key::LatestBlockNumber
        })
    }

    fn validators(&self) -> Result<Vec<Address>, KVGetError> {
        decode_value(self.get(&variables::VALIDATORS), || Key::Validators)?
            .ok_or(KVGetError::ValueExpectedButNotFound {
                key: Key::Validators,
            })
    }

    /* ↓↓↓ Accounts ↓↓↓ */

    fn account(&self, address: &Address) -> Result<Option<Account>, KVGetError> {
        decode_value(
            self.get(&concat(&variables::ACCOUNT, &address.bytes())),
            || Key::Account { address: *address },
        )
    }

    fn code(&self, address: &Address) -> Option<Vec<u8>> {
        self.get(&concat(&variables::CODE, &address.bytes()))
    }

    fn storage(&self, address: &Address, key: &[u8]) -> Option<Vec<u8>> {
        self.get(&variables::storage_key(address, key))
    }

    /* ↓↓↓ Delegates ↓↓↓ */

    fn delegate(&self, address: &Address) -> Result<Option<Delegate>, KVGetError> {
        decode_value(
            self.get(&concat(&variables::DELEGATE, &address.bytes())),
            || Key::Delegate { address: *address },
        )
    }

    fn delegate_by_name(&self, name: &[u8]) -> Result<Option<Address>, KVGetError> {
        decode_value(
            self.get(&concat(&variables::DELEGATE_NAME, name)),
            || Key::DelegateName {
                name: name.to_vec(),
            },
        )
    }

    fn vote(&self, voter: &Address, delegate: &Address) -> Result<Option<Amount>, KVGetError> {
        decode_value(self.get(&variables::vote_key(voter, delegate)), || {
            Key::Vote {
                voter: *voter,
                delegate: *delegate,
            }
        })
    }

    /// Get the addresses of all registered delegates, in order of registration.
    fn delegate_list(&self) -> Result<Vec<Address>, KVGetError> {
        Ok(
            decode_value(self.get(&variables::DELEGATE_LIST), || Key::DelegateList)?
                .unwrap_or_default(),
        )
    }
}

impl<T: KVGet + ?Sized> KVGet for &T {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        (**self).get(key)
    }
}

fn decode_value<T: BorshDeserialize>(
    bytes: Option<Vec<u8>>,
    key: impl FnOnce() -> Key,
) -> Result<Option<T>, KVGetError> {
    match bytes {
        Some(bytes) => T::deserialize(&mut bytes.as_slice())
            .map(Some)
            .map_err(|err| KVGetError::DeserializeValueError {
                key: key(),
                source: err,
            }),
        None => Ok(None),
    }
}

#[derive(Debug)]
pub enum KVGetError {
    DeserializeValueError { key: Key, source: std::io::Error },
    ValueExpectedButNotFound { key: Key },
}

impl Display for KVGetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            KVGetError::DeserializeValueError { key, source } => {
                write!(f, "failed to deserialize {}: {}", key, source)
            }
            KVGetError::ValueExpectedButNotFound { key } => {
                write!(f, "{} expected but not found", key)
            }
        }
    }
}

#[derive(Debug)]
pub enum Key {
    BlockHeader { number: u64 },
    BlockTransactions { number: u64 },
    BlockResults { number: u64 },
    BlockVotes { number: u64 },
    BlockNumber { hash: CryptoHash },
    TransactionIndex { hash: CryptoHash },
    LatestBlockNumber,
    Validators,
    Account { address: Address },
    Delegate { address: Address },
    DelegateName { name: Vec<u8> },
    Vote { voter: Address, delegate: Address },
    DelegateList,
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Key::BlockHeader { number } => write!(f, "Block Header of block {}", number),
            Key::BlockTransactions { number } => write!(f, "Transactions of block {}", number),
            Key::BlockResults { number } => write!(f, "Results of block {}", number),
            Key::BlockVotes { number } => write!(f, "Votes of block {}", number),
            Key::BlockNumber { hash } => write!(f, "Block Number of block {}", hash),
            Key::TransactionIndex { hash } => write!(f, "Index of transaction {}", hash),
            Key::LatestBlockNumber => write!(f, "Latest Block Number"),
            Key::Validators => write!(f, "Validators"),
            Key::Account { address } => write!(f, "Account {}", address),
            Key::Delegate { address } => write!(f, "Delegate {}", address),
            Key::DelegateName { name } => {
                write!(f, "Delegate named {}", String::from_utf8_lossy(name))
            }
            Key::Vote { voter, delegate } => {
                write!(f, "Vote of {} for delegate {}", voter, delegate)
            }
            Key::DelegateList => write!(f, "Delegate List"),
        }
    }
}

pub trait WriteBatch {
    fn new() -> Self;
    fn set(&mut self, key: &[u8], value: &[u8]);
    fn delete(&mut self, key: &[u8]);
}

/// Error returned by [`KVStore::write`] when a batch could not be applied durably. When this is
/// returned, none of the batch's writes may be visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KVWriteError {
    WriteFailed { reason: String },
}

impl Display for KVWriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            KVWriteError::WriteFailed { reason } => write!(f, "write failed: {}", reason),
        }
    }
}
