/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The chain of finalized blocks, persisted in the user's [`KVStore`](crate::state::pluggables::KVStore).
//!
//! [`Blockchain`](blockchain::Blockchain) is owned by the consensus engine thread, which is the only
//! writer. Other threads (the block server, the library user) read through a
//! [`BlockchainCamera`](camera::BlockchainCamera), whose snapshots never observe a partially written
//! block, since every block is written in a single atomic batch.

use std::fmt::{self, Display, Formatter};

use crate::{
    state::{
        delegate_state::DelegateError,
        pluggables::{KVGetError, KVWriteError},
    },
    types::data_types::CryptoHash,
};

pub mod blockchain;

pub mod camera;

pub mod genesis;

pub mod write_batch;

/// Error when reading or writing the chain. Every variant except `InvalidGenesis` means the store
/// cannot be trusted, and a node that gets one while finalizing a block must halt.
#[derive(Debug)]
pub enum ChainError {
    KVGetError(KVGetError),
    KVWriteError(KVWriteError),
    /// The store holds no chain: [`initialize`](blockchain::Blockchain::initialize) was never called.
    NotInitialized,
    /// A balance would become negative outside of transaction execution.
    InsufficientBalance,
    /// An amount would overflow outside of transaction execution.
    Overflow,
    /// The genesis registers the same delegate, or the same delegate name, twice.
    InvalidGenesis,
}

impl From<KVGetError> for ChainError {
    fn from(err: KVGetError) -> Self {
        ChainError::KVGetError(err)
    }
}

impl From<KVWriteError> for ChainError {
    fn from(err: KVWriteError) -> Self {
        ChainError::KVWriteError(err)
    }
}

impl From<DelegateError> for ChainError {
    fn from(err: DelegateError) -> Self {
        match err {
            DelegateError::State(err) => err.into(),
            _ => ChainError::InvalidGenesis,
        }
    }
}

impl Display for ChainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::KVGetError(err) => write!(f, "{}", err),
            ChainError::KVWriteError(err) => write!(f, "{}", err),
            ChainError::NotInitialized => write!(f, "chain is not initialized"),
            ChainError::InsufficientBalance => write!(f, "insufficient balance"),
            ChainError::Overflow => write!(f, "amount overflow"),
            ChainError::InvalidGenesis => write!(f, "invalid genesis"),
        }
    }
}

/// Why a block could not be validated or imported.
#[derive(Debug)]
pub enum ImportError {
    NotNext { expected: u64, actual: u64 },
    InvalidHeader,
    InvalidTransactions,
    DuplicateTransaction(CryptoHash),
    /// The transaction's timestamp is too far from the block's.
    TransactionTimeDrift(CryptoHash),
    RejectedTransaction,
    ResultsMismatch,
    StateRootMismatch,
    InvalidVotes,
    /// Reading or writing the chain failed. Unlike the other variants, this says nothing about the
    /// block.
    Chain(ChainError),
}

impl ImportError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ImportError::Chain(_))
    }
}

impl From<ChainError> for ImportError {
    fn from(err: ChainError) -> Self {
        ImportError::Chain(err)
    }
}

impl From<KVGetError> for ImportError {
    fn from(err: KVGetError) -> Self {
        ImportError::Chain(ChainError::KVGetError(err))
    }
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::NotNext { expected, actual } => {
                write!(f, "expected block {}, got block {}", expected, actual)
            }
            ImportError::InvalidHeader => write!(f, "invalid header"),
            ImportError::InvalidTransactions => write!(f, "invalid transactions"),
            ImportError::DuplicateTransaction(hash) => {
                write!(f, "transaction {} was already included", hash)
            }
            ImportError::TransactionTimeDrift(hash) => {
                write!(f, "transaction {} is timestamped too far from the block", hash)
            }
            ImportError::RejectedTransaction => write!(f, "block includes a rejected transaction"),
            ImportError::ResultsMismatch => write!(f, "results do not match"),
            ImportError::StateRootMismatch => write!(f, "state root does not match"),
            ImportError::InvalidVotes => write!(f, "invalid votes"),
            ImportError::Chain(err) => write!(f, "{}", err),
        }
    }
}
