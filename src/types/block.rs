/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the 'block' type and its associated validation functions.

use std::collections::HashSet;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::bft::{
    types::{Vote, VoteType},
    vote_set::quorum,
};

use super::{
    codec::encode,
    crypto_primitives::{h256, Signature},
    data_types::{Address, CryptoHash, NetworkId},
    merkle::{results_root, transactions_root},
    transaction::Transaction,
    transaction_result::TransactionResult,
};

/// Maximum length of the free-form `data` field of a [`BlockHeader`].
pub const MAX_EXTRA_DATA_SIZE: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BlockHeader {
    pub number: u64,
    pub coinbase: Address,
    pub parent_hash: CryptoHash,
    /// Milliseconds since the Unix Epoch.
    pub timestamp: u64,
    pub transactions_root: CryptoHash,
    pub results_root: CryptoHash,
    pub state_root: CryptoHash,
    pub data: Vec<u8>,
    pub hash: CryptoHash,
}

impl BlockHeader {
    pub fn new(
        number: u64,
        coinbase: Address,
        parent_hash: CryptoHash,
        timestamp: u64,
        transactions_root: CryptoHash,
        results_root: CryptoHash,
        state_root: CryptoHash,
        data: Vec<u8>,
    ) -> BlockHeader {
        let mut header = BlockHeader {
            number,
            coinbase,
            parent_hash,
            timestamp,
            transactions_root,
            results_root,
            state_root,
            data,
            hash: CryptoHash::ZERO,
        };
        header.hash = header.compute_hash();
        header
    }

    /// Hash of every field except `hash`.
    pub fn compute_hash(&self) -> CryptoHash {
        let mut bytes = Vec::new();
        bytes.extend(encode(&self.number));
        bytes.extend(encode(&self.coinbase));
        bytes.extend(encode(&self.parent_hash));
        bytes.extend(encode(&self.timestamp));
        bytes.extend(encode(&self.transactions_root));
        bytes.extend(encode(&self.results_root));
        bytes.extend(encode(&self.state_root));
        bytes.extend(encode(&self.data));
        h256(&bytes)
    }

    /// Check that the stored `hash` equals the hash recomputed from the other fields.
    pub fn is_hash_consistent(&self) -> bool {
        self.hash == self.compute_hash()
    }
}

/// A block: a header, the transactions it commits to, their results, and the precommit signatures
/// of the validators that finalized it in `view`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    pub results: Vec<TransactionResult>,
    pub view: u32,
    pub votes: Vec<Signature>,
}

impl Block {
    pub fn new(
        header: BlockHeader,
        transactions: Vec<Transaction>,
        results: Vec<TransactionResult>,
        view: u32,
        votes: Vec<Signature>,
    ) -> Block {
        Block {
            header,
            transactions,
            results,
            view,
            votes,
        }
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn hash(&self) -> CryptoHash {
        self.header.hash
    }

    /// Check that `header` can extend `parent`:
    /// 1. Its hash is self-consistent.
    /// 2. Its number follows the parent's, and it links to the parent's hash.
    /// 3. Its timestamp is not earlier than the parent's, and not more than `max_drift_ms` ahead of
    ///    `now_ms`.
    /// 4. Its extra data is at most [`MAX_EXTRA_DATA_SIZE`] bytes long.
    pub fn validate_header(
        header: &BlockHeader,
        parent: &BlockHeader,
        now_ms: u64,
        max_drift_ms: u64,
    ) -> bool {
        header.is_hash_consistent()
            && parent.number.checked_add(1) == Some(header.number)
            && header.parent_hash == parent.hash
            && header.timestamp >= parent.timestamp
            && header.timestamp <= now_ms.saturating_add(max_drift_ms)
            && header.data.len() <= MAX_EXTRA_DATA_SIZE
    }

    /// Check that every transaction is valid for `network`, that no transaction appears twice, and
    /// that `header.transactions_root` commits to them.
    pub fn validate_transactions(
        header: &BlockHeader,
        transactions: &[Transaction],
        network: NetworkId,
    ) -> bool {
        let mut hashes = HashSet::with_capacity(transactions.len());
        transactions
            .iter()
            .all(|tx| tx.validate(network) && hashes.insert(tx.hash))
            && header.transactions_root == transactions_root(transactions)
    }

    /// Check that `header.results_root` commits to `results`.
    pub fn validate_results(header: &BlockHeader, results: &[TransactionResult]) -> bool {
        header.results_root == results_root(results)
    }

    /// Check that `block.votes` is a quorum of correct signatures by distinct members of `validators`
    /// over the precommit approval of `block` in `block.view`.
    pub fn validate_votes(block: &Block, validators: &[Address]) -> bool {
        let vote = Vote::new_approve(
            VoteType::PreCommit,
            block.number(),
            block.view,
            block.hash(),
        );
        let message = vote.signed_bytes();

        let mut signers = HashSet::with_capacity(block.votes.len());
        for signature in &block.votes {
            let signer = signature.address();
            if !validators.contains(&signer) || !signature.verify(&message) || !signers.insert(signer)
            {
                return false;
            }
        }
        signers.len() >= quorum(validators.len())
    }
}
