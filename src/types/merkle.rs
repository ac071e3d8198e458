/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Binary Merkle roots over ordered sequences of hashes.
//!
//! Only the root is ever needed (to commit to a block's transactions and results in its header), so
//! the tree is never materialized beyond the current level.
//!
//! ## Shape
//!
//! Leaves are combined pairwise, left to right: `parent = h256(left ‖ right)`. If a level has an odd
//! number of nodes, its last node is carried up to the next level *unmodified* (it is neither hashed
//! alone nor paired with a copy of itself). The root of a single leaf is that leaf, and the root of
//! zero leaves is [`CryptoHash::EMPTY_H256`].

use super::{
    codec::encode,
    crypto_primitives::h256,
    data_types::CryptoHash,
    transaction::Transaction,
    transaction_result::TransactionResult,
};

/// Compute the Merkle root of `leaves`.
pub fn compute_root(leaves: &[CryptoHash]) -> CryptoHash {
    if leaves.is_empty() {
        return CryptoHash::EMPTY_H256;
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => {
                    let mut bytes = Vec::with_capacity(64);
                    bytes.extend_from_slice(&left.bytes());
                    bytes.extend_from_slice(&right.bytes());
                    h256(&bytes)
                }
                [carried] => *carried,
                _ => unreachable!(),
            })
            .collect();
    }
    level[0]
}

/// Merkle root over the hashes of `transactions`, in order.
pub fn transactions_root(transactions: &[Transaction]) -> CryptoHash {
    let leaves: Vec<CryptoHash> = transactions.iter().map(|tx| tx.hash).collect();
    compute_root(&leaves)
}

/// Merkle root over `h256` of the encoding of each of `results`, in order.
pub fn results_root(results: &[TransactionResult]) -> CryptoHash {
    let leaves: Vec<CryptoHash> = results.iter().map(|result| h256(&encode(result))).collect();
    compute_root(&leaves)
}
