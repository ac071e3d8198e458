/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A typed wrapper around the user's [`WriteBatch`] that forms keys from the
//! [variables](crate::state::variables) layout.

use crate::{
    state::{
        pluggables::WriteBatch,
        variables::{self, concat},
    },
    types::{
        block::Block, codec::encode, data_types::Address, update_sets::StateUpdates,
    },
};

pub struct ChainWriteBatch<W: WriteBatch>(pub(super) W);

impl<W: WriteBatch> ChainWriteBatch<W> {
    pub(crate) fn new() -> ChainWriteBatch<W> {
        ChainWriteBatch(W::new())
    }

    /// Set every part of `block`, and the indexes that point into it.
    pub fn set_block(&mut self, block: &Block) {
        let number = block.number().to_be_bytes();

        self.0.set(
            &concat(&variables::BLOCK_HEADER, &number),
            &encode(&block.header),
        );
        self.0.set(
            &concat(&variables::BLOCK_TRANSACTIONS, &number),
            &encode(&block.transactions),
        );
        self.0.set(
            &concat(&variables::BLOCK_RESULTS, &number),
            &encode(&block.results),
        );
        // Encoded as the tuple `(u32, Vec<Signature>)`.
        let mut votes = encode(&block.view);
        votes.extend(encode(&block.votes));
        self.0.set(&concat(&variables::BLOCK_VOTES, &number), &votes);
        self.0.set(
            &concat(&variables::BLOCK_NUMBER, &block.hash().bytes()),
            &encode(&block.number()),
        );
        for (index, tx) in block.transactions.iter().enumerate() {
            self.0.set(
                &concat(&variables::TRANSACTION_INDEX, &tx.hash.bytes()),
                &encode(&(block.number(), index as u32)),
            );
        }
    }

    pub fn set_latest_block_number(&mut self, number: u64) {
        self.0.set(&variables::LATEST_BLOCK_NUMBER, &encode(&number));
    }

    pub fn set_validators(&mut self, validators: &Vec<Address>) {
        self.0.set(&variables::VALIDATORS, &encode(validators));
    }

    /// Apply `updates` to the account and delegate state.
    pub fn apply_state_updates(&mut self, updates: &StateUpdates) {
        for (key, value) in updates.inserts() {
            self.0.set(key, value);
        }
        for key in updates.deletes() {
            self.0.delete(key);
        }
    }
}
