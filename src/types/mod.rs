/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that are shared by every subsystem of the node.
//!
//! Everything in this module has a canonical byte encoding (Borsh), and everything that has an
//! identity (transactions, block headers) derives that identity from a [BLAKE2b-256
//! hash](crypto_primitives::h256) of its canonical encoding.

pub mod amount;

pub mod block;

pub mod codec;

pub mod crypto_primitives;

pub mod data_types;

pub mod merkle;

pub mod signed_messages;

pub mod transaction;

pub mod transaction_result;

pub mod update_sets;
