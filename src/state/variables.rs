/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Byte-prefixes that specify where each ledger variable is stored in the user-provided key-value
//! store.
//!
//! # List of State Variables
//!
//! ## Blocks
//!
//! |Variable|Type|Description|
//! |---|---|---|
//! |Block Header|`u64` -> [`BlockHeader`](crate::types::block::BlockHeader)|Header of each finalized block, by number.|
//! |Block Transactions|`u64` -> `Vec<Transaction>`|Transactions of each finalized block, in order.|
//! |Block Results|`u64` -> `Vec<TransactionResult>`|Results of each finalized block's transactions, in order.|
//! |Block Votes|`u64` -> `(u32, Vec<Signature>)`|The view in which each block was finalized, and the precommit signatures that finalized it.|
//! |Block Number|[`CryptoHash`](crate::types::data_types::CryptoHash) -> `u64`|Number of each finalized block, by hash.|
//! |Transaction Index|[`CryptoHash`](crate::types::data_types::CryptoHash) -> `(u64, u32)`|Block number and position of each included transaction, by hash.|
//!
//! ## Chain
//!
//! |Variable|Type|Description|
//! |---|---|---|
//! |Latest Block Number|`u64`|Number of the most recently finalized block.|
//! |Validators|`Vec<Address>`|The validator list in effect for the next block. Re-computed from the delegate tally at every validator update checkpoint.|
//!
//! ## Accounts
//!
//! |Variable|Type|Description|
//! |---|---|---|
//! |Account|[`Address`](crate::types::data_types::Address) -> [`Account`](super::account_state::Account)|Available balance, locked balance, and nonce of each account.|
//! |Code|[`Address`](crate::types::data_types::Address) -> `Vec<u8>`|Code of each contract account.|
//! |Storage|`(Address, Vec<u8>)` -> `Vec<u8>`|Storage of each contract account.|
//!
//! ## Delegates
//!
//! |Variable|Type|Description|
//! |---|---|---|
//! |Delegate|[`Address`](crate::types::data_types::Address) -> [`Delegate`](super::delegate_state::Delegate)|Registration and vote tally of each delegate.|
//! |Delegate Name|`Vec<u8>` -> `Address`|Address of the delegate that registered each name.|
//! |Vote|`(Address, Address)` -> [`Amount`](crate::types::amount::Amount)|Amount that each voter has voted for each delegate.|
//! |Delegate List|`Vec<Address>`|Addresses of all delegates, in order of registration.|
//!
//! # Persistence of state variables
//!
//! Every variable is stored as **Borsh-serialized values**, except code and storage, which are
//! stored as raw bytes. Single values are stored at one-byte constant keys, and mappings at the
//! concatenation of a one-byte constant prefix and the key of the mapping. Block numbers in keys are
//! written big-endian so that the blocks of a chain are contiguous and ordered in stores that sort
//! their keys.

use crate::types::data_types::Address;

// Blocks
pub const BLOCK_HEADER: [u8; 1] = [0x00];
pub const BLOCK_TRANSACTIONS: [u8; 1] = [0x01];
pub const BLOCK_RESULTS: [u8; 1] = [0x02];
pub const BLOCK_VOTES: [u8; 1] = [0x03];
pub const BLOCK_NUMBER: [u8; 1] = [0x04];
pub const TRANSACTION_INDEX: [u8; 1] = [0x05];

// Chain
pub const LATEST_BLOCK_NUMBER: [u8; 1] = [0x10];
pub const VALIDATORS: [u8; 1] = [0x11];

// Accounts
pub const ACCOUNT: [u8; 1] = [0x20];
pub const CODE: [u8; 1] = [0x21];
pub const STORAGE: [u8; 1] = [0x22];

// Delegates
pub const DELEGATE: [u8; 1] = [0x30];
pub const DELEGATE_NAME: [u8; 1] = [0x31];
pub const VOTE: [u8; 1] = [0x32];
pub const DELEGATE_LIST: [u8; 1] = [0x33];

/// Concatenate two byteslices into one vector.
pub fn concat(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut res = Vec::with_capacity(a.len() + b.len());
    res.extend_from_slice(a);
    res.extend_from_slice(b);
    res
}

/// Key of `key` in the storage of contract `address`.
pub fn storage_key(address: &Address, key: &[u8]) -> Vec<u8> {
    concat(&concat(&STORAGE, &address.bytes()), key)
}

pub fn vote_key(voter: &Address, delegate: &Address) -> Vec<u8> {
    concat(&concat(&VOTE, &voter.bytes()), &delegate.bytes())
}
