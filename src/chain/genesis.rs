/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The initial state of a chain.

use crate::types::{amount::Amount, data_types::Address};

/// Everything that goes into block 0 of a chain.
///
/// Genesis delegates are registered at block 0 with no votes. Since they all tie on votes, the initial
/// validator list is the genesis delegates in order of name, truncated to the maximum number of
/// validators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Genesis {
    /// Milliseconds since the Unix Epoch.
    pub timestamp: u64,
    /// Initial available balances.
    pub premine: Vec<(Address, Amount)>,
    /// Initial delegates, as (address, name) pairs.
    pub delegates: Vec<(Address, String)>,
    /// Extra data stored in the genesis header.
    pub data: Vec<u8>,
}
