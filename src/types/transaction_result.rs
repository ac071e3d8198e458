/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The outcome of executing one transaction.

use borsh::{BorshDeserialize, BorshSerialize};

use super::data_types::{Address, CryptoHash};

/// Status code of an executed transaction.
///
/// Codes fall into three classes:
/// 1. **Success**: the transaction took full effect.
/// 2. **Failure**: the transaction was executed, its fee was charged and its nonce consumed, but
///    every other state change it made was rolled back.
/// 3. **Rejected**: the transaction could not be executed at all and left the state untouched. A
///    block that includes a rejected transaction is invalid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum Code {
    Success,

    // Failures.
    Failure,
    InsufficientAvailable,
    InsufficientLocked,
    InvalidDelegating,
    InvalidDelegate,
    InvalidDelegateName,
    InvalidDelegateBurnAmount,
    InvalidRecipient,

    // Rejections.
    Invalid,
    InvalidFormat,
    InvalidNonce,
    InvalidFee,
    InvalidGasPrice,
    InvalidDataLength,
    InvalidType,
    InsufficientFee,
}

impl Code {
    pub const fn is_success(&self) -> bool {
        matches!(self, Code::Success)
    }

    pub const fn is_rejected(&self) -> bool {
        matches!(
            self,
            Code::Invalid
                | Code::InvalidFormat
                | Code::InvalidNonce
                | Code::InvalidFee
                | Code::InvalidGasPrice
                | Code::InvalidDataLength
                | Code::InvalidType
                | Code::InsufficientFee
        )
    }

    /// Whether the transaction was executed, i.e., whether it consumed its nonce and paid its fee.
    pub const fn is_accepted(&self) -> bool {
        !self.is_rejected()
    }
}

/// An event emitted by a contract during execution.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct LogInfo {
    pub address: Address,
    pub topics: Vec<CryptoHash>,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TransactionResult {
    pub code: Code,
    pub gas_used: u64,
    pub return_data: Vec<u8>,
    pub logs: Vec<LogInfo>,
}

impl TransactionResult {
    /// A result with `code` and no gas usage, return data, or logs.
    pub fn new(code: Code) -> TransactionResult {
        TransactionResult {
            code,
            gas_used: 0,
            return_data: Vec::new(),
            logs: Vec::new(),
        }
    }
}
