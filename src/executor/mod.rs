/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The deterministic state transition function: applies transactions to the ledger state.
//!
//! ## Result classes
//!
//! Every transaction produces exactly one [`TransactionResult`](crate::types::transaction_result::TransactionResult)
//! whose [`Code`](crate::types::transaction_result::Code) falls in one of three classes:
//!
//! |Class|Fee charged|Nonce consumed|Body applied|
//! |---|---|---|---|
//! |Success|Yes|Yes|Yes|
//! |Failure|Yes|Yes|No|
//! |Rejected|No|No|No|
//!
//! Charging the fee of failed transactions means a sender cannot make validators re-execute an
//! expensive failing transaction for free, and consuming their nonce means the same transaction
//! cannot be included again.
//!
//! ## Contracts
//!
//! `CREATE` and `CALL` transactions run in a user-provided [virtual machine](vm::Vm). They pay for the
//! gas they use at their gas price, on top of their fee, and are refunded for gas they do not use.

pub mod implementation;

pub mod vm;

pub use implementation::{charged_fee, upfront_cost, TransactionExecutor};
