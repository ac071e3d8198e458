/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The transaction executor.

use log::trace;

use crate::{
    config::ChainSpec,
    state::{
        account_state::AccountState,
        delegate_state::{is_valid_name, DelegateError, DelegateState},
        journal::Journaled,
        pluggables::KVGet,
        StateError,
    },
    types::{
        amount::{Amount, AmountError},
        data_types::Address,
        signed_messages::SignedMessage,
        transaction::{Transaction, TransactionType},
        transaction_result::{Code, LogInfo, TransactionResult},
    },
};

use super::vm::{BlockContext, Vm};

/// Applies transactions to account and delegate state views, one at a time, in order.
pub struct TransactionExecutor<'a> {
    chain_spec: &'a ChainSpec,
}

impl<'a> TransactionExecutor<'a> {
    pub fn new(chain_spec: &'a ChainSpec) -> Self {
        Self { chain_spec }
    }

    /// Execute `transactions` in order, returning one result per transaction.
    ///
    /// The batch always completes: a transaction that is rejected or fails only affects its own
    /// result. The only error is a [`StateError`] that means the underlying store is unreadable.
    pub fn execute<R: KVGet, V: Vm>(
        &self,
        transactions: &[Transaction],
        accounts: &mut AccountState<R>,
        delegates: &mut DelegateState<R>,
        context: &BlockContext,
        vm: &mut V,
    ) -> Result<Vec<TransactionResult>, StateError> {
        transactions
            .iter()
            .map(|tx| self.execute_one(tx, accounts, delegates, context, vm))
            .collect()
    }

    /// Execute a single transaction.
    ///
    /// 1. A transaction that fails any of the checks that precede charging (hash, signature, network,
    ///    negative amounts, nonce, fee, gas price, data length, up-front cost) is *rejected*: the
    ///    state is left untouched.
    /// 2. Otherwise, the up-front cost (fee plus gas limit times gas price) is charged and the
    ///    sender's nonce is increased. Then the type-specific body runs in a tracked child view. If the
    ///    body fails, the child is rolled back, but the charge and nonce increase stay.
    /// 3. Unused gas is refunded.
    pub fn execute_one<R: KVGet, V: Vm>(
        &self,
        tx: &Transaction,
        accounts: &mut AccountState<R>,
        delegates: &mut DelegateState<R>,
        context: &BlockContext,
        vm: &mut V,
    ) -> Result<TransactionResult, StateError> {
        let sender = match tx.sender() {
            Some(sender)
                if tx.network == self.chain_spec.network
                    && tx.is_hash_consistent()
                    && tx.is_correct() =>
            {
                sender
            }
            _ => return Ok(TransactionResult::new(Code::Invalid)),
        };

        let upfront = match self.check(tx, &sender, accounts)? {
            Ok(upfront) => upfront,
            Err(code) => {
                trace!("Rejected transaction {}: {:?}", tx.hash, code);
                return Ok(TransactionResult::new(code));
            }
        };

        // Charge and consume the nonce on the outer view, so that they survive a failed body.
        let charge = upfront.checked_neg().map_err(|_| StateError::Overflow)?;
        accounts.adjust_available(&sender, charge)?;
        accounts.increase_nonce(&sender)?;

        let mut result = {
            let mut scope = (&mut *accounts, &mut *delegates);
            let mut child = scope.track();
            let (accounts, delegates) = &mut *child;
            match self.apply(tx, &sender, accounts, delegates, context, vm) {
                Ok(result) if result.code.is_success() => {
                    child.commit();
                    result
                }
                Ok(result) => {
                    child.rollback();
                    result
                }
                Err(BodyError::Failed(code)) => {
                    child.rollback();
                    TransactionResult::new(code)
                }
                Err(BodyError::Storage(err)) => return Err(err),
            }
        };

        if tx.tx_type.is_vm() {
            result.gas_used = result.gas_used.min(tx.gas);
            let refund = tx
                .gas_price
                .checked_mul(tx.gas - result.gas_used)
                .map_err(|_| StateError::Overflow)?;
            if !refund.is_zero() {
                accounts.adjust_available(&sender, refund)?;
            }
        }

        trace!("Executed transaction {}: {:?}", tx.hash, result.code);
        Ok(result)
    }

    /// Check everything that can reject `tx`. Returns the up-front cost that `tx` must pay if it is
    /// accepted.
    fn check<R: KVGet>(
        &self,
        tx: &Transaction,
        sender: &Address,
        accounts: &AccountState<R>,
    ) -> Result<Result<Amount, Code>, StateError> {
        if tx.tx_type.is_vm() && !self.chain_spec.virtual_machine {
            return Ok(Err(Code::InvalidType));
        }
        if tx.value.is_negative() || tx.fee.is_negative() || tx.gas_price.is_negative() {
            return Ok(Err(Code::InvalidFormat));
        }

        let account = accounts.get_account(sender)?;
        if tx.nonce != account.nonce {
            return Ok(Err(Code::InvalidNonce));
        }

        if tx.tx_type.is_vm() {
            if tx.gas_price < self.chain_spec.min_gas_price {
                return Ok(Err(Code::InvalidGasPrice));
            }
            if tx.gas > self.chain_spec.max_block_gas {
                return Ok(Err(Code::InvalidFormat));
            }
        } else if tx.fee < self.chain_spec.min_transaction_fee {
            return Ok(Err(Code::InvalidFee));
        }

        if tx.data.len() > tx.tx_type.max_data_size() {
            return Ok(Err(Code::InvalidDataLength));
        }

        let upfront = match upfront_cost(tx) {
            Ok(upfront) => upfront,
            Err(_) => return Ok(Err(Code::InsufficientFee)),
        };
        if upfront > account.available {
            return Ok(Err(Code::InsufficientFee));
        }

        Ok(Ok(upfront))
    }

    /// Run the type-specific part of `tx`.
    fn apply<R: KVGet, V: Vm>(
        &self,
        tx: &Transaction,
        sender: &Address,
        accounts: &mut AccountState<R>,
        delegates: &mut DelegateState<R>,
        context: &BlockContext,
        vm: &mut V,
    ) -> Result<TransactionResult, BodyError> {
        match tx.tx_type {
            TransactionType::Transfer => {
                accounts
                    .transfer(sender, &tx.to, tx.value)
                    .map_err(available_error)?;
            }

            TransactionType::Delegate => {
                if tx.to != Address::EMPTY {
                    return Err(BodyError::Failed(Code::InvalidRecipient));
                }
                if tx.value < self.chain_spec.min_delegate_burn_amount {
                    return Err(BodyError::Failed(Code::InvalidDelegateBurnAmount));
                }
                if !is_valid_name(&tx.data) {
                    return Err(BodyError::Failed(Code::InvalidDelegateName));
                }
                delegates
                    .register(sender, &tx.data, context.number)
                    .map_err(delegate_error)?;
                let burn = tx.value.checked_neg().map_err(|_| BodyError::Failed(Code::Failure))?;
                accounts
                    .adjust_available(sender, burn)
                    .map_err(available_error)?;
            }

            TransactionType::Vote => {
                let negated = tx.value.checked_neg().map_err(|_| BodyError::Failed(Code::Failure))?;
                accounts
                    .adjust_available(sender, negated)
                    .map_err(available_error)?;
                accounts
                    .adjust_locked(sender, tx.value)
                    .map_err(locked_error)?;
                delegates
                    .vote(sender, &tx.to, tx.value)
                    .map_err(delegate_error)?;
            }

            TransactionType::Unvote => {
                delegates
                    .unvote(sender, &tx.to, tx.value)
                    .map_err(delegate_error)?;
                let negated = tx.value.checked_neg().map_err(|_| BodyError::Failed(Code::Failure))?;
                accounts
                    .adjust_locked(sender, negated)
                    .map_err(locked_error)?;
                accounts
                    .adjust_available(sender, tx.value)
                    .map_err(available_error)?;
            }

            TransactionType::Create => {
                if tx.to != Address::EMPTY {
                    return Err(BodyError::Failed(Code::InvalidRecipient));
                }
                let contract = Address::contract(sender, tx.nonce);
                accounts
                    .transfer(sender, &contract, tx.value)
                    .map_err(available_error)?;
                let outcome = vm.call(accounts, context, tx, &tx.data);
                if outcome.success {
                    accounts.set_code(&contract, outcome.return_data.clone());
                }
                return Ok(vm_result(
                    outcome.success,
                    outcome.gas_used,
                    outcome.return_data,
                    outcome.logs,
                ));
            }

            TransactionType::Call => {
                accounts
                    .transfer(sender, &tx.to, tx.value)
                    .map_err(available_error)?;
                let code = accounts.get_code(&tx.to).unwrap_or_default();
                let outcome = vm.call(accounts, context, tx, &code);
                return Ok(vm_result(
                    outcome.success,
                    outcome.gas_used,
                    outcome.return_data,
                    outcome.logs,
                ));
            }
        }

        Ok(TransactionResult::new(Code::Success))
    }
}

/// Get what `tx` must be able to pay before it is executed: its fee, plus, for VM transactions, its
/// gas limit times its gas price.
pub fn upfront_cost(tx: &Transaction) -> Result<Amount, AmountError> {
    if tx.tx_type.is_vm() {
        tx.fee.checked_add(tx.gas_price.checked_mul(tx.gas)?)
    } else {
        Ok(tx.fee)
    }
}

/// Get what executing `tx` with `result` cost its sender, and therefore what the block's coinbase
/// collects. Rejected transactions cost nothing.
pub fn charged_fee(tx: &Transaction, result: &TransactionResult) -> Result<Amount, AmountError> {
    if result.code.is_rejected() {
        return Ok(Amount::ZERO);
    }
    if tx.tx_type.is_vm() {
        tx.fee
            .checked_add(tx.gas_price.checked_mul(result.gas_used.min(tx.gas))?)
    } else {
        Ok(tx.fee)
    }
}

fn vm_result(
    success: bool,
    gas_used: u64,
    return_data: Vec<u8>,
    logs: Vec<LogInfo>,
) -> TransactionResult {
    TransactionResult {
        code: if success { Code::Success } else { Code::Failure },
        gas_used,
        return_data,
        logs,
    }
}

/// Why the type-specific part of a transaction did not succeed.
enum BodyError {
    /// The transaction failed with this code. Its body is rolled back.
    Failed(Code),
    /// The store is unreadable. Execution cannot continue.
    Storage(StateError),
}

fn available_error(err: StateError) -> BodyError {
    match err {
        StateError::InsufficientBalance => BodyError::Failed(Code::InsufficientAvailable),
        StateError::Overflow => BodyError::Failed(Code::Failure),
        err @ StateError::KVGetError(_) => BodyError::Storage(err),
    }
}

fn locked_error(err: StateError) -> BodyError {
    match err {
        StateError::InsufficientBalance => BodyError::Failed(Code::InsufficientLocked),
        other => available_error(other),
    }
}

fn delegate_error(err: DelegateError) -> BodyError {
    match err {
        DelegateError::AlreadyDelegate | DelegateError::NameTaken => {
            BodyError::Failed(Code::InvalidDelegating)
        }
        DelegateError::UnknownDelegate => BodyError::Failed(Code::InvalidDelegate),
        DelegateError::InsufficientVotes => BodyError::Failed(Code::InsufficientLocked),
        DelegateError::State(err) => available_error(err),
    }
}
