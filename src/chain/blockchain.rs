/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The [`Blockchain`] type: reads, executes, and writes blocks.

use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::{
    config::ChainSpec,
    executor::{
        charged_fee,
        vm::{BlockContext, Vm},
        TransactionExecutor,
    },
    state::{
        account_state::{Account, AccountState},
        delegate_state::{Delegate, DelegateState},
        pluggables::{KVGet, KVGetError, KVStore, Key},
        state_root, StateError,
    },
    types::{
        amount::Amount,
        block::{Block, BlockHeader},
        data_types::{Address, CryptoHash},
        merkle::{results_root, transactions_root},
        transaction::Transaction,
        transaction_result::TransactionResult,
        update_sets::StateUpdates,
    },
};

use super::{genesis::Genesis, write_batch::ChainWriteBatch, ChainError, ImportError};

/// The outcome of executing a block's transactions on top of the latest state, before the block is
/// finalized.
#[derive(Clone, Debug)]
pub struct ExecutedBlock {
    pub results: Vec<TransactionResult>,
    /// Every change to the account and delegate state, including the block reward.
    pub updates: StateUpdates,
    pub state_root: CryptoHash,
    pub results_root: CryptoHash,
}

/// A block built by the proposer: a header and the transactions it selected, already executed.
#[derive(Clone, Debug)]
pub struct BuiltBlock {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    pub executed: ExecutedBlock,
}

/// The canonical chain of finalized blocks, and the ledger state after the latest of them.
///
/// Every mutation of the store goes through [`put_block`](Self::put_block), which writes a block and
/// the state changes it causes in one atomic batch.
pub struct Blockchain<K: KVStore> {
    kv_store: K,
    chain_spec: ChainSpec,
}

impl<K: KVStore> Blockchain<K> {
    pub fn new(kv_store: K, chain_spec: ChainSpec) -> Self {
        Self {
            kv_store,
            chain_spec,
        }
    }

    pub fn chain_spec(&self) -> &ChainSpec {
        &self.chain_spec
    }

    /// Write the genesis block and the initial state, unless the store already holds a chain.
    pub fn initialize(&mut self, genesis: &Genesis) -> Result<(), ChainError> {
        if self.kv_store.latest_block_number()?.is_some() {
            return Ok(());
        }

        let (block, updates, validators) = {
            let snapshot = self.kv_store.snapshot();
            let mut accounts = AccountState::new(&snapshot);
            let mut delegates = DelegateState::new(&snapshot);

            for (address, amount) in &genesis.premine {
                accounts.adjust_available(address, *amount)?;
            }
            for (address, name) in &genesis.delegates {
                delegates.register(address, name.as_bytes(), 0)?;
            }
            let validators = delegates.validators(self.chain_spec.max_validators)?;

            let root = state_root(&CryptoHash::ZERO, &accounts.changes(), &delegates.changes());
            let header = BlockHeader::new(
                0,
                Address::EMPTY,
                CryptoHash::ZERO,
                genesis.timestamp,
                CryptoHash::EMPTY_H256,
                CryptoHash::EMPTY_H256,
                root,
                genesis.data.clone(),
            );
            let mut updates = accounts.into_updates();
            updates.merge(delegates.into_updates());
            (
                Block::new(header, Vec::new(), Vec::new(), 0, Vec::new()),
                updates,
                validators,
            )
        };

        let mut wb = ChainWriteBatch::new();
        wb.set_block(&block);
        wb.apply_state_updates(&updates);
        wb.set_validators(&validators);
        wb.set_latest_block_number(0);
        self.kv_store.write(wb.0)?;
        Ok(())
    }

    /* ↓↓↓ Reads ↓↓↓ */

    pub fn latest_block_number(&self) -> Result<u64, ChainError> {
        self.kv_store
            .latest_block_number()?
            .ok_or(ChainError::NotInitialized)
    }

    pub fn latest_header(&self) -> Result<BlockHeader, ChainError> {
        let number = self.latest_block_number()?;
        self.kv_store
            .block_header(number)?
            .ok_or(ChainError::KVGetError(KVGetError::ValueExpectedButNotFound {
                key: Key::BlockHeader { number },
            }))
    }

    pub fn header(&self, number: u64) -> Result<Option<BlockHeader>, ChainError> {
        Ok(self.kv_store.block_header(number)?)
    }

    pub fn block(&self, number: u64) -> Result<Option<Block>, ChainError> {
        Ok(self.kv_store.block(number)?)
    }

    pub fn block_by_hash(&self, hash: &CryptoHash) -> Result<Option<Block>, ChainError> {
        match self.kv_store.block_number(hash)? {
            Some(number) => self.block(number),
            None => Ok(None),
        }
    }

    pub fn transaction(&self, hash: &CryptoHash) -> Result<Option<Transaction>, ChainError> {
        let (number, index) = match self.kv_store.transaction_index(hash)? {
            Some(position) => position,
            None => return Ok(None),
        };
        Ok(self
            .kv_store
            .block_transactions(number)?
            .and_then(|mut txs| {
                if (index as usize) < txs.len() {
                    Some(txs.swap_remove(index as usize))
                } else {
                    None
                }
            }))
    }

    pub fn has_transaction(&self, hash: &CryptoHash) -> Result<bool, ChainError> {
        Ok(self.kv_store.transaction_index(hash)?.is_some())
    }

    /// Get the validators of the next block.
    pub fn validators(&self) -> Result<Vec<Address>, ChainError> {
        Ok(self.kv_store.validators()?)
    }

    pub fn account(&self, address: &Address) -> Result<Account, ChainError> {
        Ok(self.kv_store.account(address)?.unwrap_or_default())
    }

    pub fn delegate(&self, address: &Address) -> Result<Option<Delegate>, ChainError> {
        Ok(self.kv_store.delegate(address)?)
    }

    /* ↓↓↓ Execution ↓↓↓ */

    /// Execute `transactions` in a block described by `context`, on top of the latest state.
    ///
    /// Nothing is written: the returned [`ExecutedBlock`] holds the state changes until the block is
    /// [put](Self::put_block).
    pub fn execute_block<V: Vm>(
        &self,
        context: &BlockContext,
        transactions: &[Transaction],
        vm: &mut V,
    ) -> Result<ExecutedBlock, ChainError> {
        let parent_root = self.latest_header()?.state_root;

        let snapshot = self.kv_store.snapshot();
        let mut accounts = AccountState::new(&snapshot);
        let mut delegates = DelegateState::new(&snapshot);

        let results = TransactionExecutor::new(&self.chain_spec).execute(
            transactions,
            &mut accounts,
            &mut delegates,
            context,
            vm,
        )?;

        self.finish_block(context, transactions, results, accounts, delegates, &parent_root)
    }

    /// Build a block on top of the latest block, selecting greedily from `candidates` in order.
    ///
    /// A candidate is skipped if it would be rejected, if its timestamp is too far from `timestamp`,
    /// or if including it would take the block over the transactions size or gas limits.
    pub fn build_block<V: Vm>(
        &self,
        coinbase: Address,
        timestamp: u64,
        candidates: Vec<Transaction>,
        vm: &mut V,
    ) -> Result<BuiltBlock, ChainError> {
        let parent = self.latest_header()?;
        let context = BlockContext {
            number: parent.number + 1,
            coinbase,
            timestamp,
            parent_hash: parent.hash,
            gas_limit: self.chain_spec.max_block_gas,
        };

        let snapshot = self.kv_store.snapshot();
        let mut accounts = AccountState::new(&snapshot);
        let mut delegates = DelegateState::new(&snapshot);
        let executor = TransactionExecutor::new(&self.chain_spec);

        let mut transactions = Vec::new();
        let mut results = Vec::new();
        let mut size = 0;
        let mut gas = 0;
        for tx in candidates {
            if !self.is_within_time_drift(&tx, timestamp) {
                continue;
            }
            let tx_size = tx.size();
            let tx_gas = if tx.tx_type.is_vm() { tx.gas } else { 0 };
            if size + tx_size > self.chain_spec.max_block_transactions_size
                || gas + tx_gas > self.chain_spec.max_block_gas
            {
                continue;
            }

            // A rejected transaction leaves the state untouched, so it can simply be left out.
            let result = executor.execute_one(&tx, &mut accounts, &mut delegates, &context, vm)?;
            if result.code.is_rejected() {
                continue;
            }

            size += tx_size;
            gas += tx_gas;
            transactions.push(tx);
            results.push(result);
        }

        let executed = self.finish_block(
            &context,
            &transactions,
            results,
            accounts,
            delegates,
            &parent.state_root,
        )?;
        let header = BlockHeader::new(
            context.number,
            coinbase,
            parent.hash,
            timestamp,
            transactions_root(&transactions),
            executed.results_root,
            executed.state_root,
            Vec::new(),
        );

        Ok(BuiltBlock {
            header,
            transactions,
            executed,
        })
    }

    /// Credit the block reward and fees to the coinbase, then compute the roots.
    fn finish_block<R: KVGet>(
        &self,
        context: &BlockContext,
        transactions: &[Transaction],
        results: Vec<TransactionResult>,
        mut accounts: AccountState<R>,
        delegates: DelegateState<R>,
        parent_root: &CryptoHash,
    ) -> Result<ExecutedBlock, ChainError> {
        let fees = transactions
            .iter()
            .zip(&results)
            .map(|(tx, result)| charged_fee(tx, result))
            .collect::<Result<Vec<Amount>, _>>()
            .map_err(|_| ChainError::Overflow)?;
        let reward = Amount::sum(fees)
            .and_then(|fees| fees.checked_add(self.chain_spec.block_reward(context.number)))
            .map_err(|_| ChainError::Overflow)?;
        if !reward.is_zero() {
            accounts.adjust_available(&context.coinbase, reward)?;
        }

        let state_root = state_root(parent_root, &accounts.changes(), &delegates.changes());
        let mut updates = accounts.into_updates();
        updates.merge(delegates.into_updates());

        Ok(ExecutedBlock {
            results_root: results_root(&results),
            results,
            updates,
            state_root,
        })
    }

    /// Check that `header` and `transactions` form a valid next block, and execute them.
    ///
    /// The block is valid if its header extends the latest header, its transactions are valid,
    /// committed to by its transactions root, and timestamped within the maximum transaction time
    /// drift of the block, none of them has been included before or is rejected on execution, and its
    /// results root and state root match the ones computed locally.
    pub fn validate_block<V: Vm>(
        &self,
        header: &BlockHeader,
        transactions: &[Transaction],
        vm: &mut V,
    ) -> Result<ExecutedBlock, ImportError> {
        let parent = self.latest_header()?;
        if !Block::validate_header(
            header,
            &parent,
            now_ms(),
            self.chain_spec.max_block_time_drift_ms,
        ) {
            return Err(ImportError::InvalidHeader);
        }
        if !Block::validate_transactions(header, transactions, self.chain_spec.network) {
            return Err(ImportError::InvalidTransactions);
        }
        for tx in transactions {
            if !self.is_within_time_drift(tx, header.timestamp) {
                return Err(ImportError::TransactionTimeDrift(tx.hash));
            }
            if self.has_transaction(&tx.hash)? {
                return Err(ImportError::DuplicateTransaction(tx.hash));
            }
        }

        let context = BlockContext {
            number: header.number,
            coinbase: header.coinbase,
            timestamp: header.timestamp,
            parent_hash: header.parent_hash,
            gas_limit: self.chain_spec.max_block_gas,
        };
        let executed = self.execute_block(&context, transactions, vm)?;

        if executed.results.iter().any(|result| result.code.is_rejected()) {
            return Err(ImportError::RejectedTransaction);
        }
        if !Block::validate_results(header, &executed.results) {
            return Err(ImportError::ResultsMismatch);
        }
        if executed.state_root != header.state_root {
            return Err(ImportError::StateRootMismatch);
        }
        Ok(executed)
    }

    fn is_within_time_drift(&self, tx: &Transaction, block_timestamp: u64) -> bool {
        tx.timestamp.abs_diff(block_timestamp) <= self.chain_spec.max_transaction_time_drift_ms
    }

    /// Validate a finalized block received from a peer, including its votes, and put it.
    pub fn import_block<V: Vm>(
        &mut self,
        block: &Block,
        vm: &mut V,
    ) -> Result<Option<Vec<Address>>, ImportError> {
        let latest = self.latest_block_number()?;
        if block.number() != latest + 1 {
            return Err(ImportError::NotNext {
                expected: latest + 1,
                actual: block.number(),
            });
        }

        let validators = self.validators()?;
        if !Block::validate_votes(block, &validators) {
            return Err(ImportError::InvalidVotes);
        }

        let executed = self.validate_block(&block.header, &block.transactions, vm)?;
        if executed.results != block.results {
            return Err(ImportError::ResultsMismatch);
        }

        Ok(self.put_block(block, &executed.updates)?)
    }

    /* ↓↓↓ Writes ↓↓↓ */

    /// Atomically write `block`, the state `updates` its execution caused, and (at validator update
    /// checkpoints) the re-computed validator list.
    ///
    /// Returns the new validator list if it was re-computed.
    pub fn put_block(
        &mut self,
        block: &Block,
        updates: &StateUpdates,
    ) -> Result<Option<Vec<Address>>, ChainError> {
        let mut wb = ChainWriteBatch::new();
        wb.set_block(block);
        wb.apply_state_updates(updates);
        wb.set_latest_block_number(block.number());

        let new_validators = if self.chain_spec.is_validator_update_checkpoint(block.number()) {
            let snapshot = self.kv_store.snapshot();
            let validators = DelegateState::with_updates(&snapshot, updates)
                .validators(self.chain_spec.max_validators)?;
            wb.set_validators(&validators);
            Some(validators)
        } else {
            None
        };

        self.kv_store.write(wb.0)?;
        debug!("Put block {} ({})", block.number(), block.hash());
        Ok(new_validators)
    }
}

/// Milliseconds since the Unix Epoch, according to the local clock.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

impl From<StateError> for ChainError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::KVGetError(err) => ChainError::KVGetError(err),
            StateError::InsufficientBalance => ChainError::InsufficientBalance,
            StateError::Overflow => ChainError::Overflow,
        }
    }
}
