/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Parameters of the chain, and of the local node.
//!
//! Two kinds of parameter are kept apart:
//! 1. [`ChainSpec`]: consensus-critical parameters. Every node in a network must use the same
//!    `ChainSpec`, or nodes will disagree on which blocks are valid.
//! 2. [`Configuration`]: node-local parameters, such as the node's own signing key and how long it
//!    waits in each consensus state. These may differ from node to node.
//!
//! Both are constructed with the builder pattern, for example:
//!
//! ```ignore
//! let configuration =
//!     Configuration::builder()
//!     .me(signing_key)
//!     .timeouts(BftTimeouts::default())
//!     .sync_timeout(Duration::from_secs(30))
//!     .log_events(true)
//!     .build()
//! ```

use std::time::Duration;

use ed25519_dalek::SigningKey;
use typed_builder::TypedBuilder;

use crate::types::{
    amount::{Amount, Unit},
    data_types::NetworkId,
};

/// One step of the block reward schedule: blocks numbered up to and including `until` are rewarded
/// with `reward`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewardTier {
    pub until: u64,
    pub reward: Amount,
}

/// Consensus-critical parameters of a chain.
#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [ChainSpec]. Every setter is required, except for the two fork
    flags, which default to `false`. The presets [`ChainSpec::mainnet`], [`ChainSpec::testnet`], and
    [`ChainSpec::devnet`] are usually a better starting point.
"))]
pub struct ChainSpec {
    #[builder(setter(doc = "Set the network that transactions must be signed for. Required."))]
    pub network: NetworkId,
    #[builder(setter(doc = "Set the block reward schedule, in increasing order of `until`. Blocks past the last tier earn no reward. Required."))]
    pub reward_schedule: Vec<RewardTier>,
    #[builder(setter(doc = "Set the smallest fee that a non-VM transaction may pay. Required."))]
    pub min_transaction_fee: Amount,
    #[builder(setter(doc = "Set the smallest amount that registering a delegate must burn. Required."))]
    pub min_delegate_burn_amount: Amount,
    #[builder(setter(doc = "Set the number of blocks between re-computations of the validator list. Required."))]
    pub validator_update_interval: u64,
    #[builder(setter(doc = "Set the maximum number of validators. Required."))]
    pub max_validators: usize,
    #[builder(setter(doc = "Set the maximum total encoded size of the transactions in a block. Required."))]
    pub max_block_transactions_size: usize,
    #[builder(setter(doc = "Set the maximum total gas limit of the VM transactions in a block. Required."))]
    pub max_block_gas: u64,
    #[builder(setter(doc = "Set the smallest gas price that a VM transaction may offer. Required."))]
    pub min_gas_price: Amount,
    #[builder(setter(doc = "Set how far (in milliseconds) a transaction's timestamp may be from the local clock for it to enter the pending pool. Required."))]
    pub max_transaction_time_drift_ms: u64,
    #[builder(setter(doc = "Set how far (in milliseconds) ahead of the local clock a block's timestamp may be. Required."))]
    pub max_block_time_drift_ms: u64,
    #[builder(default, setter(doc = "Activate the uniform distribution fork, which changes how proposers are selected. Optional."))]
    pub uniform_distribution: bool,
    #[builder(default, setter(doc = "Activate the virtual machine fork, which enables CREATE and CALL transactions. Optional."))]
    pub virtual_machine: bool,
}

impl ChainSpec {
    /// Get the reward for producing block `number`. The genesis block has no reward.
    pub fn block_reward(&self, number: u64) -> Amount {
        if number == 0 {
            return Amount::ZERO;
        }
        self.reward_schedule
            .iter()
            .find(|tier| number <= tier.until)
            .map(|tier| tier.reward)
            .unwrap_or(Amount::ZERO)
    }

    /// Whether the validator list is re-computed after block `number`.
    pub fn is_validator_update_checkpoint(&self, number: u64) -> bool {
        self.validator_update_interval != 0 && number % self.validator_update_interval == 0
    }

    pub fn mainnet() -> ChainSpec {
        ChainSpec::builder()
            .network(NetworkId::MAINNET)
            .reward_schedule(vec![
                RewardTier {
                    until: 25_000_000,
                    reward: coins(3),
                },
                RewardTier {
                    until: 50_000_000,
                    reward: Amount::new(coins(3).nano() / 2),
                },
                RewardTier {
                    until: 75_000_000,
                    reward: Amount::new(coins(3).nano() / 4),
                },
            ])
            .min_transaction_fee(Amount::new(5 * Unit::Milli.factor()))
            .min_delegate_burn_amount(coins(1_000))
            .validator_update_interval(200)
            .max_validators(100)
            .max_block_transactions_size(1024 * 1024)
            .max_block_gas(10_000_000)
            .min_gas_price(Amount::new(10))
            .max_transaction_time_drift_ms(2 * 60 * 60 * 1000)
            .max_block_time_drift_ms(30 * 1000)
            .uniform_distribution(true)
            .virtual_machine(true)
            .build()
    }

    pub fn testnet() -> ChainSpec {
        ChainSpec {
            network: NetworkId::TESTNET,
            ..ChainSpec::mainnet()
        }
    }

    /// Parameters for local development networks: small validator sets, frequent validator updates.
    pub fn devnet() -> ChainSpec {
        ChainSpec {
            network: NetworkId::DEVNET,
            validator_update_interval: 10,
            max_validators: 16,
            ..ChainSpec::mainnet()
        }
    }
}

fn coins(n: i64) -> Amount {
    Amount::new(n * Unit::Coin.factor())
}

/// How long the consensus engine stays in each state before it times out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BftTimeouts {
    pub new_height: Duration,
    pub propose: Duration,
    pub validate: Duration,
    pub pre_commit: Duration,
    pub commit: Duration,
    pub finalize: Duration,
}

impl Default for BftTimeouts {
    fn default() -> Self {
        BftTimeouts {
            new_height: Duration::from_secs(3),
            propose: Duration::from_secs(12),
            validate: Duration::from_secs(6),
            pre_commit: Duration::from_secs(6),
            commit: Duration::from_secs(3),
            finalize: Duration::from_secs(3),
        }
    }
}

impl BftTimeouts {
    /// The same `timeout` for every state. Useful in tests.
    pub fn uniform(timeout: Duration) -> Self {
        BftTimeouts {
            new_height: timeout,
            propose: timeout,
            validate: timeout,
            pre_commit: timeout,
            commit: timeout,
            finalize: timeout,
        }
    }
}

/// Node-local parameters.
///
/// ## Log Events
///
/// This library logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
/// printed onto a terminal or to a file, set up a [logging
/// implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. On the builder call the following methods to
    construct a valid [Configuration].

    Required:
    - `.me(...)`
    - `.log_events(...)`

    Optional:
    - `.timeouts(...)`
    - `.sync_timeout(...)`
    - `.sync_request_timeout(...)`
    - `.max_pending_transactions(...)`
"))]
pub struct Configuration {
    #[builder(setter(doc = "Set the node's signing key, used to sign proposals and votes. Required."))]
    pub me: SigningKey,
    #[builder(default, setter(doc = "Set how long the consensus engine stays in each state. Optional; defaults to [`BftTimeouts::default`]."))]
    pub timeouts: BftTimeouts,
    #[builder(default = Duration::from_secs(60), setter(doc = "Set the longest time that one round of syncing may take. Optional."))]
    pub sync_timeout: Duration,
    #[builder(default = Duration::from_secs(5), setter(doc = "Set how long the sync client waits for a peer to send a requested block. Optional."))]
    pub sync_request_timeout: Duration,
    #[builder(default = 10_000, setter(doc = "Set the largest number of transactions the pending pool holds. Optional."))]
    pub max_pending_transactions: usize,
    #[builder(setter(doc = "Enable logging? Required."))]
    pub log_events: bool,
}
