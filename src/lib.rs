/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A Rust library that implements the core of a delegated-stake BFT blockchain node.
//!
//! The library replicates a ledger of accounts and delegates across a set of validators. Each height
//! is decided by a six-stage BFT state machine (`NEW_HEIGHT → PROPOSE → VALIDATE → PRE_COMMIT →
//! COMMIT → FINALIZE`) that retries in increasing views until a block gathers a quorum of votes.
//! Validators are the top delegates by vote tally, re-computed at fixed checkpoint heights.
//!
//! The library user plugs in:
//! 1. A [key-value store](state::pluggables::KVStore) for durable storage of blocks and state.
//! 2. A [network](networking::network::Network) that delivers messages between peers.
//! 3. A [virtual machine](executor::vm::Vm) that executes contract code.
//!
//! and then starts a [node](node::NodeSpec) with them.

pub mod types;

pub mod state;

pub mod executor;

pub mod chain;

pub mod bft;

pub mod networking;

pub mod block_sync;

pub mod pending;

pub mod config;

pub mod events;

pub(crate) mod event_bus;

pub mod logging;

pub mod node;
