/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Pluggable peer-to-peer (P2P) networking.
//!
//! The library user provides a [`Network`](network::Network) implementation. The node then runs a
//! poller thread (see [`receiving`]) that takes messages out of it and hands each to the thread that
//! processes it:
//!
//! | Messages                                | Processed by                                      |
//! |-----------------------------------------|---------------------------------------------------|
//! | `NewHeight`, `NewView`, `Proposal`, `Vote` | The consensus engine.                          |
//! | `GetBlock`, `GetBlockHeader`            | The [block server](crate::block_sync::server).    |
//! | `Block`, `BlockHeader`                  | The [sync client](crate::block_sync::client).     |
//! | `Transaction`                           | The [pending pool](crate::pending), via the engine. |

pub mod network;

pub mod messages;

pub(crate) mod receiving;

pub(crate) mod sending;
