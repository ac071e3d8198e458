/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The BFT consensus engine.
//!
//! Each height is decided in one or more views. A view runs through six states:
//!
//! | State        | On entry                                            | Leaves early when                 |
//! |--------------|-----------------------------------------------------|-----------------------------------|
//! | `NEW_HEIGHT` | Broadcast `NewHeight`, collect peers' heights.      | A quorum of peers is ahead (sync).|
//! | `PROPOSE`    | The primary builds and broadcasts a [`Proposal`](types::Proposal). |                    |
//! | `VALIDATE`   | Vote `VALIDATE` on the proposal.                    | `VALIDATE` quorum.                |
//! | `PRE_COMMIT` | Vote `PRE_COMMIT` approve if `VALIDATE` reached a quorum, else reject. | `PRE_COMMIT` quorum. |
//! | `COMMIT`     | Vote `COMMIT` on the block.                         | `COMMIT` quorum.                  |
//! | `FINALIZE`   | Persist the block with its `PRE_COMMIT` approvals.  |                                   |
//!
//! A quorum of `PRE_COMMIT` rejections moves every validator to the next view, and the rejections
//! become the [`Proof`](types::Proof) that justifies the new view to validators that fell behind.
//! Once a block gathers a `PRE_COMMIT` quorum it is final: a node in `COMMIT` finalizes it at the
//! latest when the state times out.
//!
//! The engine runs on its own thread (see [`implementation`]), and is the only writer of the chain.

pub mod types;

pub mod vote_set;

pub mod validator_selection;

pub mod implementation;
