/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the events a node emits, for event handling and logging.
//!
//! An event for a given action indicates that the action has been completed. Every event carries the
//! time it was emitted.
//!
//! Events are sent over a channel created when the node starts, and handled on the
//! [event bus](crate::event_bus) thread, so a slow handler never stalls consensus.

use std::{
    sync::mpsc::Sender,
    time::{Duration, SystemTime},
};

use crate::{
    bft::{
        implementation::State,
        types::{Proposal, Vote, VoteType},
    },
    types::{
        block::Block,
        data_types::{Address, CryptoHash},
    },
};

pub enum Event {
    // Events that change persistent state.
    FinalizeBlock(FinalizeBlockEvent),
    UpdateValidators(UpdateValidatorsEvent),
    // Events that involve broadcasting a consensus message.
    Propose(ProposeEvent),
    Vote(VoteEvent),
    // Events that involve receiving a consensus message.
    ReceiveProposal(ReceiveProposalEvent),
    ReceiveVote(ReceiveVoteEvent),
    // Progress events.
    NewHeight(NewHeightEvent),
    NewView(NewViewEvent),
    ViewTimeout(ViewTimeoutEvent),
    // Byzantine behaviour.
    Equivocation(EquivocationEvent),
    // Sync events.
    StartSync(StartSyncEvent),
    EndSync(EndSyncEvent),
    ReceiveBlockRequest(ReceiveBlockRequestEvent),
    // The engine stopped for good.
    Halt(HaltEvent),
}

impl Event {
    /// Send the event to the event bus, if the node has one.
    pub(crate) fn publish(self, event_publisher: &Option<Sender<Event>>) {
        if let Some(event_publisher) = event_publisher {
            // The event bus only hangs up when the node is shutting down.
            let _ = event_publisher.send(self);
        }
    }
}

pub struct FinalizeBlockEvent {
    pub timestamp: SystemTime,
    pub block: Block,
}

pub struct UpdateValidatorsEvent {
    pub timestamp: SystemTime,
    pub cause_block: CryptoHash,
    pub validators: Vec<Address>,
}

pub struct ProposeEvent {
    pub timestamp: SystemTime,
    pub proposal: Proposal,
}

pub struct VoteEvent {
    pub timestamp: SystemTime,
    pub vote: Vote,
}

pub struct ReceiveProposalEvent {
    pub timestamp: SystemTime,
    pub origin: Address,
    pub proposal: Proposal,
}

pub struct ReceiveVoteEvent {
    pub timestamp: SystemTime,
    pub origin: Address,
    pub vote: Vote,
}

pub struct NewHeightEvent {
    pub timestamp: SystemTime,
    pub height: u64,
    pub validators: Vec<Address>,
}

/// The engine moved to `view` of `height`, and `primary` is expected to propose.
pub struct NewViewEvent {
    pub timestamp: SystemTime,
    pub height: u64,
    pub view: u32,
    pub primary: Option<Address>,
}

pub struct ViewTimeoutEvent {
    pub timestamp: SystemTime,
    pub height: u64,
    pub view: u32,
    pub state: State,
    pub timeout: Duration,
}

pub struct EquivocationEvent {
    pub timestamp: SystemTime,
    pub validator: Address,
    pub vote_type: VoteType,
    pub height: u64,
    pub view: u32,
}

pub struct StartSyncEvent {
    pub timestamp: SystemTime,
    pub height: u64,
    pub target: u64,
}

pub struct EndSyncEvent {
    pub timestamp: SystemTime,
    pub blocks_synced: u64,
    pub reached_target: bool,
}

pub struct ReceiveBlockRequestEvent {
    pub timestamp: SystemTime,
    pub peer: Address,
    pub number: u64,
    pub header_only: bool,
}

pub struct HaltEvent {
    pub timestamp: SystemTime,
    pub height: u64,
    pub reason: String,
}
