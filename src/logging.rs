/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the node's
//! [configuration](crate::config::Configuration).
//!
//! The library logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how a [ReceiveProposal](crate::events::ReceiveProposalEvent) is printed:
//!
//! ```text
//! ReceiveProposal, 1701329264, Id5u7f6, fNGCJyk, 12, 0
//! ```
//!
//! In the snippet:
//! - The third value is the first seven characters of the Base64 encoding of the address of the
//!   origin of the proposal.
//! - The fourth value is the first seven characters of the Base64 encoding of the hash of the proposed
//!   block.
//! - The fifth and sixth values are the height and view of the proposal.

use std::time::SystemTime;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};

use crate::events::*;

// Names of each event in PascalCase for printing:
pub const FINALIZE_BLOCK: &str = "FinalizeBlock";
pub const UPDATE_VALIDATORS: &str = "UpdateValidators";

pub const PROPOSE: &str = "Propose";
pub const VOTE: &str = "Vote";

pub const RECEIVE_PROPOSAL: &str = "ReceiveProposal";
pub const RECEIVE_VOTE: &str = "ReceiveVote";

pub const NEW_HEIGHT: &str = "NewHeight";
pub const NEW_VIEW: &str = "NewView";
pub const VIEW_TIMEOUT: &str = "ViewTimeout";

pub const EQUIVOCATION: &str = "Equivocation";

pub const START_SYNC: &str = "StartSync";
pub const END_SYNC: &str = "EndSync";
pub const RECEIVE_BLOCK_REQUEST: &str = "ReceiveBlockRequest";

pub const HALT: &str = "Halt";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for FinalizeBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |finalize_block_event: &FinalizeBlockEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                FINALIZE_BLOCK,
                secs_since_unix_epoch(finalize_block_event.timestamp),
                first_seven_base64_chars(&finalize_block_event.block.hash().bytes()),
                finalize_block_event.block.number(),
                finalize_block_event.block.view,
                finalize_block_event.block.transactions.len()
            )
        };
        Box::new(logger)
    }
}

impl Logger for UpdateValidatorsEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |update_validators_event: &UpdateValidatorsEvent| {
            log::info!(
                "{}, {}, {}, {}",
                UPDATE_VALIDATORS,
                secs_since_unix_epoch(update_validators_event.timestamp),
                first_seven_base64_chars(&update_validators_event.cause_block.bytes()),
                update_validators_event.validators.len()
            )
        };
        Box::new(logger)
    }
}

impl Logger for ProposeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |propose_event: &ProposeEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                PROPOSE,
                secs_since_unix_epoch(propose_event.timestamp),
                first_seven_base64_chars(&propose_event.proposal.header.hash.bytes()),
                propose_event.proposal.height(),
                propose_event.proposal.view()
            )
        };
        Box::new(logger)
    }
}

impl Logger for VoteEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |vote_event: &VoteEvent| {
            log::info!(
                "{}, {}, {:?}, {}, {}, {}",
                VOTE,
                secs_since_unix_epoch(vote_event.timestamp),
                vote_event.vote.vote_type,
                vote_event.vote.approve,
                first_seven_base64_chars(&vote_event.vote.block_hash.bytes()),
                vote_event.vote.view
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReceiveProposalEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |receive_proposal_event: &ReceiveProposalEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                RECEIVE_PROPOSAL,
                secs_since_unix_epoch(receive_proposal_event.timestamp),
                first_seven_base64_chars(&receive_proposal_event.origin.bytes()),
                first_seven_base64_chars(&receive_proposal_event.proposal.header.hash.bytes()),
                receive_proposal_event.proposal.height(),
                receive_proposal_event.proposal.view()
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReceiveVoteEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |receive_vote_event: &ReceiveVoteEvent| {
            log::info!(
                "{}, {}, {}, {:?}, {}, {}",
                RECEIVE_VOTE,
                secs_since_unix_epoch(receive_vote_event.timestamp),
                first_seven_base64_chars(&receive_vote_event.origin.bytes()),
                receive_vote_event.vote.vote_type,
                receive_vote_event.vote.approve,
                first_seven_base64_chars(&receive_vote_event.vote.block_hash.bytes())
            )
        };
        Box::new(logger)
    }
}

impl Logger for NewHeightEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |new_height_event: &NewHeightEvent| {
            log::info!(
                "{}, {}, {}, {}",
                NEW_HEIGHT,
                secs_since_unix_epoch(new_height_event.timestamp),
                new_height_event.height,
                new_height_event.validators.len()
            )
        };
        Box::new(logger)
    }
}

impl Logger for NewViewEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |new_view_event: &NewViewEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                NEW_VIEW,
                secs_since_unix_epoch(new_view_event.timestamp),
                new_view_event.height,
                new_view_event.view,
                match &new_view_event.primary {
                    Some(primary) => first_seven_base64_chars(&primary.bytes()),
                    None => String::from("-"),
                }
            )
        };
        Box::new(logger)
    }
}

impl Logger for ViewTimeoutEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |view_timeout_event: &ViewTimeoutEvent| {
            log::info!(
                "{}, {}, {}, {}, {:?}, {}",
                VIEW_TIMEOUT,
                secs_since_unix_epoch(view_timeout_event.timestamp),
                view_timeout_event.height,
                view_timeout_event.view,
                view_timeout_event.state,
                view_timeout_event.timeout.as_millis()
            )
        };
        Box::new(logger)
    }
}

impl Logger for EquivocationEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |equivocation_event: &EquivocationEvent| {
            log::warn!(
                "{}, {}, {}, {:?}, {}, {}",
                EQUIVOCATION,
                secs_since_unix_epoch(equivocation_event.timestamp),
                first_seven_base64_chars(&equivocation_event.validator.bytes()),
                equivocation_event.vote_type,
                equivocation_event.height,
                equivocation_event.view
            )
        };
        Box::new(logger)
    }
}

impl Logger for StartSyncEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |start_sync_event: &StartSyncEvent| {
            log::info!(
                "{}, {}, {}, {}",
                START_SYNC,
                secs_since_unix_epoch(start_sync_event.timestamp),
                start_sync_event.height,
                start_sync_event.target
            )
        };
        Box::new(logger)
    }
}

impl Logger for EndSyncEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |end_sync_event: &EndSyncEvent| {
            log::info!(
                "{}, {}, {}, {}",
                END_SYNC,
                secs_since_unix_epoch(end_sync_event.timestamp),
                end_sync_event.blocks_synced,
                end_sync_event.reached_target
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReceiveBlockRequestEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |receive_block_request_event: &ReceiveBlockRequestEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                RECEIVE_BLOCK_REQUEST,
                secs_since_unix_epoch(receive_block_request_event.timestamp),
                first_seven_base64_chars(&receive_block_request_event.peer.bytes()),
                receive_block_request_event.number,
                receive_block_request_event.header_only
            )
        };
        Box::new(logger)
    }
}

impl Logger for HaltEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |halt_event: &HaltEvent| {
            log::error!(
                "{}, {}, {}, {}",
                HALT,
                secs_since_unix_epoch(halt_event.timestamp),
                halt_event.height,
                halt_event.reason
            )
        };
        Box::new(logger)
    }
}

fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}
