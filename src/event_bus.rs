/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The event bus thread, which fires the handlers registered for each [`Event`].

use std::{
    sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError},
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{events::*, logging::Logger};

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send>;

/// How long the event bus waits for an event before checking for the shutdown signal again.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub(crate) struct EventHandlers {
    pub(crate) finalize_block_handlers: Vec<HandlerPtr<FinalizeBlockEvent>>,
    pub(crate) update_validators_handlers: Vec<HandlerPtr<UpdateValidatorsEvent>>,
    pub(crate) propose_handlers: Vec<HandlerPtr<ProposeEvent>>,
    pub(crate) vote_handlers: Vec<HandlerPtr<VoteEvent>>,
    pub(crate) receive_proposal_handlers: Vec<HandlerPtr<ReceiveProposalEvent>>,
    pub(crate) receive_vote_handlers: Vec<HandlerPtr<ReceiveVoteEvent>>,
    pub(crate) new_height_handlers: Vec<HandlerPtr<NewHeightEvent>>,
    pub(crate) new_view_handlers: Vec<HandlerPtr<NewViewEvent>>,
    pub(crate) view_timeout_handlers: Vec<HandlerPtr<ViewTimeoutEvent>>,
    pub(crate) equivocation_handlers: Vec<HandlerPtr<EquivocationEvent>>,
    pub(crate) start_sync_handlers: Vec<HandlerPtr<StartSyncEvent>>,
    pub(crate) end_sync_handlers: Vec<HandlerPtr<EndSyncEvent>>,
    pub(crate) receive_block_request_handlers: Vec<HandlerPtr<ReceiveBlockRequestEvent>>,
    pub(crate) halt_handlers: Vec<HandlerPtr<HaltEvent>>,
}

/// Collect the default logger of an event type (if `log_events`), followed by the user's handler.
fn handlers<T: Logger>(log_events: bool, user_handler: Option<HandlerPtr<T>>) -> Vec<HandlerPtr<T>> {
    let mut handlers = Vec::new();
    if log_events {
        handlers.push(T::get_logger());
    }
    handlers.extend(user_handler);
    handlers
}

impl EventHandlers {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        log_events: bool,
        finalize_block_handler: Option<HandlerPtr<FinalizeBlockEvent>>,
        update_validators_handler: Option<HandlerPtr<UpdateValidatorsEvent>>,
        propose_handler: Option<HandlerPtr<ProposeEvent>>,
        vote_handler: Option<HandlerPtr<VoteEvent>>,
        receive_proposal_handler: Option<HandlerPtr<ReceiveProposalEvent>>,
        receive_vote_handler: Option<HandlerPtr<ReceiveVoteEvent>>,
        new_height_handler: Option<HandlerPtr<NewHeightEvent>>,
        new_view_handler: Option<HandlerPtr<NewViewEvent>>,
        view_timeout_handler: Option<HandlerPtr<ViewTimeoutEvent>>,
        equivocation_handler: Option<HandlerPtr<EquivocationEvent>>,
        start_sync_handler: Option<HandlerPtr<StartSyncEvent>>,
        end_sync_handler: Option<HandlerPtr<EndSyncEvent>>,
        receive_block_request_handler: Option<HandlerPtr<ReceiveBlockRequestEvent>>,
        halt_handler: Option<HandlerPtr<HaltEvent>>,
    ) -> EventHandlers {
        EventHandlers {
            finalize_block_handlers: handlers(log_events, finalize_block_handler),
            update_validators_handlers: handlers(log_events, update_validators_handler),
            propose_handlers: handlers(log_events, propose_handler),
            vote_handlers: handlers(log_events, vote_handler),
            receive_proposal_handlers: handlers(log_events, receive_proposal_handler),
            receive_vote_handlers: handlers(log_events, receive_vote_handler),
            new_height_handlers: handlers(log_events, new_height_handler),
            new_view_handlers: handlers(log_events, new_view_handler),
            view_timeout_handlers: handlers(log_events, view_timeout_handler),
            equivocation_handlers: handlers(log_events, equivocation_handler),
            start_sync_handlers: handlers(log_events, start_sync_handler),
            end_sync_handlers: handlers(log_events, end_sync_handler),
            receive_block_request_handlers: handlers(log_events, receive_block_request_handler),
            halt_handlers: handlers(log_events, halt_handler),
        }
    }

    /// Whether no handler is registered for any event, in which case the node does not start an event
    /// bus at all.
    pub(crate) fn is_empty(&self) -> bool {
        self.finalize_block_handlers.is_empty()
            && self.update_validators_handlers.is_empty()
            && self.propose_handlers.is_empty()
            && self.vote_handlers.is_empty()
            && self.receive_proposal_handlers.is_empty()
            && self.receive_vote_handlers.is_empty()
            && self.new_height_handlers.is_empty()
            && self.new_view_handlers.is_empty()
            && self.view_timeout_handlers.is_empty()
            && self.equivocation_handlers.is_empty()
            && self.start_sync_handlers.is_empty()
            && self.end_sync_handlers.is_empty()
            && self.receive_block_request_handlers.is_empty()
            && self.halt_handlers.is_empty()
    }

    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::FinalizeBlock(finalize_block_event) => self
                .finalize_block_handlers
                .iter()
                .for_each(|handler| handler(&finalize_block_event)),

            Event::UpdateValidators(update_validators_event) => self
                .update_validators_handlers
                .iter()
                .for_each(|handler| handler(&update_validators_event)),

            Event::Propose(propose_event) => self
                .propose_handlers
                .iter()
                .for_each(|handler| handler(&propose_event)),

            Event::Vote(vote_event) => self
                .vote_handlers
                .iter()
                .for_each(|handler| handler(&vote_event)),

            Event::ReceiveProposal(receive_proposal_event) => self
                .receive_proposal_handlers
                .iter()
                .for_each(|handler| handler(&receive_proposal_event)),

            Event::ReceiveVote(receive_vote_event) => self
                .receive_vote_handlers
                .iter()
                .for_each(|handler| handler(&receive_vote_event)),

            Event::NewHeight(new_height_event) => self
                .new_height_handlers
                .iter()
                .for_each(|handler| handler(&new_height_event)),

            Event::NewView(new_view_event) => self
                .new_view_handlers
                .iter()
                .for_each(|handler| handler(&new_view_event)),

            Event::ViewTimeout(view_timeout_event) => self
                .view_timeout_handlers
                .iter()
                .for_each(|handler| handler(&view_timeout_event)),

            Event::Equivocation(equivocation_event) => self
                .equivocation_handlers
                .iter()
                .for_each(|handler| handler(&equivocation_event)),

            Event::StartSync(start_sync_event) => self
                .start_sync_handlers
                .iter()
                .for_each(|handler| handler(&start_sync_event)),

            Event::EndSync(end_sync_event) => self
                .end_sync_handlers
                .iter()
                .for_each(|handler| handler(&end_sync_event)),

            Event::ReceiveBlockRequest(receive_block_request_event) => self
                .receive_block_request_handlers
                .iter()
                .for_each(|handler| handler(&receive_block_request_event)),

            Event::Halt(halt_event) => self
                .halt_handlers
                .iter()
                .for_each(|handler| handler(&halt_event)),
        }
    }
}

pub(crate) fn start_event_bus(
    event_handlers: EventHandlers,
    event_subscriber: Receiver<Event>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => return,
            Err(TryRecvError::Empty) => (),
        }

        match event_subscriber.recv_timeout(POLL_INTERVAL) {
            Ok(event) => event_handlers.fire_handlers(event),
            Err(RecvTimeoutError::Timeout) => (),
            // Every publisher has shut down; wait for the shutdown signal.
            Err(RecvTimeoutError::Disconnected) => thread::sleep(POLL_INTERVAL),
        }
    })
}
