/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions and types for sending messages to the P2P network.

use crate::types::data_types::Address;

use super::{
    messages::Message,
    network::{active_validator_channels, Network},
};

/// Handle for sending and broadcasting messages to the [`Network`], and for telling it about
/// validators and misbehaving peers.
///
/// It can be used to send or broadcast instances of any type that implement the [`Into<Message>`]
/// trait.
#[derive(Clone)]
pub(crate) struct SenderHandle<N: Network> {
    network: N,
}

impl<N: Network> SenderHandle<N> {
    pub(crate) fn new(network: N) -> Self {
        Self { network }
    }

    pub(crate) fn send<S: Into<Message>>(&mut self, peer: Address, msg: S) {
        self.network.send(peer, msg.into())
    }

    pub(crate) fn broadcast<S: Into<Message>>(&mut self, msg: S) {
        self.network.broadcast(msg.into())
    }

    pub(crate) fn report_misbehavior(&mut self, peer: Address) {
        self.network.report_misbehavior(peer)
    }

    pub(crate) fn update_validators(&mut self, validators: &[Address]) {
        self.network.update_validators(validators)
    }

    pub(crate) fn active_peers(&self) -> Vec<Address> {
        self.network.active_peers()
    }

    pub(crate) fn active_validators(&self, validators: &[Address]) -> Vec<Address> {
        active_validator_channels(&self.network, validators)
    }
}
