/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The networking provider that the library user plugs into a node.

use crate::types::data_types::Address;

use super::messages::Message;

/// Delivers messages between this node and its peers, which are identified by their addresses.
///
/// Implementations are free to use any transport, as long as messages from the same peer are
/// delivered in the order they were sent. Messages may be lost: the consensus engine retransmits
/// what it needs to make progress.
pub trait Network: Clone + Send {
    /// Inform the network provider of the current validators, on wake-up and whenever they change.
    ///
    /// The provider may want to establish connections to validators it is not yet connected to.
    fn update_validators(&mut self, validators: &[Address]);

    /// The peers this node is currently connected to.
    fn active_peers(&self) -> Vec<Address>;

    /// Send a message to all peers without blocking.
    fn broadcast(&mut self, message: Message);

    /// Send a message to the specified peer without blocking.
    fn send(&mut self, peer: Address, message: Message);

    /// Receive a message from any peer. Returns immediately with a None if no message is available now.
    fn recv(&mut self) -> Option<(Address, Message)>;

    /// Report that `peer` sent a message that no honest node sends. The provider may disconnect it.
    fn report_misbehavior(&mut self, peer: Address);
}

/// Get the active peers that are in `validators`.
pub fn active_validator_channels<N: Network>(network: &N, validators: &[Address]) -> Vec<Address> {
    network
        .active_peers()
        .into_iter()
        .filter(|peer| validators.contains(peer))
        .collect()
}
