use std::{
    collections::{HashMap, HashSet},
    sync::{
        mpsc::{self, Receiver, Sender, TryRecvError},
        Arc, Mutex,
    },
};

use rialto::{
    networking::{messages::Message, network::Network},
    types::data_types::Address,
};

/// A mock network stub which passes messages from and to threads using channels.
///
/// Every message goes through the wire encoding. Peers can be switched offline: an offline peer
/// neither sends nor receives anything.
#[derive(Clone)]
pub(crate) struct NetworkStub {
    my_address: Address,
    all_peers: HashMap<Address, Sender<(Address, Vec<u8>)>>,
    inbox: Arc<Mutex<Receiver<(Address, Vec<u8>)>>>,
    offline: Arc<Mutex<HashSet<Address>>>,
    reported: Arc<Mutex<Vec<Address>>>,
}

impl NetworkStub {
    pub(crate) fn address(&self) -> Address {
        self.my_address
    }

    /// Switch `peer` offline or back online. Affects every stub of the same mock network.
    pub(crate) fn set_online(&self, peer: Address, online: bool) {
        let mut offline = self.offline.lock().unwrap();
        if online {
            offline.remove(&peer);
        } else {
            offline.insert(peer);
        }
    }

    /// The peers this stub reported as misbehaving.
    pub(crate) fn reported(&self) -> Vec<Address> {
        self.reported.lock().unwrap().clone()
    }

    fn is_online(&self, peer: &Address) -> bool {
        !self.offline.lock().unwrap().contains(peer)
    }

    fn deliver(&self, peer: &Address, bytes: Vec<u8>) {
        if !self.is_online(&self.my_address) || !self.is_online(peer) {
            return;
        }
        if let Some(inbox) = self.all_peers.get(peer) {
            let _ = inbox.send((self.my_address, bytes));
        }
    }
}

impl Network for NetworkStub {
    fn update_validators(&mut self, _: &[Address]) {}

    fn active_peers(&self) -> Vec<Address> {
        if !self.is_online(&self.my_address) {
            return Vec::new();
        }
        self.all_peers
            .keys()
            .filter(|peer| **peer != self.my_address && self.is_online(peer))
            .copied()
            .collect()
    }

    fn broadcast(&mut self, message: Message) {
        let bytes = message.encode();
        for peer in self.all_peers.keys() {
            if *peer != self.my_address {
                self.deliver(peer, bytes.clone());
            }
        }
    }

    fn send(&mut self, peer: Address, message: Message) {
        self.deliver(&peer, message.encode());
    }

    fn recv(&mut self) -> Option<(Address, Message)> {
        loop {
            let (origin, bytes) = match self.inbox.lock().unwrap().try_recv() {
                Ok(o_m) => o_m,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => panic!(),
            };
            // Messages that were in flight when this peer went offline are lost.
            if !self.is_online(&self.my_address) {
                continue;
            }
            if let Ok(message) = Message::decode(&bytes) {
                return Some((origin, message));
            }
        }
    }

    fn report_misbehavior(&mut self, peer: Address) {
        self.reported.lock().unwrap().push(peer);
    }
}

pub(crate) fn mock_network(peers: impl Iterator<Item = Address>) -> Vec<NetworkStub> {
    let mut all_peers = HashMap::new();
    let offline = Arc::new(Mutex::new(HashSet::new()));
    let peer_and_inboxes: Vec<(Address, Receiver<(Address, Vec<u8>)>)> = peers
        .map(|peer| {
            let (sender, receiver) = mpsc::channel();
            all_peers.insert(peer, sender);

            (peer, receiver)
        })
        .collect();

    peer_and_inboxes
        .into_iter()
        .map(|(my_address, inbox)| NetworkStub {
            my_address,
            all_peers: all_peers.clone(),
            inbox: Arc::new(Mutex::new(inbox)),
            offline: offline.clone(),
            reported: Arc::new(Mutex::new(Vec::new())),
        })
        .collect()
}
