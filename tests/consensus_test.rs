use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ed25519_dalek::SigningKey;
use log::LevelFilter;
use rand_core::OsRng;

use rialto::types::{
    amount::{Amount, Unit},
    crypto_primitives::Keypair,
    data_types::{Address, NetworkId},
    transaction::{Transaction, TransactionType},
};

mod common;

use crate::common::{
    logging::setup_logger,
    network::mock_network,
    node::{test_genesis, wait_until, TestNode},
};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

#[test]
fn consensus_test() {
    setup_logger(LevelFilter::Debug);

    // 1. Initialize test components.

    // 1.1. Create signing keys for 3 validators, and a funded account that is not a validator.
    let mut csprg = OsRng {};
    let signing_keys: Vec<SigningKey> = (0..3).map(|_| SigningKey::generate(&mut csprg)).collect();
    let validators: Vec<Address> = signing_keys
        .iter()
        .map(|key| Keypair::new(key.clone()).address())
        .collect();
    let sender = Keypair::new(SigningKey::generate(&mut csprg));
    let recipient = Address::new([0xab; 20]);

    // 1.2. Create a mock network connecting the 3 validators.
    let network_stubs = mock_network(validators.iter().copied());

    // 1.3. Register the 3 validators as the initial delegates, and fund the sender.
    let genesis = test_genesis(&validators, &[sender.address()]);

    // 1.4. Simultaneously start all nodes.
    let nodes: Vec<TestNode> = signing_keys
        .into_iter()
        .zip(network_stubs)
        .map(|(key, network)| TestNode::new(key, network, &genesis))
        .collect();

    // 2. Test that blocks are finalized without any transactions.
    log::debug!("Polling every node until it has finalized block 1.");
    wait_until(Duration::from_secs(30), || {
        nodes.iter().all(|node| !node.recorded().finalized.lock().unwrap().is_empty())
    });

    // 3. Test that a transfer is included and executed the same way everywhere.

    // 3.1. Submit a transfer to the first node.
    log::debug!("Submitting a transfer to node 0.");
    let value = Amount::of(1, Unit::Coin).unwrap();
    let fee = Amount::of(5, Unit::Milli).unwrap();
    let tx = Transaction::new(
        NetworkId::DEVNET,
        TransactionType::Transfer,
        recipient,
        value,
        fee,
        0,
        now_ms(),
        Vec::new(),
        0,
        Amount::ZERO,
    )
    .sign(&sender);
    nodes[0].submit_transaction(tx.clone()).unwrap();

    // 3.2. Poll every node until the transfer is in a finalized block.
    log::debug!("Polling every node until the transfer is in a finalized block.");
    wait_until(Duration::from_secs(30), || {
        nodes.iter().all(|node| node.has_transaction(&tx.hash))
    });

    // 3.3. Check the balances on every node.
    for node in &nodes {
        assert_eq!(node.account(&recipient).available, value);
        let sender_account = node.account(&sender.address());
        assert_eq!(sender_account.nonce, 1);
        assert_eq!(
            sender_account.available.nano(),
            Amount::of(1_000, Unit::Coin).unwrap().nano() - value.nano() - fee.nano()
        );
    }

    // 3.4. Check that the nodes agree on every block they have all finalized.
    let common_height = nodes.iter().map(|node| node.latest_block_number()).min().unwrap();
    for number in 1..=common_height {
        let state_root = nodes[0].state_root(number);
        for node in &nodes[1..] {
            assert_eq!(node.state_root(number), state_root);
        }
    }

    // 3.5. With 3 validators, every block carries the signatures of all of them.
    assert_eq!(nodes[0].block(1).unwrap().votes.len(), 3);
}
