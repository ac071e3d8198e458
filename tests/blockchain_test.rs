use std::time::{SystemTime, UNIX_EPOCH};

use ed25519_dalek::SigningKey;

use rialto::{
    chain::{blockchain::Blockchain, ImportError},
    executor::vm::BlockContext,
    types::{
        amount::{Amount, Unit},
        block::BlockHeader,
        crypto_primitives::Keypair,
        data_types::{Address, NetworkId},
        merkle::transactions_root,
        transaction::{Transaction, TransactionType},
    },
};

mod common;

use common::{
    mem_db::MemDB,
    node::{test_chain_spec, test_genesis},
    vm::FakeVm,
};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

fn sender() -> Keypair {
    Keypair::new(SigningKey::from_bytes(&[7u8; 32]))
}

/// A chain holding only the genesis block, which funds [`sender`].
fn chain() -> Blockchain<MemDB> {
    let validator = Address::new([1u8; 20]);
    let mut chain = Blockchain::new(MemDB::new(), test_chain_spec());
    chain
        .initialize(&test_genesis(&[validator], &[sender().address()]))
        .unwrap();
    chain
}

fn transfer(nonce: u64, timestamp: u64) -> Transaction {
    Transaction::new(
        NetworkId::DEVNET,
        TransactionType::Transfer,
        Address::new([2u8; 20]),
        Amount::new(1),
        Amount::of(5, Unit::Milli).unwrap(),
        nonce,
        timestamp,
        Vec::new(),
        0,
        Amount::ZERO,
    )
    .sign(&sender())
}

/// Build a header for `transactions` on top of the latest block the way a proposer would, but
/// without leaving any of them out.
fn header_for(chain: &Blockchain<MemDB>, transactions: &[Transaction], timestamp: u64) -> BlockHeader {
    let parent = chain.latest_header().unwrap();
    let coinbase = Address::new([1u8; 20]);
    let context = BlockContext {
        number: parent.number + 1,
        coinbase,
        timestamp,
        parent_hash: parent.hash,
        gas_limit: chain.chain_spec().max_block_gas,
    };
    let executed = chain
        .execute_block(&context, transactions, &mut FakeVm::new())
        .unwrap();

    BlockHeader::new(
        context.number,
        coinbase,
        parent.hash,
        timestamp,
        transactions_root(transactions),
        executed.results_root,
        executed.state_root,
        Vec::new(),
    )
}

/// Tests that a block is invalid if one of its transactions is timestamped too far from the block,
/// in either direction.
#[test]
fn transaction_time_drift_test() {
    let chain = chain();
    let drift = chain.chain_spec().max_transaction_time_drift_ms;
    let block_timestamp = now_ms();

    for timestamp in [
        block_timestamp - drift - 1,
        block_timestamp + drift + 1,
        u64::MAX / 2,
        0,
    ] {
        let tx = transfer(0, timestamp);
        let transactions = vec![tx.clone()];
        let header = header_for(&chain, &transactions, block_timestamp);
        assert!(matches!(
            chain.validate_block(&header, &transactions, &mut FakeVm::new()),
            Err(ImportError::TransactionTimeDrift(hash)) if hash == tx.hash
        ));
    }

    // At the bound, the block is valid.
    for timestamp in [block_timestamp - drift, block_timestamp + drift] {
        let transactions = vec![transfer(0, timestamp)];
        let header = header_for(&chain, &transactions, block_timestamp);
        assert!(chain
            .validate_block(&header, &transactions, &mut FakeVm::new())
            .is_ok());
    }
}

/// Tests that the proposer leaves out the transactions a block could not be valid with.
#[test]
fn build_block_test() {
    let chain = chain();
    let block_timestamp = now_ms();
    let too_late = transfer(0, u64::MAX / 2);
    let on_time = transfer(0, block_timestamp);

    let built = chain
        .build_block(
            Address::new([1u8; 20]),
            block_timestamp,
            vec![too_late, on_time.clone()],
            &mut FakeVm::new(),
        )
        .unwrap();
    assert_eq!(built.transactions, vec![on_time]);

    // The built block passes validation.
    assert!(chain
        .validate_block(&built.header, &built.transactions, &mut FakeVm::new())
        .is_ok());
}
