use ed25519_dalek::SigningKey;

use rialto::{
    config::ChainSpec,
    executor::{charged_fee, upfront_cost, vm::BlockContext, TransactionExecutor},
    state::{account_state::AccountState, delegate_state::DelegateState},
    types::{
        amount::{Amount, Unit},
        crypto_primitives::Keypair,
        data_types::{Address, CryptoHash, NetworkId},
        transaction::{Transaction, TransactionType},
        transaction_result::{Code, TransactionResult},
    },
};

mod common;

use common::{mem_db::MemDB, vm::FakeVm};

const FEE: Amount = Amount::new(5 * Unit::Milli.factor());
const GAS_PRICE: Amount = Amount::new(10);

fn coins(n: i64) -> Amount {
    Amount::of(n, Unit::Coin).unwrap()
}

fn context() -> BlockContext {
    BlockContext {
        number: 1,
        coinbase: Address::new([0xcc; 20]),
        timestamp: 0,
        parent_hash: CryptoHash::ZERO,
        gas_limit: 10_000_000,
    }
}

/// The chain parameters, the signer of every transaction, and the virtual machine the transactions
/// are executed with.
struct Fixture {
    chain_spec: ChainSpec,
    sender: Keypair,
    vm: FakeVm,
    nonce: u64,
}

impl Fixture {
    fn new() -> Fixture {
        Fixture {
            chain_spec: ChainSpec::devnet(),
            sender: Keypair::new(SigningKey::from_bytes(&[7u8; 32])),
            vm: FakeVm::new(),
            nonce: 0,
        }
    }

    fn tx(
        &self,
        tx_type: TransactionType,
        to: Address,
        value: Amount,
        nonce: u64,
        data: Vec<u8>,
    ) -> Transaction {
        let (gas, gas_price) = if tx_type.is_vm() {
            (100_000, GAS_PRICE)
        } else {
            (0, Amount::ZERO)
        };
        self.custom_tx(tx_type, to, value, FEE, nonce, data, gas, gas_price)
    }

    #[allow(clippy::too_many_arguments)]
    fn custom_tx(
        &self,
        tx_type: TransactionType,
        to: Address,
        value: Amount,
        fee: Amount,
        nonce: u64,
        data: Vec<u8>,
        gas: u64,
        gas_price: Amount,
    ) -> Transaction {
        Transaction::new(
            self.chain_spec.network,
            tx_type,
            to,
            value,
            fee,
            nonce,
            0,
            data,
            gas,
            gas_price,
        )
        .sign(&self.sender)
    }

    fn execute<'a>(
        &mut self,
        tx: &Transaction,
        accounts: &mut AccountState<&'a MemDB>,
        delegates: &mut DelegateState<&'a MemDB>,
    ) -> TransactionResult {
        TransactionExecutor::new(&self.chain_spec)
            .execute_one(tx, accounts, delegates, &context(), &mut self.vm)
            .unwrap()
    }

    /// Execute a transaction that carries the next nonce, and return its result code.
    fn run<'a>(
        &mut self,
        accounts: &mut AccountState<&'a MemDB>,
        delegates: &mut DelegateState<&'a MemDB>,
        tx_type: TransactionType,
        to: Address,
        value: Amount,
        data: &[u8],
    ) -> Code {
        let tx = self.tx(tx_type, to, value, self.nonce, data.to_vec());
        self.nonce += 1;
        self.execute(&tx, accounts, delegates).code
    }
}

/// Tests every reason for which a transaction is rejected, and that a rejected transaction leaves
/// the state untouched.
#[test]
fn rejections_test() {
    let db = MemDB::new();
    let mut fixture = Fixture::new();
    let sender = fixture.sender.address();
    let recipient = Address::new([1u8; 20]);

    let mut accounts = AccountState::new(&db);
    let mut delegates = DelegateState::new(&db);
    accounts.adjust_available(&sender, coins(1)).unwrap();
    let before = accounts.changes();

    let valid = fixture.tx(TransactionType::Transfer, recipient, Amount::new(1), 0, Vec::new());

    let mut unsigned = valid.clone();
    unsigned.signature = None;

    // A field changed after signing, so that the hash no longer matches.
    let mut tampered = valid.clone();
    tampered.value = coins(1);

    // Signed by someone else over a different transaction.
    let mut forged = valid.clone();
    forged.signature = fixture
        .tx(TransactionType::Transfer, recipient, Amount::new(2), 0, Vec::new())
        .signature;

    let other_network = Transaction::new(
        NetworkId::MAINNET,
        TransactionType::Transfer,
        recipient,
        Amount::new(1),
        FEE,
        0,
        0,
        Vec::new(),
        0,
        Amount::ZERO,
    )
    .sign(&fixture.sender);

    let negative_value = fixture.tx(TransactionType::Transfer, recipient, Amount::new(-1), 0, Vec::new());
    let negative_fee = fixture.custom_tx(
        TransactionType::Transfer,
        recipient,
        Amount::new(1),
        Amount::new(-1),
        0,
        Vec::new(),
        0,
        Amount::ZERO,
    );
    let negative_gas_price = fixture.custom_tx(
        TransactionType::Call,
        recipient,
        Amount::ZERO,
        FEE,
        0,
        Vec::new(),
        100_000,
        Amount::new(-1),
    );

    let wrong_nonce = fixture.tx(TransactionType::Transfer, recipient, Amount::new(1), 1, Vec::new());

    let low_fee = fixture.custom_tx(
        TransactionType::Transfer,
        recipient,
        Amount::new(1),
        Amount::new(FEE.nano() - 1),
        0,
        Vec::new(),
        0,
        Amount::ZERO,
    );
    let long_data = fixture.tx(
        TransactionType::Delegate,
        Address::EMPTY,
        coins(1_000),
        0,
        vec![b'a'; 17],
    );
    let vote_with_data = fixture.tx(TransactionType::Vote, recipient, Amount::new(1), 0, vec![0]);
    let low_gas_price = fixture.custom_tx(
        TransactionType::Call,
        recipient,
        Amount::ZERO,
        FEE,
        0,
        Vec::new(),
        100_000,
        Amount::new(GAS_PRICE.nano() - 1),
    );
    let too_much_gas = fixture.custom_tx(
        TransactionType::Call,
        recipient,
        Amount::ZERO,
        FEE,
        0,
        Vec::new(),
        fixture.chain_spec.max_block_gas + 1,
        GAS_PRICE,
    );
    let unaffordable = fixture.custom_tx(
        TransactionType::Transfer,
        recipient,
        Amount::ZERO,
        coins(2),
        0,
        Vec::new(),
        0,
        Amount::ZERO,
    );

    let cases = vec![
        (unsigned, Code::Invalid),
        (tampered, Code::Invalid),
        (forged, Code::Invalid),
        (other_network, Code::Invalid),
        (negative_value, Code::InvalidFormat),
        (negative_fee, Code::InvalidFormat),
        (negative_gas_price, Code::InvalidFormat),
        (wrong_nonce, Code::InvalidNonce),
        (low_fee, Code::InvalidFee),
        (long_data, Code::InvalidDataLength),
        (vote_with_data, Code::InvalidDataLength),
        (low_gas_price, Code::InvalidGasPrice),
        (too_much_gas, Code::InvalidFormat),
        (unaffordable, Code::InsufficientFee),
    ];
    for (tx, code) in cases {
        let result = fixture.execute(&tx, &mut accounts, &mut delegates);
        assert_eq!(result.code, code);
        assert!(result.code.is_rejected());
        assert_eq!(charged_fee(&tx, &result), Ok(Amount::ZERO));
        assert_eq!(accounts.changes(), before);
    }
    assert!(delegates.changes().is_empty());

    // With the virtual machine turned off, contract transactions are of an invalid type.
    fixture.chain_spec.virtual_machine = false;
    let call = fixture.tx(TransactionType::Call, recipient, Amount::ZERO, 0, Vec::new());
    assert_eq!(
        fixture.execute(&call, &mut accounts, &mut delegates).code,
        Code::InvalidType
    );
}

#[test]
fn transfer_test() {
    let db = MemDB::new();
    let mut fixture = Fixture::new();
    let sender = fixture.sender.address();
    let recipient = Address::new([1u8; 20]);

    let mut accounts = AccountState::new(&db);
    let mut delegates = DelegateState::new(&db);
    accounts.adjust_available(&sender, coins(1)).unwrap();

    // 1. A transfer that succeeds.
    let tx = fixture.tx(TransactionType::Transfer, recipient, Amount::new(100), 0, Vec::new());
    let result = fixture.execute(&tx, &mut accounts, &mut delegates);
    assert_eq!(result.code, Code::Success);
    assert_eq!(charged_fee(&tx, &result), Ok(FEE));

    let account = accounts.get_account(&sender).unwrap();
    assert_eq!(account.nonce, 1);
    assert_eq!(account.available.nano(), coins(1).nano() - 100 - FEE.nano());
    assert_eq!(accounts.get_account(&recipient).unwrap().available, Amount::new(100));

    // 2. A transfer of more than what is left fails: the fee is still charged and the nonce is still
    // consumed, but nothing is transferred.
    let tx = fixture.tx(TransactionType::Transfer, recipient, coins(1), 1, Vec::new());
    let result = fixture.execute(&tx, &mut accounts, &mut delegates);
    assert_eq!(result.code, Code::InsufficientAvailable);
    assert!(result.code.is_accepted());
    assert_eq!(charged_fee(&tx, &result), Ok(FEE));

    let after = accounts.get_account(&sender).unwrap();
    assert_eq!(after.nonce, 2);
    assert_eq!(after.available.nano(), account.available.nano() - FEE.nano());
    assert_eq!(accounts.get_account(&recipient).unwrap().available, Amount::new(100));
}

/// Tests that a transfer of a negative value cannot take funds from its recipient.
#[test]
fn negative_transfer_test() {
    let db = MemDB::new();
    let mut fixture = Fixture::new();
    let thief = fixture.sender.address();
    let victim = Address::new([1u8; 20]);

    let mut accounts = AccountState::new(&db);
    let mut delegates = DelegateState::new(&db);
    accounts.adjust_available(&thief, coins(1)).unwrap();
    accounts.adjust_available(&victim, coins(100)).unwrap();

    let tx = fixture.tx(TransactionType::Transfer, victim, coins(-50), 0, Vec::new());
    let result = fixture.execute(&tx, &mut accounts, &mut delegates);
    assert_eq!(result.code, Code::InvalidFormat);

    assert_eq!(accounts.get_account(&thief).unwrap().available, coins(1));
    assert_eq!(accounts.get_account(&thief).unwrap().nonce, 0);
    assert_eq!(accounts.get_account(&victim).unwrap().available, coins(100));
}

#[test]
fn delegate_and_vote_test() {
    let db = MemDB::new();
    let mut fixture = Fixture::new();
    let sender = fixture.sender.address();
    let burn = fixture.chain_spec.min_delegate_burn_amount;

    let mut accounts = AccountState::new(&db);
    let mut delegates = DelegateState::new(&db);
    accounts.adjust_available(&sender, coins(2_000)).unwrap();

    let (a, d) = (&mut accounts, &mut delegates);

    // 1. Failed registrations.
    let not_empty = Address::new([1u8; 20]);
    let too_little = Amount::new(burn.nano() - 1);
    assert_eq!(
        fixture.run(a, d, TransactionType::Delegate, not_empty, burn, b"alice"),
        Code::InvalidRecipient
    );
    assert_eq!(
        fixture.run(a, d, TransactionType::Delegate, Address::EMPTY, too_little, b"alice"),
        Code::InvalidDelegateBurnAmount
    );
    assert_eq!(
        fixture.run(a, d, TransactionType::Delegate, Address::EMPTY, burn, b"Alice"),
        Code::InvalidDelegateName
    );
    assert!(d.get_delegate(&sender).unwrap().is_none());

    // 2. A successful registration burns the value.
    let available = a.get_account(&sender).unwrap().available;
    assert_eq!(
        fixture.run(a, d, TransactionType::Delegate, Address::EMPTY, burn, b"alice"),
        Code::Success
    );
    assert_eq!(
        a.get_account(&sender).unwrap().available.nano(),
        available.nano() - burn.nano() - FEE.nano()
    );
    let delegate = d.get_delegate(&sender).unwrap().unwrap();
    assert_eq!(delegate.name_str(), "alice");
    assert_eq!(delegate.registered_at, 1);

    assert_eq!(
        fixture.run(a, d, TransactionType::Delegate, Address::EMPTY, burn, b"alice2"),
        Code::InvalidDelegating
    );

    // 3. Votes lock the voter's balance.
    assert_eq!(
        fixture.run(a, d, TransactionType::Vote, sender, coins(10), b""),
        Code::Success
    );
    assert_eq!(a.get_account(&sender).unwrap().locked, coins(10));
    assert_eq!(d.get_delegate(&sender).unwrap().unwrap().votes, coins(10));

    let unknown = Address::new([9u8; 20]);
    assert_eq!(
        fixture.run(a, d, TransactionType::Vote, unknown, coins(1), b""),
        Code::InvalidDelegate
    );
    assert_eq!(a.get_account(&sender).unwrap().locked, coins(10));

    // 4. Unvotes unlock it.
    assert_eq!(
        fixture.run(a, d, TransactionType::Unvote, sender, coins(11), b""),
        Code::InsufficientLocked
    );
    assert_eq!(
        fixture.run(a, d, TransactionType::Unvote, sender, coins(4), b""),
        Code::Success
    );
    assert_eq!(a.get_account(&sender).unwrap().locked, coins(6));
    assert_eq!(d.get_delegate(&sender).unwrap().unwrap().votes, coins(6));

    // Every one of the 9 transactions consumed a nonce.
    assert_eq!(a.get_account(&sender).unwrap().nonce, 9);
}

/// Tests contract creation and calls, including the refund of unused gas and the rollback of a call
/// whose code fails.
#[test]
fn contracts_test() {
    let db = MemDB::new();
    let mut fixture = Fixture::new();
    let sender = fixture.sender.address();
    let gas_used = fixture.vm.gas_per_call;

    let mut accounts = AccountState::new(&db);
    let mut delegates = DelegateState::new(&db);
    accounts.adjust_available(&sender, coins(1)).unwrap();

    // 1. CREATE with a recipient is a failure.
    let tx = fixture.tx(TransactionType::Create, Address::new([1u8; 20]), Amount::ZERO, 0, vec![1, 2, 3]);
    assert_eq!(
        fixture.execute(&tx, &mut accounts, &mut delegates).code,
        Code::InvalidRecipient
    );

    // 2. CREATE stores the code returned by the init code.
    let before = accounts.get_account(&sender).unwrap().available;
    let tx = fixture.tx(TransactionType::Create, Address::EMPTY, Amount::new(7), 1, vec![1, 2, 3]);
    assert_eq!(upfront_cost(&tx), Ok(Amount::new(FEE.nano() + 100_000 * GAS_PRICE.nano())));
    let result = fixture.execute(&tx, &mut accounts, &mut delegates);
    assert_eq!(result.code, Code::Success);
    assert_eq!(result.gas_used, gas_used);

    let contract = Address::contract(&sender, 1);
    assert_eq!(accounts.get_code(&contract), Some(vec![1, 2, 3]));
    assert_eq!(accounts.get_account(&contract).unwrap().available, Amount::new(7));

    // Only the gas used is paid for.
    let cost = Amount::new(FEE.nano() + gas_used as i64 * GAS_PRICE.nano());
    assert_eq!(charged_fee(&tx, &result), Ok(cost));
    assert_eq!(
        accounts.get_account(&sender).unwrap().available.nano(),
        before.nano() - 7 - cost.nano()
    );

    // 3. CALL runs the contract's code.
    let tx = fixture.tx(TransactionType::Call, contract, Amount::new(3), 2, b"input".to_vec());
    assert_eq!(
        fixture.execute(&tx, &mut accounts, &mut delegates).code,
        Code::Success
    );
    assert_eq!(accounts.get_storage(&contract, b"input"), Some(b"input".to_vec()));
    assert_eq!(accounts.get_account(&contract).unwrap().available, Amount::new(10));

    // 4. A CALL whose code fails is rolled back, but still pays for gas.
    let failing = Address::new([0xff; 20]);
    accounts.set_code(&failing, vec![0xff]);
    let before = accounts.get_account(&sender).unwrap();
    let tx = fixture.tx(TransactionType::Call, failing, Amount::new(5), 3, Vec::new());
    let result = fixture.execute(&tx, &mut accounts, &mut delegates);
    assert_eq!(result.code, Code::Failure);
    assert_eq!(accounts.get_account(&failing).unwrap().available, Amount::ZERO);

    let after = accounts.get_account(&sender).unwrap();
    assert_eq!(after.nonce, before.nonce + 1);
    assert_eq!(after.available.nano(), before.available.nano() - cost.nano());
}
