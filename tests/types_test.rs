use rialto::types::{
    amount::Amount,
    codec::{decode, encode, DecodeError},
    crypto_primitives::{h160, h256, Keypair, SigningKey},
    data_types::{to_hex, Address, CryptoHash, NetworkId},
    merkle::compute_root,
    transaction::{Transaction, TransactionType},
};

/// Tests the hash of the empty input, which is also the root of an empty Merkle tree.
#[test]
fn empty_hash_test() {
    assert_eq!(
        to_hex(&h256(&[]).bytes()),
        "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
    );
    assert_eq!(h256(&[]), CryptoHash::EMPTY_H256);
    assert_eq!(compute_root(&[]), CryptoHash::EMPTY_H256);
}

/// Tests Merkle roots of up to 5 leaves, including odd levels, where the last node is carried up.
#[test]
fn merkle_root_test() {
    let leaves: Vec<CryptoHash> = (0..5u8).map(|i| h256(&[i])).collect();

    // A single leaf is its own root.
    assert_eq!(compute_root(&leaves[..1]), leaves[0]);

    let expected = [
        "03170a2e7597b7b7e3d84c05391d139a62b157e78786d8c082f29dcf4c111314",
        "52c98fcb9a132e1e7acb398852d7c4c8023a112ac2d511761f6705079d07e443",
        "3f8fc66b1fc7006260eb087b7745362cd8d64b9983d89ad0281f03e8dc492464",
        "c021171f1f623b208ab7dc3b1ba2716c6ae2aa8d0e248f013d00d829e03f736e",
        "8b69d8a9b937b6afe7cbdef934468b1766065dc271fd42e01dd2588aa3d90961",
    ];
    for (n, root) in expected.iter().enumerate() {
        assert_eq!(compute_root(&leaves[..n + 1]).to_string(), *root);
    }

    // Order matters.
    let mut reversed = leaves.clone();
    reversed.reverse();
    assert_ne!(compute_root(&reversed), compute_root(&leaves));
}

#[test]
fn address_derivation_test() {
    assert_eq!(
        to_hex(&h160(&[0u8; 32])),
        "049f7cd76d4b497b9168298b4e850771c9397651"
    );

    let keypair = Keypair::new(SigningKey::from_bytes(&[7u8; 32]));
    assert_eq!(
        to_hex(keypair.public().as_bytes()),
        "ea4a6c63e29c520abef5507b132ec5f9954776aebebe7b92421eea691446d22c"
    );
    assert_eq!(
        keypair.address().to_string(),
        "0x4ddfcd4b9706da61ca3d6cfb68bab861bf5290a6"
    );
    assert_eq!(
        Address::from_hex("4ddfcd4b9706da61ca3d6cfb68bab861bf5290a6"),
        Some(keypair.address())
    );
    assert_eq!(Address::from_hex("0x4ddf"), None);

    // Contract addresses depend on both the creator and the nonce.
    let creator = keypair.address();
    assert_ne!(Address::contract(&creator, 0), Address::contract(&creator, 1));
}

#[test]
fn signature_test() {
    let keypair = Keypair::new(SigningKey::from_bytes(&[7u8; 32]));
    let signature = keypair.sign(b"hello");

    assert_eq!(signature.address(), keypair.address());
    assert!(signature.verify(b"hello"));
    assert!(!signature.verify(b"hello!"));

    let mut tampered = signature.clone();
    tampered.bytes[0] ^= 1;
    assert!(!tampered.verify(b"hello"));
}

#[test]
fn codec_test() {
    let value: (u64, Vec<u8>) = (42, vec![1, 2, 3]);
    let bytes = encode(&value);
    assert_eq!(decode::<(u64, Vec<u8>)>(&bytes).unwrap(), value);

    // Truncated input.
    assert!(matches!(
        decode::<(u64, Vec<u8>)>(&bytes[..bytes.len() - 1]),
        Err(DecodeError::Malformed(_))
    ));

    // Trailing bytes.
    let mut trailing = bytes.clone();
    trailing.push(0);
    assert!(matches!(
        decode::<(u64, Vec<u8>)>(&trailing),
        Err(DecodeError::Malformed(_))
    ));
}

#[test]
fn transaction_validation_test() {
    let keypair = Keypair::new(SigningKey::from_bytes(&[7u8; 32]));
    let transfer = |data: Vec<u8>| {
        Transaction::new(
            NetworkId::DEVNET,
            TransactionType::Transfer,
            Address::new([1u8; 20]),
            Amount::new(10),
            Amount::new(5_000_000),
            0,
            1_000,
            data,
            0,
            Amount::ZERO,
        )
    };

    let tx = transfer(Vec::new()).sign(&keypair);
    assert_eq!(tx.sender(), Some(keypair.address()));
    assert!(tx.validate(NetworkId::DEVNET));

    // Wrong network.
    assert!(!tx.validate(NetworkId::MAINNET));

    // Unsigned.
    assert!(!transfer(Vec::new()).validate(NetworkId::DEVNET));
    assert_eq!(transfer(Vec::new()).sender(), None);

    // Tampered after signing.
    let mut tampered = tx.clone();
    tampered.value = Amount::new(11);
    assert!(!tampered.validate(NetworkId::DEVNET));

    // Data longer than a TRANSFER may carry.
    assert!(transfer(vec![0u8; 128]).sign(&keypair).validate(NetworkId::DEVNET));
    assert!(!transfer(vec![0u8; 129]).sign(&keypair).validate(NetworkId::DEVNET));

    // Negative amounts.
    let negative = Transaction::new(
        NetworkId::DEVNET,
        TransactionType::Transfer,
        Address::new([1u8; 20]),
        Amount::new(-1),
        Amount::new(5_000_000),
        0,
        1_000,
        Vec::new(),
        0,
        Amount::ZERO,
    )
    .sign(&keypair);
    assert!(!negative.validate(NetworkId::DEVNET));

    // The hash covers every field, and survives an encoding round trip.
    assert_ne!(transfer(Vec::new()).hash, transfer(vec![1]).hash);
    assert_eq!(decode::<Transaction>(&encode(&tx)).unwrap(), tx);
}
