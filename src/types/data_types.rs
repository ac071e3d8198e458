/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that exist only to store bytes, and do not have any major "active" behavior.

use std::fmt::{self, Debug, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};

/// Number that identifies a network (mainnet, testnet, devnet, ...).
///
/// Every transaction carries the `NetworkId` of the network it was signed for, so that a transaction
/// signed for one network cannot be replayed on another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct NetworkId(u8);

impl NetworkId {
    pub const MAINNET: NetworkId = NetworkId(0);
    pub const TESTNET: NetworkId = NetworkId(1);
    pub const DEVNET: NetworkId = NetworkId(2);

    /// Create a new `NetworkId` with an `int` value.
    pub const fn new(int: u8) -> Self {
        Self(int)
    }

    /// Get the `u8` value of this `NetworkId`.
    pub const fn int(&self) -> u8 {
        self.0
    }
}

impl Display for NetworkId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            NetworkId::MAINNET => write!(f, "mainnet"),
            NetworkId::TESTNET => write!(f, "testnet"),
            NetworkId::DEVNET => write!(f, "devnet"),
            NetworkId(other) => write!(f, "network-{}", other),
        }
    }
}

/// 32-byte cryptographic hash.
///
/// Within this library, `CryptoHash`-es are always produced by [`h256`](super::crypto_primitives::h256).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BorshDeserialize, BorshSerialize)]
pub struct CryptoHash([u8; 32]);

impl CryptoHash {
    /// All zeros. Used as the block hash of reject votes and as the parent hash of the genesis block.
    pub const ZERO: CryptoHash = CryptoHash([0u8; 32]);

    /// The hash of the empty byte sequence, `h256([])`. Root of an empty Merkle tree.
    pub const EMPTY_H256: CryptoHash = CryptoHash([
        0x0e, 0x57, 0x51, 0xc0, 0x26, 0xe5, 0x43, 0xb2, 0xe8, 0xab, 0x2e, 0xb0, 0x60, 0x99, 0xda,
        0xa1, 0xd1, 0xe5, 0xdf, 0x47, 0x77, 0x8f, 0x77, 0x87, 0xfa, 0xab, 0x45, 0xcd, 0xf1, 0x2f,
        0xe3, 0xa8,
    ]);

    /// Create a new `CryptoHash` wrapping `bytes`.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the inner bytes of this `CryptoHash`.
    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl Display for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", to_hex(&self.0))
    }
}

impl Debug for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "CryptoHash({})", to_hex(&self.0))
    }
}

/// 20-byte account address.
///
/// The address of an externally owned account is [`h160`](super::crypto_primitives::h160) of its
/// Ed25519 public key; see [`Address::of`](super::crypto_primitives::Address::of).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, BorshDeserialize, BorshSerialize)]
pub struct Address([u8; 20]);

impl Address {
    /// All zeros. The recipient of `DELEGATE` transactions, and of `CREATE` transactions.
    pub const EMPTY: Address = Address([0u8; 20]);

    /// Create a new `Address` wrapping `bytes`.
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get the inner bytes of this `Address`.
    pub const fn bytes(&self) -> [u8; 20] {
        self.0
    }

    /// Parse a 40-character hexadecimal string (with or without a `0x` prefix).
    pub fn from_hex(hex: &str) -> Option<Address> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        if hex.len() != 40 || !hex.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; 20];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16).ok()?;
        }
        Some(Address(bytes))
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", to_hex(&self.0))
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", to_hex(&self.0))
    }
}

/// Lowercase hexadecimal encoding of `bytes`.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}
