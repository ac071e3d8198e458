/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Cryptographic primitives.
//!
//! The definitions and re-exports in this module provide two categories of cryptographic primitives:
//! 1. **Cryptographic Hashes**: BLAKE2b-256 provided by the [`blake2`] crate, and RIPEMD-160 provided
//!    by the [`ripemd`] crate (used only to shorten public keys into [addresses](Address)).
//! 2. **Digital Signatures**: provided by the [`ed25519_dalek`] crate.

use std::fmt::{self, Debug, Formatter};

use blake2::{digest::consts::U32, Blake2b, Digest};
use borsh::{BorshDeserialize, BorshSerialize};
use ripemd::Ripemd160;

use super::data_types::{to_hex, Address, CryptoHash};

// re-exports below.
pub use ed25519_dalek::{SignatureError, Signer, SigningKey, Verifier, VerifyingKey};

/// BLAKE2b with a 32-byte output.
pub type CryptoHasher = Blake2b<U32>;

/// Compute the BLAKE2b-256 hash of `bytes`.
pub fn h256(bytes: &[u8]) -> CryptoHash {
    let mut hasher = CryptoHasher::new();
    hasher.update(bytes);
    CryptoHash::new(hasher.finalize().into())
}

/// Compute `RIPEMD160(BLAKE2b-256(bytes))`.
pub fn h160(bytes: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(h256(bytes).bytes());
    hasher.finalize().into()
}

impl Address {
    /// Get the address of the account controlled by `public_key`.
    pub fn of(public_key: &VerifyingKey) -> Address {
        Address::new(h160(public_key.as_bytes()))
    }

    /// Get the address of the contract created by `creator` with a transaction of nonce `nonce`.
    pub fn contract(creator: &Address, nonce: u64) -> Address {
        let mut bytes = creator.bytes().to_vec();
        bytes.extend_from_slice(&nonce.to_be_bytes());
        Address::new(h160(&bytes))
    }
}

/// A facade around [`SigningKey`] that implements a method for [`sign`](Self::sign)-ing messages as
/// well as getters for the [`public`](Self::public) key and [address](Self::address) associated with
/// the signing key.
#[derive(Clone)]
pub struct Keypair(SigningKey);

impl Keypair {
    /// Create a `Keypair` that wraps over `signing_key`.
    pub fn new(signing_key: SigningKey) -> Keypair {
        Keypair(signing_key)
    }

    /// Sign an arbitrary `message` with the `Keypair`.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            public_key: self.0.verifying_key().to_bytes(),
            bytes: self.0.sign(message).to_bytes(),
        }
    }

    /// Get the `VerifyingKey` of this `Keypair`.
    pub fn public(&self) -> VerifyingKey {
        self.0.verifying_key()
    }

    /// Get the address of this `Keypair`.
    pub fn address(&self) -> Address {
        Address::of(&self.0.verifying_key())
    }
}

/// Ed25519 digital signature, bundled with the public key of its signer.
///
/// Bundling the public key means that the address of the signer can be derived from the signature
/// alone, without having to look up a key registry.
#[derive(Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Signature {
    pub public_key: [u8; 32],
    pub bytes: [u8; 64],
}

impl Signature {
    /// Get the address of the signer.
    pub fn address(&self) -> Address {
        Address::new(h160(&self.public_key))
    }

    /// Check that this is a valid signature over `message` by the bundled public key.
    pub fn verify(&self, message: &[u8]) -> bool {
        match VerifyingKey::from_bytes(&self.public_key) {
            Ok(public_key) => public_key
                .verify(message, &ed25519_dalek::Signature::from_bytes(&self.bytes))
                .is_ok(),
            Err(_) => false,
        }
    }
}

impl Debug for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(signer: {})", to_hex(&self.address().bytes()))
    }
}
