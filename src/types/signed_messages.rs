/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Signed messages.

use super::{crypto_primitives::Signature, data_types::Address};

/// Data types that contain: 1. A message, and 2. A digital signature over said message, bundled with
/// the public key of the signer.
pub trait SignedMessage {
    /// Get the bytes that are passed as input into the signing function to form the signature
    /// of the `SignedMessage`.
    fn message_bytes(&self) -> Vec<u8>;

    /// Get the signature of the `SignedMessage`, if it has been signed.
    fn signature(&self) -> Option<&Signature>;

    /// Get the address of the signer, if the `SignedMessage` has been signed.
    fn signer(&self) -> Option<Address> {
        self.signature().map(Signature::address)
    }

    /// Verify that the `SignedMessage` is signed, and that its signature is a correct signature over
    /// `message_bytes` by the bundled public key.
    fn is_correct(&self) -> bool {
        match self.signature() {
            Some(signature) => signature.verify(&self.message_bytes()),
            None => false,
        }
    }
}
