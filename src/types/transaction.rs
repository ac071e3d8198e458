/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Signed instructions from an account to change the ledger.
//!
//! The identity of a transaction is the [`h256`] of the canonical encoding of every field except
//! `hash` and `signature`. The sender signs the hash; the sender's address is derived from the
//! public key bundled in the [`Signature`], so it is not a separate field.

use borsh::{BorshDeserialize, BorshSerialize};

use super::{
    amount::Amount,
    codec::encode,
    crypto_primitives::{h256, Keypair, Signature},
    data_types::{Address, CryptoHash, NetworkId},
    signed_messages::SignedMessage,
};

/// The kinds of transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum TransactionType {
    /// Move `value` from the sender to `to`.
    Transfer,
    /// Burn `value` to register the sender as a delegate named `data`.
    Delegate,
    /// Lock `value` of the sender's balance as votes for delegate `to`.
    Vote,
    /// Unlock `value` of the sender's votes for delegate `to`.
    Unvote,
    /// Deploy the contract whose init code is `data`.
    Create,
    /// Call the contract at `to` with input `data`.
    Call,
}

impl TransactionType {
    /// Maximum length of `data` in a transaction of this type.
    pub const fn max_data_size(&self) -> usize {
        match self {
            TransactionType::Transfer => 128,
            TransactionType::Delegate => 16,
            TransactionType::Vote | TransactionType::Unvote => 0,
            TransactionType::Create | TransactionType::Call => 512 * 1024,
        }
    }

    /// Whether transactions of this type run in the virtual machine and pay for gas.
    pub const fn is_vm(&self) -> bool {
        matches!(self, TransactionType::Create | TransactionType::Call)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    pub network: NetworkId,
    pub tx_type: TransactionType,
    pub to: Address,
    pub value: Amount,
    pub fee: Amount,
    pub nonce: u64,
    /// Milliseconds since the Unix Epoch.
    pub timestamp: u64,
    pub data: Vec<u8>,
    /// Gas limit. Only meaningful for virtual machine transactions.
    pub gas: u64,
    /// Price of one unit of gas. Only meaningful for virtual machine transactions.
    pub gas_price: Amount,
    pub hash: CryptoHash,
    pub signature: Option<Signature>,
}

impl Transaction {
    /// Create an unsigned transaction, computing its hash.
    pub fn new(
        network: NetworkId,
        tx_type: TransactionType,
        to: Address,
        value: Amount,
        fee: Amount,
        nonce: u64,
        timestamp: u64,
        data: Vec<u8>,
        gas: u64,
        gas_price: Amount,
    ) -> Transaction {
        let mut tx = Transaction {
            network,
            tx_type,
            to,
            value,
            fee,
            nonce,
            timestamp,
            data,
            gas,
            gas_price,
            hash: CryptoHash::ZERO,
            signature: None,
        };
        tx.hash = h256(&tx.body_bytes());
        tx
    }

    /// Sign the transaction's hash with `keypair`, making `keypair`'s address the sender.
    pub fn sign(mut self, keypair: &Keypair) -> Transaction {
        self.signature = Some(keypair.sign(&self.hash.bytes()));
        self
    }

    /// Get the address of the sender, if the transaction has been signed.
    pub fn sender(&self) -> Option<Address> {
        self.signer()
    }

    /// Whether `hash` is the hash of the other fields.
    pub fn is_hash_consistent(&self) -> bool {
        self.hash == h256(&self.body_bytes())
    }

    /// Canonical encoding of every field that the hash covers.
    fn body_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend(encode(&self.network));
        bytes.extend(encode(&self.tx_type));
        bytes.extend(encode(&self.to));
        bytes.extend(encode(&self.value));
        bytes.extend(encode(&self.fee));
        bytes.extend(encode(&self.nonce));
        bytes.extend(encode(&self.timestamp));
        bytes.extend(encode(&self.data));
        bytes.extend(encode(&self.gas));
        bytes.extend(encode(&self.gas_price));
        bytes
    }

    /// Size of the transaction's canonical encoding, counted against the block size limit.
    pub fn size(&self) -> usize {
        encode(self).len()
    }

    /// Check the properties of the transaction that do not depend on the ledger:
    /// 1. `hash` is the hash of the other fields,
    /// 2. it was created for `network`,
    /// 3. value, fee, and gas price are non-negative,
    /// 4. `data` is no longer than its type allows,
    /// 5. it is signed, and the signature over `hash` is correct.
    ///
    /// Address lengths are enforced by the [`Address`] type.
    pub fn validate(&self, network: NetworkId) -> bool {
        self.is_hash_consistent()
            && self.network == network
            && !self.value.is_negative()
            && !self.fee.is_negative()
            && !self.gas_price.is_negative()
            && self.data.len() <= self.tx_type.max_data_size()
            && self.is_correct()
    }
}

impl SignedMessage for Transaction {
    fn message_bytes(&self) -> Vec<u8> {
        self.hash.bytes().to_vec()
    }

    fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }
}
