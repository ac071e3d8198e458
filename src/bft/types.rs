/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Votes, the proofs they are aggregated into, and block proposals.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::{
    block::BlockHeader,
    codec::encode,
    crypto_primitives::{h256, Keypair, Signature},
    data_types::CryptoHash,
    merkle::transactions_root,
    signed_messages::SignedMessage,
    transaction::Transaction,
};

/// The stage of a view that a [`Vote`] is cast in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, BorshSerialize, BorshDeserialize)]
pub enum VoteType {
    /// Cast on entering `VALIDATE`, on whether the proposal of the view is valid.
    Validate,
    /// Cast on entering `PRE_COMMIT`, on whether a quorum of validators approved the same block.
    PreCommit,
    /// Cast on entering `COMMIT`.
    Commit,
}

/// A validator's signed approval of a block, or rejection of the view, at a given stage of a
/// (height, view).
#[derive(Clone, PartialEq, Eq, Debug, BorshSerialize, BorshDeserialize)]
pub struct Vote {
    pub vote_type: VoteType,
    pub approve: bool,
    pub height: u64,
    pub view: u32,
    /// The hash of the approved block, or [`CryptoHash::ZERO`] in a rejection.
    pub block_hash: CryptoHash,
    pub signature: Option<Signature>,
}

impl Vote {
    pub fn new_approve(vote_type: VoteType, height: u64, view: u32, block_hash: CryptoHash) -> Vote {
        Vote {
            vote_type,
            approve: true,
            height,
            view,
            block_hash,
            signature: None,
        }
    }

    pub fn new_reject(vote_type: VoteType, height: u64, view: u32) -> Vote {
        Vote {
            vote_type,
            approve: false,
            height,
            view,
            block_hash: CryptoHash::ZERO,
            signature: None,
        }
    }

    pub fn sign(mut self, keypair: &Keypair) -> Vote {
        self.signature = Some(keypair.sign(&self.signed_bytes()));
        self
    }

    /// The canonical encoding of every field except the signature.
    ///
    /// The precommit approvals of a finalized block are stored with the block as bare signatures, so
    /// anyone can re-form this message from the block's number, view, and hash to check them.
    pub fn signed_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend(encode(&self.vote_type));
        bytes.extend(encode(&self.approve));
        bytes.extend(encode(&self.height));
        bytes.extend(encode(&self.view));
        bytes.extend(encode(&self.block_hash));
        bytes
    }

    /// Check that the vote is signed correctly, and that rejections carry no block hash.
    pub fn validate(&self) -> bool {
        (self.approve || self.block_hash == CryptoHash::ZERO) && self.is_correct()
    }
}

impl SignedMessage for Vote {
    fn message_bytes(&self) -> Vec<u8> {
        self.signed_bytes()
    }

    fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }
}

/// Justification for being in `view` of `height`.
///
/// In view 0 a proof carries no votes. In a later view, it carries a quorum of `PRE_COMMIT` rejections
/// cast in the view before.
#[derive(Clone, PartialEq, Eq, Debug, BorshSerialize, BorshDeserialize)]
pub struct Proof {
    pub height: u64,
    pub view: u32,
    pub votes: Vec<Vote>,
}

impl Proof {
    pub fn new(height: u64, view: u32, votes: Vec<Vote>) -> Proof {
        Proof {
            height,
            view,
            votes,
        }
    }
}

/// A block proposed by the primary validator of `(proof.height, proof.view)`.
#[derive(Clone, PartialEq, Eq, Debug, BorshSerialize, BorshDeserialize)]
pub struct Proposal {
    pub proof: Proof,
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    pub signature: Option<Signature>,
}

impl Proposal {
    pub fn new(proof: Proof, header: BlockHeader, transactions: Vec<Transaction>) -> Proposal {
        Proposal {
            proof,
            header,
            transactions,
            signature: None,
        }
    }

    pub fn sign(mut self, keypair: &Keypair) -> Proposal {
        self.signature = Some(keypair.sign(&self.message_bytes()));
        self
    }

    pub fn height(&self) -> u64 {
        self.proof.height
    }

    pub fn view(&self) -> u32 {
        self.proof.view
    }

    /// Check the properties of the proposal that hold regardless of the chain:
    /// 1. The header is for the height of the proof, and its hash is self-consistent.
    /// 2. The transactions are the ones the header commits to.
    /// 3. The proposal is signed correctly.
    ///
    /// Whether the signer is the primary, and whether the proof justifies the view, is checked by the
    /// consensus engine against its validator list.
    pub fn validate(&self) -> bool {
        self.header.number == self.proof.height
            && self.header.is_hash_consistent()
            && self.header.transactions_root == transactions_root(&self.transactions)
            && self.is_correct()
    }
}

impl SignedMessage for Proposal {
    /// A digest of the proof, header, and transactions.
    fn message_bytes(&self) -> Vec<u8> {
        let mut bytes = encode(&self.proof);
        bytes.extend(encode(&self.header));
        bytes.extend(encode(&self.transactions));
        h256(&bytes).bytes().to_vec()
    }

    fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }
}
