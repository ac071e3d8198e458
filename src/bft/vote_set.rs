/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Incremental tallying of the [`Vote`]s of one (vote type, height, view).

use std::{
    collections::{BTreeMap, HashSet},
    fmt::{self, Display, Formatter},
};

use crate::types::{
    crypto_primitives::Signature,
    data_types::{Address, CryptoHash},
    signed_messages::SignedMessage,
};

use super::types::{Proof, Vote, VoteType};

/// The number of validators, out of `n`, that form a quorum: strictly more than two thirds.
pub const fn quorum(n: usize) -> usize {
    n * 2 / 3 + 1
}

/// Collects the votes of one (vote type, height, view) from a given validator list, and tells when
/// they form a quorum.
///
/// Each validator counts once. A validator that casts two different votes in the same set is an
/// equivocator: both of its votes are discarded, and it is ignored for the rest of the set.
pub struct VoteSet {
    vote_type: VoteType,
    height: u64,
    view: u32,
    validators: Vec<Address>,
    approvals: BTreeMap<Address, Vote>,
    rejections: BTreeMap<Address, Vote>,
    equivocators: HashSet<Address>,
}

impl VoteSet {
    pub fn new(vote_type: VoteType, height: u64, view: u32, validators: Vec<Address>) -> VoteSet {
        VoteSet {
            vote_type,
            height,
            view,
            validators,
            approvals: BTreeMap::new(),
            rejections: BTreeMap::new(),
            equivocators: HashSet::new(),
        }
    }

    /// Add `vote` to the set.
    ///
    /// Returns `Ok(true)` if the vote was counted, and `Ok(false)` if the same vote was already counted.
    /// The vote that reveals an equivocation returns [`VoteError::Equivocation`]; any later vote from
    /// the same validator returns [`VoteError::Ignored`].
    pub fn add_vote(&mut self, vote: Vote) -> Result<bool, VoteError> {
        if vote.vote_type != self.vote_type {
            return Err(VoteError::WrongType);
        }
        if vote.height != self.height {
            return Err(VoteError::WrongHeight);
        }
        if vote.view != self.view {
            return Err(VoteError::WrongView);
        }

        let signer = match vote.signer() {
            Some(signer) if self.validators.contains(&signer) => signer,
            _ => return Err(VoteError::NotValidator),
        };
        if !vote.validate() {
            return Err(VoteError::InvalidSignature);
        }
        if self.equivocators.contains(&signer) {
            return Err(VoteError::Ignored);
        }

        let previous = self
            .approvals
            .get(&signer)
            .or_else(|| self.rejections.get(&signer));
        match previous {
            Some(previous)
                if previous.approve == vote.approve && previous.block_hash == vote.block_hash =>
            {
                Ok(false)
            }
            Some(_) => {
                self.approvals.remove(&signer);
                self.rejections.remove(&signer);
                self.equivocators.insert(signer);
                Err(VoteError::Equivocation { validator: signer })
            }
            None => {
                if vote.approve {
                    self.approvals.insert(signer, vote);
                } else {
                    self.rejections.insert(signer, vote);
                }
                Ok(true)
            }
        }
    }

    /// Add every vote in `votes`, ignoring the ones that cannot be counted.
    pub fn add_votes(&mut self, votes: impl IntoIterator<Item = Vote>) {
        for vote in votes {
            let _ = self.add_vote(vote);
        }
    }

    /// Whether a quorum of validators approved the block with `block_hash`.
    pub fn has_quorum(&self, block_hash: &CryptoHash) -> bool {
        self.approval_count(block_hash) >= quorum(self.validators.len())
    }

    /// The block approved by a quorum of validators, if any.
    ///
    /// Since honest validators never vote twice in a set, two blocks cannot both gather a quorum
    /// unless more than a third of the validators equivocate.
    pub fn any_approved(&self) -> Option<CryptoHash> {
        let mut hashes: Vec<CryptoHash> = self.approvals.values().map(|vote| vote.block_hash).collect();
        hashes.sort();
        hashes.dedup();
        hashes.into_iter().find(|hash| self.has_quorum(hash))
    }

    /// Whether a quorum of validators rejected the view.
    pub fn is_rejected(&self) -> bool {
        self.rejections.len() >= quorum(self.validators.len())
    }

    /// A proof made of the approvals of `block_hash`, if they form a quorum.
    pub fn quorum_proof(&self, block_hash: &CryptoHash) -> Option<Proof> {
        if self.has_quorum(block_hash) {
            Some(Proof::new(self.height, self.view, self.approvals(block_hash)))
        } else {
            None
        }
    }

    /// The rejections counted so far, ordered by signer.
    pub fn rejections(&self) -> Vec<Vote> {
        self.rejections.values().cloned().collect()
    }

    /// The approvals of `block_hash` counted so far, ordered by signer.
    pub fn approvals(&self, block_hash: &CryptoHash) -> Vec<Vote> {
        self.approvals
            .values()
            .filter(|vote| vote.block_hash == *block_hash)
            .cloned()
            .collect()
    }

    /// The signatures of the approvals of `block_hash`, in the form they are stored in a block.
    pub fn signatures(&self, block_hash: &CryptoHash) -> Vec<Signature> {
        self.approvals(block_hash)
            .into_iter()
            .filter_map(|vote| vote.signature)
            .collect()
    }

    /// The number of votes counted.
    pub fn size(&self) -> usize {
        self.approvals.len() + self.rejections.len()
    }

    fn approval_count(&self, block_hash: &CryptoHash) -> usize {
        self.approvals
            .values()
            .filter(|vote| vote.block_hash == *block_hash)
            .count()
    }
}

/// Why a vote could not be added to a [`VoteSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteError {
    WrongType,
    WrongHeight,
    WrongView,
    /// The vote is unsigned, or its signer is not in the validator list.
    NotValidator,
    InvalidSignature,
    /// `validator` cast conflicting votes in the same set. Returned once per validator and set.
    Equivocation { validator: Address },
    /// The signer already equivocated in this set.
    Ignored,
}

impl Display for VoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            VoteError::WrongType => write!(f, "vote of the wrong type"),
            VoteError::WrongHeight => write!(f, "vote for the wrong height"),
            VoteError::WrongView => write!(f, "vote for the wrong view"),
            VoteError::NotValidator => write!(f, "vote not signed by a validator"),
            VoteError::InvalidSignature => write!(f, "vote has an invalid signature"),
            VoteError::Equivocation { validator } => write!(f, "{} equivocated", validator),
            VoteError::Ignored => write!(f, "vote from a known equivocator"),
        }
    }
}
