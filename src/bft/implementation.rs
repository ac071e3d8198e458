/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Event-driven implementation of the BFT engine described in the [module docs](super), and the
//! thread that drives it.
//!
//! Main type: [`BftEngine`].
//!
//! The engine keeps a single deadline: the time at which its current [`State`] times out. The
//! [engine thread](start_bft) waits for messages until the deadline, handing each one to
//! [`on_message`](BftEngine::on_message), and calls [`on_timeout`](BftEngine::on_timeout) once it
//! passes. Every handler either moves the engine forward or leaves it where it is; none of them
//! blocks, except for [`sync`](BftEngine::sync).
//!
//! ## Retransmission
//!
//! With few validators, a single lost message can keep a view from ever gathering a quorum. When
//! `PRE_COMMIT` times out with neither an approve nor a reject quorum, the engine re-enters
//! `PROPOSE` in the same view, which re-broadcasts the proposal (if it is the primary) and every vote
//! it has cast in the view. A validator never casts two different votes of the same type in a view:
//! on re-entry it re-sends the vote it cast the first time.

use std::{
    collections::{hash_map::Entry, HashMap},
    fmt::{self, Display, Formatter},
    sync::{
        mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant, SystemTime},
};

use log::{debug, error, info, trace, warn};

use crate::{
    block_sync::{SyncError, SyncManager},
    chain::{
        blockchain::{now_ms, Blockchain, ExecutedBlock},
        ChainError, ImportError,
    },
    config::{BftTimeouts, Configuration},
    events::*,
    executor::vm::Vm,
    networking::{messages::Message, network::Network, sending::SenderHandle},
    pending::PendingPool,
    state::pluggables::KVStore,
    types::{
        block::{Block, BlockHeader},
        crypto_primitives::Keypair,
        data_types::{Address, CryptoHash},
        signed_messages::SignedMessage,
        transaction::Transaction,
    },
};

use super::{
    types::{Proof, Proposal, Vote, VoteType},
    validator_selection::primary_validator,
    vote_set::{VoteError, VoteSet},
};

/// How long the engine thread waits for a message before checking for the shutdown signal again.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The state of the engine within a view. See the [module docs](super) for what happens in each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    NewHeight,
    Propose,
    Validate,
    PreCommit,
    Commit,
    Finalize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    /// Catching up with peers through the [`SyncManager`].
    Syncing,
    /// Stopped after a fatal error. The engine thread has exited.
    Halted,
}

/// The block threshold to sync to after a peer announced `new_height`, given the engine's current
/// `height` and the latest block numbers of the active validator peers.
///
/// Returns `None` unless the announced height is above the local one. Otherwise the target is one
/// above the latest block number that at least two thirds (rounded up) of the peers have reached, so
/// that a minority of peers announcing far-away heights cannot trigger a sync. The engine syncs only
/// if the target is above the local height.
pub fn sync_target(height: u64, new_height: u64, peer_latest: &[u64]) -> Option<u64> {
    if new_height <= height || peer_latest.is_empty() {
        return None;
    }

    let mut sorted = peer_latest.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let q = (2 * sorted.len() + 2) / 3;
    let target = sorted[q - 1].saturating_add(1);

    if target > height {
        Some(target)
    } else {
        None
    }
}

/// A fatal error that halts the engine.
#[derive(Debug)]
pub enum BftError {
    Chain(ChainError),
}

impl From<ChainError> for BftError {
    fn from(err: ChainError) -> Self {
        BftError::Chain(err)
    }
}

impl From<SyncError> for BftError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Chain(err) => BftError::Chain(err),
        }
    }
}

impl Display for BftError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BftError::Chain(err) => write!(f, "chain error: {}", err),
        }
    }
}

/// A block of the current height that passed validation, along with the state changes its execution
/// caused, kept until the height is finalized.
struct CandidateBlock {
    header: BlockHeader,
    transactions: Vec<Transaction>,
    executed: ExecutedBlock,
}

/// A single validator's participation in the BFT protocol.
///
/// The engine is the only writer of the chain. Besides the blocks it finalizes, it writes the blocks
/// its [`SyncManager`] downloads while the engine is [syncing](Status::Syncing).
pub(crate) struct BftEngine<K: KVStore, N: Network, V: Vm, S: SyncManager<K, V>> {
    keypair: Keypair,
    me: Address,
    chain: Blockchain<K>,
    vm: V,
    pending: Arc<Mutex<PendingPool>>,
    sync_manager: S,
    sender: SenderHandle<N>,
    messages: Receiver<(Address, Message)>,
    transactions: Receiver<(Address, Transaction)>,
    timeouts: BftTimeouts,
    sync_timeout: Duration,
    event_publisher: Option<Sender<Event>>,

    status: Status,
    state: State,
    height: u64,
    view: u32,
    /// Justifies the current view: empty in view 0, and otherwise a quorum of `PRE_COMMIT`
    /// rejections of the previous view.
    proof: Proof,
    validators: Vec<Address>,
    deadline: Instant,

    proposal: Option<Proposal>,
    valid_blocks: HashMap<CryptoHash, CandidateBlock>,
    validate_votes: VoteSet,
    pre_commit_votes: VoteSet,
    commit_votes: VoteSet,
    /// The votes this validator cast in the current view.
    my_votes: HashMap<VoteType, Vote>,
    /// The latest block number of each peer, as implied by its `NewHeight` and `NewView` messages.
    peer_latest: HashMap<Address, u64>,
}

impl<K: KVStore, N: Network, V: Vm, S: SyncManager<K, V>> BftEngine<K, N, V, S> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        chain: Blockchain<K>,
        vm: V,
        pending: Arc<Mutex<PendingPool>>,
        sync_manager: S,
        network: N,
        messages: Receiver<(Address, Message)>,
        transactions: Receiver<(Address, Transaction)>,
        configuration: &Configuration,
        event_publisher: Option<Sender<Event>>,
    ) -> Self {
        let keypair = Keypair::new(configuration.me.clone());
        let me = keypair.address();
        Self {
            keypair,
            me,
            chain,
            vm,
            pending,
            sync_manager,
            sender: SenderHandle::new(network),
            messages,
            transactions,
            timeouts: configuration.timeouts,
            sync_timeout: configuration.sync_timeout,
            event_publisher,

            status: Status::Running,
            state: State::NewHeight,
            height: 0,
            view: 0,
            proof: Proof::new(0, 0, Vec::new()),
            validators: Vec::new(),
            deadline: Instant::now(),

            proposal: None,
            valid_blocks: HashMap::new(),
            validate_votes: VoteSet::new(VoteType::Validate, 0, 0, Vec::new()),
            pre_commit_votes: VoteSet::new(VoteType::PreCommit, 0, 0, Vec::new()),
            commit_votes: VoteSet::new(VoteType::Commit, 0, 0, Vec::new()),
            my_votes: HashMap::new(),
            peer_latest: HashMap::new(),
        }
    }

    /* ↓↓↓ State transitions ↓↓↓ */

    /// Start deciding the block after the latest one, in view 0.
    pub(crate) fn enter_new_height(&mut self) -> Result<(), BftError> {
        self.state = State::NewHeight;
        self.height = self.chain.latest_block_number()? + 1;
        self.view = 0;
        self.proof = Proof::new(self.height, 0, Vec::new());
        self.validators = self.chain.validators()?;
        self.valid_blocks.clear();
        self.reset_view();
        self.deadline = Instant::now() + self.timeouts.new_height;

        info!("Entered height {} with {} validators", self.height, self.validators.len());
        self.sender.broadcast(Message::NewHeight(self.height));
        Event::NewHeight(NewHeightEvent {
            timestamp: SystemTime::now(),
            height: self.height,
            validators: self.validators.clone(),
        })
        .publish(&self.event_publisher);
        Ok(())
    }

    /// Enter `PROPOSE`. The primary of the view proposes a block, or re-broadcasts the one it already
    /// proposed. Every validator re-sends the votes it cast in the view, and, past view 0, the proof
    /// of the view.
    pub(crate) fn enter_propose(&mut self) -> Result<(), BftError> {
        self.state = State::Propose;
        self.deadline = Instant::now() + self.timeouts.propose;

        let primary = self.primary(self.view);
        debug!("Entered PROPOSE of height {}, view {}", self.height, self.view);
        Event::NewView(NewViewEvent {
            timestamp: SystemTime::now(),
            height: self.height,
            view: self.view,
            primary,
        })
        .publish(&self.event_publisher);

        if primary == Some(self.me) {
            if let Some(proposal) = self.proposal.clone() {
                self.sender.broadcast(proposal);
            } else {
                let proposal = self.propose_block()?;
                self.sender.broadcast(proposal.clone());
                Event::Propose(ProposeEvent {
                    timestamp: SystemTime::now(),
                    proposal: proposal.clone(),
                })
                .publish(&self.event_publisher);
                self.proposal = Some(proposal);
            }
        }

        for vote in self.my_votes.values() {
            self.sender.broadcast(vote.clone());
        }
        if self.view > 0 {
            self.sender.broadcast(self.proof.clone());
        }
        Ok(())
    }

    /// Enter `VALIDATE`, and vote on whether the proposal of the view is valid.
    pub(crate) fn enter_validate(&mut self) -> Result<(), BftError> {
        self.state = State::Validate;
        self.deadline = Instant::now() + self.timeouts.validate;
        debug!("Entered VALIDATE of height {}, view {}", self.height, self.view);

        let proposal = self.proposal.clone();
        let approved = match &proposal {
            Some(proposal) if self.validate_block_proposal(proposal)? => Some(proposal.header.hash),
            _ => None,
        };
        self.vote(VoteType::Validate, approved);
        self.advance()
    }

    /// Enter `PRE_COMMIT`, and approve the block that gathered a `VALIDATE` quorum, if there is one
    /// and it is valid here too.
    pub(crate) fn enter_pre_commit(&mut self) -> Result<(), BftError> {
        self.state = State::PreCommit;
        self.deadline = Instant::now() + self.timeouts.pre_commit;
        debug!("Entered PRE_COMMIT of height {}, view {}", self.height, self.view);

        let approved = match self.validate_votes.any_approved() {
            Some(hash) if self.is_valid_block(&hash)? => Some(hash),
            _ => None,
        };
        self.vote(VoteType::PreCommit, approved);
        self.advance()
    }

    /// Enter `COMMIT`. Only called once a block has gathered a `PRE_COMMIT` quorum.
    pub(crate) fn enter_commit(&mut self) -> Result<(), BftError> {
        let hash = match self.pre_commit_votes.any_approved() {
            Some(hash) => hash,
            None => return self.next_view(),
        };

        self.state = State::Commit;
        self.deadline = Instant::now() + self.timeouts.commit;
        info!("Committing block {} at height {}, view {}", hash, self.height, self.view);

        self.vote(VoteType::Commit, Some(hash));
        self.advance()
    }

    /// Enter `FINALIZE`, and persist the block that gathered a `PRE_COMMIT` quorum along with the
    /// signatures of that quorum.
    ///
    /// If the block never reached this validator, it starts the height over and catches up through
    /// sync once its peers announce the next height.
    pub(crate) fn enter_finalize(&mut self) -> Result<(), BftError> {
        self.state = State::Finalize;
        self.deadline = Instant::now() + self.timeouts.finalize;

        let candidate = self
            .pre_commit_votes
            .any_approved()
            .and_then(|hash| self.valid_blocks.remove(&hash).map(|candidate| (hash, candidate)));
        let (hash, candidate) = match candidate {
            Some(candidate) => candidate,
            None => {
                warn!("Block of height {} is not available locally, starting the height over", self.height);
                return self.enter_new_height();
            }
        };

        let block = Block::new(
            candidate.header,
            candidate.transactions,
            candidate.executed.results,
            self.view,
            self.pre_commit_votes.signatures(&hash),
        );
        let new_validators = self.chain.put_block(&block, &candidate.executed.updates)?;
        info!(
            "Finalized block {} at height {} with {} transactions",
            hash,
            block.number(),
            block.transactions.len()
        );

        if let Some(validators) = new_validators {
            self.sender.update_validators(&validators);
            Event::UpdateValidators(UpdateValidatorsEvent {
                timestamp: SystemTime::now(),
                cause_block: hash,
                validators,
            })
            .publish(&self.event_publisher);
        }

        self.prune_pending(&block)?;
        Event::FinalizeBlock(FinalizeBlockEvent {
            timestamp: SystemTime::now(),
            block,
        })
        .publish(&self.event_publisher);
        Ok(())
    }

    /// Handle the deadline of the current state passing.
    pub(crate) fn on_timeout(&mut self) -> Result<(), BftError> {
        Event::ViewTimeout(ViewTimeoutEvent {
            timestamp: SystemTime::now(),
            height: self.height,
            view: self.view,
            state: self.state,
            timeout: self.timeout(self.state),
        })
        .publish(&self.event_publisher);

        match self.state {
            State::NewHeight => self.enter_propose(),
            State::Propose => self.enter_validate(),
            State::Validate => self.enter_pre_commit(),
            State::PreCommit => {
                if self.pre_commit_votes.any_approved().is_some() {
                    self.enter_commit()
                } else if self.pre_commit_votes.is_rejected() {
                    self.next_view()
                } else {
                    self.enter_propose()
                }
            }
            // A PRE_COMMIT quorum is enough to finalize, even without a COMMIT quorum.
            State::Commit => self.enter_finalize(),
            State::Finalize => self.enter_new_height(),
        }
    }

    /// Move to the view after the current one, justified by the `PRE_COMMIT` rejections of the
    /// current view.
    fn next_view(&mut self) -> Result<(), BftError> {
        let proof = Proof::new(self.height, self.view + 1, self.pre_commit_votes.rejections());
        self.jump_to_view(self.view + 1, proof)
    }

    /// Move to `view` of the current height, justified by `proof`, and enter `PROPOSE`.
    pub(crate) fn jump_to_view(&mut self, view: u32, proof: Proof) -> Result<(), BftError> {
        info!("Moving to view {} of height {}", view, self.height);
        self.view = view;
        self.proof = proof;
        self.reset_view();
        self.enter_propose()
    }

    /// Move to the next state early if the votes collected so far allow it.
    fn advance(&mut self) -> Result<(), BftError> {
        match self.state {
            State::Propose | State::Validate | State::PreCommit
                if self.pre_commit_votes.is_rejected() =>
            {
                self.next_view()
            }
            State::Validate if self.validate_votes.any_approved().is_some() => self.enter_pre_commit(),
            State::PreCommit if self.pre_commit_votes.any_approved().is_some() => self.enter_commit(),
            State::Commit if self.commit_votes.any_approved().is_some() => self.enter_finalize(),
            _ => Ok(()),
        }
    }

    /* ↓↓↓ Message handlers ↓↓↓ */

    pub(crate) fn on_message(&mut self, origin: Address, message: Message) -> Result<(), BftError> {
        match message {
            Message::NewHeight(new_height) => self.on_new_height(origin, new_height),
            Message::NewView(proof) => self.on_new_view(origin, proof),
            Message::Proposal(proposal) => self.on_proposal(origin, proposal),
            Message::Vote(vote) => self.on_vote(origin, vote),
            _ => Ok(()),
        }
    }

    /// Record that `origin` has finalized the height before `new_height`, and sync if a quorum of
    /// the validators is ahead.
    pub(crate) fn on_new_height(&mut self, origin: Address, new_height: u64) -> Result<(), BftError> {
        trace!("Peer {} entered height {}", origin, new_height);
        self.peer_latest.insert(origin, new_height.saturating_sub(1));

        if self.state == State::Finalize {
            return Ok(());
        }
        match sync_target(self.height, new_height, &self.validator_peers_latest()) {
            Some(target) => self.sync(target),
            None => Ok(()),
        }
    }

    /// Follow a validator that moved to a later view of the current height, if its proof shows that
    /// a quorum rejected the view before.
    pub(crate) fn on_new_view(&mut self, origin: Address, proof: Proof) -> Result<(), BftError> {
        trace!("Peer {} entered view {} of height {}", origin, proof.view, proof.height);
        self.peer_latest.insert(origin, proof.height.saturating_sub(1));

        if proof.height == self.height
            && proof.view > self.view
            && !matches!(self.state, State::Commit | State::Finalize)
            && self.is_view_change_proof(&proof, proof.view)
        {
            self.jump_to_view(proof.view, proof)
        } else {
            Ok(())
        }
    }

    pub(crate) fn on_proposal(&mut self, origin: Address, proposal: Proposal) -> Result<(), BftError> {
        if proposal.height() != self.height {
            return Ok(());
        }

        let view = proposal.view();
        let signer = proposal.signer();
        if signer.is_none() || signer != self.primary(view) {
            warn!("Proposal for height {}, view {} not signed by the primary", self.height, view);
            return Ok(());
        }
        if !proposal.validate() {
            warn!("Invalid proposal for height {}, view {} from {}", self.height, view, origin);
            return Ok(());
        }
        let justified = if view == 0 {
            proposal.proof.votes.is_empty()
        } else {
            self.is_view_change_proof(&proposal.proof, view)
        };
        if !justified {
            warn!("Unjustified proposal for height {}, view {}", self.height, view);
            return Ok(());
        }

        let accepted = !matches!(self.state, State::Commit | State::Finalize)
            && (view > self.view || (view == self.view && self.proposal.is_none()));
        if !accepted {
            return Ok(());
        }

        debug!("Received proposal {} for height {}, view {}", proposal.header.hash, self.height, view);
        Event::ReceiveProposal(ReceiveProposalEvent {
            timestamp: SystemTime::now(),
            origin,
            proposal: proposal.clone(),
        })
        .publish(&self.event_publisher);
        self.sender.broadcast(proposal.clone());

        if view > self.view {
            self.jump_to_view(view, proposal.proof.clone())?;
        }
        self.proposal = Some(proposal);
        Ok(())
    }

    pub(crate) fn on_vote(&mut self, origin: Address, vote: Vote) -> Result<(), BftError> {
        if vote.height != self.height || vote.view != self.view {
            return Ok(());
        }

        Event::ReceiveVote(ReceiveVoteEvent {
            timestamp: SystemTime::now(),
            origin,
            vote: vote.clone(),
        })
        .publish(&self.event_publisher);

        let vote_type = vote.vote_type;
        match self.vote_set(vote_type).add_vote(vote) {
            Ok(true) => self.advance(),
            Ok(false) => Ok(()),
            Err(VoteError::Equivocation { validator }) => {
                warn!("{} equivocated on {:?} at height {}, view {}", validator, vote_type, self.height, self.view);
                Event::Equivocation(EquivocationEvent {
                    timestamp: SystemTime::now(),
                    validator,
                    vote_type,
                    height: self.height,
                    view: self.view,
                })
                .publish(&self.event_publisher);
                self.sender.report_misbehavior(validator);
                Ok(())
            }
            Err(err) => {
                debug!("Ignoring vote from {}: {}", origin, err);
                Ok(())
            }
        }
    }

    /// Catch up to `target` through the [`SyncManager`], then start the height after the latest
    /// block.
    pub(crate) fn sync(&mut self, target: u64) -> Result<(), BftError> {
        self.status = Status::Syncing;
        info!("Syncing from height {} to {}", self.height, target);
        Event::StartSync(StartSyncEvent {
            timestamp: SystemTime::now(),
            height: self.height,
            target,
        })
        .publish(&self.event_publisher);

        let deadline = Instant::now() + self.sync_timeout;
        let outcome = self
            .sync_manager
            .request_sync_to(&mut self.chain, &mut self.vm, target, deadline)?;

        info!("Synced {} blocks", outcome.blocks_synced);
        Event::EndSync(EndSyncEvent {
            timestamp: SystemTime::now(),
            blocks_synced: outcome.blocks_synced,
            reached_target: outcome.reached_target,
        })
        .publish(&self.event_publisher);

        self.status = Status::Running;
        self.prune_stale_pending()?;
        self.enter_new_height()
    }

    /* ↓↓↓ Blocks ↓↓↓ */

    /// Build a block out of the pending transactions, and wrap it in a signed proposal justified by
    /// the proof of the current view.
    pub(crate) fn propose_block(&mut self) -> Result<Proposal, BftError> {
        let candidates = self.pool().candidates();
        let parent = self.chain.latest_header()?;
        let timestamp = now_ms().max(parent.timestamp);
        let built = self.chain.build_block(self.me, timestamp, candidates, &mut self.vm)?;

        info!(
            "Proposing block {} at height {}, view {} with {} transactions",
            built.header.hash,
            self.height,
            self.view,
            built.transactions.len()
        );
        let proposal = Proposal::new(self.proof.clone(), built.header.clone(), built.transactions.clone())
            .sign(&self.keypair);
        self.valid_blocks.insert(
            built.header.hash,
            CandidateBlock {
                header: built.header,
                transactions: built.transactions,
                executed: built.executed,
            },
        );
        Ok(proposal)
    }

    /// Whether the block in `proposal` is a valid next block. Executing it is only done once per
    /// block and height.
    pub(crate) fn validate_block_proposal(&mut self, proposal: &Proposal) -> Result<bool, BftError> {
        let hash = proposal.header.hash;
        if self.valid_blocks.contains_key(&hash) {
            return Ok(true);
        }

        match self
            .chain
            .validate_block(&proposal.header, &proposal.transactions, &mut self.vm)
        {
            Ok(executed) => {
                self.valid_blocks.insert(
                    hash,
                    CandidateBlock {
                        header: proposal.header.clone(),
                        transactions: proposal.transactions.clone(),
                        executed,
                    },
                );
                Ok(true)
            }
            Err(ImportError::Chain(err)) => Err(err.into()),
            Err(err) => {
                warn!("Proposed block {} at height {} is invalid: {}", hash, self.height, err);
                Ok(false)
            }
        }
    }

    fn is_valid_block(&mut self, hash: &CryptoHash) -> Result<bool, BftError> {
        if self.valid_blocks.contains_key(hash) {
            return Ok(true);
        }
        match self.proposal.clone() {
            Some(proposal) if proposal.header.hash == *hash => self.validate_block_proposal(&proposal),
            _ => Ok(false),
        }
    }

    /* ↓↓↓ Helpers ↓↓↓ */

    /// Whether `proof` justifies `view` of the current height: it must carry a quorum of
    /// `PRE_COMMIT` rejections of the view before.
    fn is_view_change_proof(&self, proof: &Proof, view: u32) -> bool {
        if proof.height != self.height || proof.view != view || view == 0 {
            return false;
        }
        let mut rejections =
            VoteSet::new(VoteType::PreCommit, self.height, view - 1, self.validators.clone());
        rejections.add_votes(proof.votes.iter().filter(|vote| !vote.approve).cloned());
        rejections.is_rejected()
    }

    /// Cast this validator's vote of `vote_type` in the current view: an approval of the given block,
    /// or a rejection. A vote already cast in the view is re-sent instead.
    fn vote(&mut self, vote_type: VoteType, approved: Option<CryptoHash>) {
        let vote = match self.my_votes.get(&vote_type) {
            Some(vote) => vote.clone(),
            None => {
                let vote = match approved {
                    Some(hash) => Vote::new_approve(vote_type, self.height, self.view, hash),
                    None => Vote::new_reject(vote_type, self.height, self.view),
                }
                .sign(&self.keypair);
                self.my_votes.insert(vote_type, vote.clone());
                Event::Vote(VoteEvent {
                    timestamp: SystemTime::now(),
                    vote: vote.clone(),
                })
                .publish(&self.event_publisher);
                vote
            }
        };

        // Our own vote can only fail to count if we are not a validator.
        let _ = self.vote_set(vote_type).add_vote(vote.clone());
        self.sender.broadcast(vote);
    }

    fn vote_set(&mut self, vote_type: VoteType) -> &mut VoteSet {
        match vote_type {
            VoteType::Validate => &mut self.validate_votes,
            VoteType::PreCommit => &mut self.pre_commit_votes,
            VoteType::Commit => &mut self.commit_votes,
        }
    }

    fn reset_view(&mut self) {
        self.proposal = None;
        self.my_votes.clear();
        self.validate_votes =
            VoteSet::new(VoteType::Validate, self.height, self.view, self.validators.clone());
        self.pre_commit_votes =
            VoteSet::new(VoteType::PreCommit, self.height, self.view, self.validators.clone());
        self.commit_votes = VoteSet::new(VoteType::Commit, self.height, self.view, self.validators.clone());
    }

    fn primary(&self, view: u32) -> Option<Address> {
        primary_validator(
            &self.validators,
            self.height,
            view,
            self.chain.chain_spec().uniform_distribution,
        )
        .copied()
    }

    /// The latest block numbers of the validators this node is connected to. Validators that have not
    /// announced a height yet count as being at block 0.
    fn validator_peers_latest(&self) -> Vec<u64> {
        self.sender
            .active_validators(&self.validators)
            .iter()
            .map(|peer| self.peer_latest.get(peer).copied().unwrap_or(0))
            .collect()
    }

    fn timeout(&self, state: State) -> Duration {
        match state {
            State::NewHeight => self.timeouts.new_height,
            State::Propose => self.timeouts.propose,
            State::Validate => self.timeouts.validate,
            State::PreCommit => self.timeouts.pre_commit,
            State::Commit => self.timeouts.commit,
            State::Finalize => self.timeouts.finalize,
        }
    }

    fn pool(&self) -> MutexGuard<'_, PendingPool> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the transactions received from peers into the pending pool.
    fn drain_transactions(&mut self) {
        let now = now_ms();
        let mut pool = self.pool();
        while let Ok((origin, tx)) = self.transactions.try_recv() {
            if let Err(err) = pool.add_transaction(tx, now) {
                trace!("Dropped transaction from {}: {}", origin, err);
            }
        }
    }

    /// Remove the transactions of `block` from the pending pool, along with the ones it made stale.
    fn prune_pending(&self, block: &Block) -> Result<(), BftError> {
        self.pool().remove_included(block);
        self.prune_stale_pending()
    }

    /// Remove the pending transactions whose nonce their sender has already used, and the ones too
    /// old to be included in a block.
    fn prune_stale_pending(&self) -> Result<(), BftError> {
        let mut pool = self.pool();
        pool.remove_expired(now_ms());
        let mut next_nonces = HashMap::new();
        for tx in pool.candidates() {
            if let Some(sender) = tx.sender() {
                if let Entry::Vacant(entry) = next_nonces.entry(sender) {
                    entry.insert(self.chain.account(&sender)?.nonce);
                }
            }
        }
        pool.remove_stale(|tx| {
            tx.sender()
                .and_then(|sender| next_nonces.get(&sender))
                .map_or(true, |next_nonce| tx.nonce < *next_nonce)
        });
        Ok(())
    }

    /// Wait for the next message until the deadline, and handle it, or handle the deadline passing.
    fn step(&mut self) -> Result<(), BftError> {
        self.drain_transactions();

        let now = Instant::now();
        if now >= self.deadline {
            return self.on_timeout();
        }
        match self.messages.recv_timeout((self.deadline - now).min(POLL_INTERVAL)) {
            Ok((origin, message)) => self.on_message(origin, message),
            Err(RecvTimeoutError::Timeout) => Ok(()),
            // The poller only hangs up after the engine has been told to shut down.
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(POLL_INTERVAL);
                Ok(())
            }
        }
    }

    fn halt(&mut self, err: BftError) {
        error!("Halting at height {}: {}", self.height, err);
        self.status = Status::Halted;
        Event::Halt(HaltEvent {
            timestamp: SystemTime::now(),
            height: self.height,
            reason: err.to_string(),
        })
        .publish(&self.event_publisher);
    }
}

/// Spawn the engine thread, which runs `engine` from the height after the latest block until the
/// shutdown signal arrives or the engine [halts](Status::Halted).
pub(crate) fn start_bft<K, N, V, S>(
    mut engine: BftEngine<K, N, V, S>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()>
where
    K: KVStore,
    N: Network + 'static,
    V: Vm,
    S: SyncManager<K, V>,
{
    thread::spawn(move || {
        if let Err(err) = engine.enter_new_height() {
            engine.halt(err);
            return;
        }

        loop {
            match shutdown_signal.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => return,
                Err(TryRecvError::Empty) => (),
            }

            if engine.status == Status::Halted {
                return;
            }
            if let Err(err) = engine.step() {
                engine.halt(err);
                return;
            }
        }
    })
}
