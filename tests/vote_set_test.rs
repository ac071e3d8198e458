use ed25519_dalek::SigningKey;
use rand_core::OsRng;

use rialto::{
    bft::{
        types::{Vote, VoteType},
        vote_set::{quorum, VoteError, VoteSet},
    },
    types::{
        crypto_primitives::Keypair,
        data_types::{Address, CryptoHash},
    },
};

fn keypairs(n: usize) -> Vec<Keypair> {
    let mut csprg = OsRng {};
    (0..n)
        .map(|_| Keypair::new(SigningKey::generate(&mut csprg)))
        .collect()
}

fn addresses(keypairs: &[Keypair]) -> Vec<Address> {
    keypairs.iter().map(Keypair::address).collect()
}

#[test]
fn quorum_size_test() {
    assert_eq!(quorum(1), 1);
    assert_eq!(quorum(2), 2);
    assert_eq!(quorum(3), 3);
    assert_eq!(quorum(4), 3);
    assert_eq!(quorum(5), 4);
    assert_eq!(quorum(6), 5);
    assert_eq!(quorum(7), 5);
    assert_eq!(quorum(100), 67);
}

/// Tests that a block is approved exactly when the number of distinct approvals reaches the quorum.
#[test]
fn quorum_boundary_test() {
    let keypairs = keypairs(4);
    let block = CryptoHash::new([1u8; 32]);
    let mut set = VoteSet::new(VoteType::Validate, 5, 0, addresses(&keypairs));

    for (i, keypair) in keypairs.iter().take(2).enumerate() {
        let vote = Vote::new_approve(VoteType::Validate, 5, 0, block).sign(keypair);
        assert_eq!(set.add_vote(vote), Ok(true));
        assert_eq!(set.size(), i + 1);
        assert!(!set.has_quorum(&block));
    }
    assert_eq!(set.any_approved(), None);
    assert_eq!(set.quorum_proof(&block), None);

    // Adding the same vote again is not counted twice.
    let repeat = Vote::new_approve(VoteType::Validate, 5, 0, block).sign(&keypairs[0]);
    assert_eq!(set.add_vote(repeat), Ok(false));
    assert!(!set.has_quorum(&block));

    let third = Vote::new_approve(VoteType::Validate, 5, 0, block).sign(&keypairs[2]);
    assert_eq!(set.add_vote(third), Ok(true));
    assert!(set.has_quorum(&block));
    assert_eq!(set.any_approved(), Some(block));

    let proof = set.quorum_proof(&block).unwrap();
    assert_eq!((proof.height, proof.view), (5, 0));
    assert_eq!(proof.votes.len(), 3);
    assert_eq!(set.signatures(&block).len(), 3);
}

/// Tests that approvals of different blocks are counted separately.
#[test]
fn split_votes_test() {
    let keypairs = keypairs(4);
    let a = CryptoHash::new([1u8; 32]);
    let b = CryptoHash::new([2u8; 32]);
    let mut set = VoteSet::new(VoteType::Commit, 1, 2, addresses(&keypairs));

    set.add_votes([
        Vote::new_approve(VoteType::Commit, 1, 2, a).sign(&keypairs[0]),
        Vote::new_approve(VoteType::Commit, 1, 2, a).sign(&keypairs[1]),
        Vote::new_approve(VoteType::Commit, 1, 2, b).sign(&keypairs[2]),
        Vote::new_reject(VoteType::Commit, 1, 2).sign(&keypairs[3]),
    ]);

    assert_eq!(set.size(), 4);
    assert!(!set.has_quorum(&a));
    assert!(!set.has_quorum(&b));
    assert!(!set.is_rejected());
    assert_eq!(set.approvals(&a).len(), 2);
    assert_eq!(set.rejections().len(), 1);
}

#[test]
fn rejection_quorum_test() {
    let keypairs = keypairs(3);
    let mut set = VoteSet::new(VoteType::PreCommit, 7, 1, addresses(&keypairs));

    for keypair in &keypairs {
        assert!(!set.is_rejected());
        set.add_vote(Vote::new_reject(VoteType::PreCommit, 7, 1).sign(keypair))
            .unwrap();
    }
    assert!(set.is_rejected());
    assert_eq!(set.any_approved(), None);
}

/// Tests that a validator that votes twice differently in the same set has both votes discarded, and
/// is ignored from then on.
#[test]
fn equivocation_test() {
    let keypairs = keypairs(4);
    let equivocator = keypairs[0].address();
    let block = CryptoHash::new([1u8; 32]);
    let mut set = VoteSet::new(VoteType::PreCommit, 3, 0, addresses(&keypairs));

    set.add_vote(Vote::new_approve(VoteType::PreCommit, 3, 0, block).sign(&keypairs[0]))
        .unwrap();
    assert_eq!(
        set.add_vote(Vote::new_reject(VoteType::PreCommit, 3, 0).sign(&keypairs[0])),
        Err(VoteError::Equivocation {
            validator: equivocator
        })
    );
    assert_eq!(set.size(), 0);

    // Even the original vote is no longer accepted, and the equivocation is reported only once.
    assert_eq!(
        set.add_vote(Vote::new_approve(VoteType::PreCommit, 3, 0, block).sign(&keypairs[0])),
        Err(VoteError::Ignored)
    );
    assert_eq!(
        set.add_vote(Vote::new_reject(VoteType::PreCommit, 3, 0).sign(&keypairs[0])),
        Err(VoteError::Ignored)
    );
    assert_eq!(set.size(), 0);

    // The 3 others still form a quorum.
    for keypair in &keypairs[1..] {
        set.add_vote(Vote::new_approve(VoteType::PreCommit, 3, 0, block).sign(keypair))
            .unwrap();
    }
    assert!(set.has_quorum(&block));
}

#[test]
fn invalid_votes_test() {
    let keypairs = keypairs(3);
    let outsider = Keypair::new(SigningKey::generate(&mut OsRng {}));
    let block = CryptoHash::new([1u8; 32]);
    let mut set = VoteSet::new(VoteType::Validate, 10, 2, addresses(&keypairs));

    assert_eq!(
        set.add_vote(Vote::new_approve(VoteType::Commit, 10, 2, block).sign(&keypairs[0])),
        Err(VoteError::WrongType)
    );
    assert_eq!(
        set.add_vote(Vote::new_approve(VoteType::Validate, 11, 2, block).sign(&keypairs[0])),
        Err(VoteError::WrongHeight)
    );
    assert_eq!(
        set.add_vote(Vote::new_approve(VoteType::Validate, 10, 1, block).sign(&keypairs[0])),
        Err(VoteError::WrongView)
    );
    assert_eq!(
        set.add_vote(Vote::new_approve(VoteType::Validate, 10, 2, block).sign(&outsider)),
        Err(VoteError::NotValidator)
    );
    assert_eq!(
        set.add_vote(Vote::new_approve(VoteType::Validate, 10, 2, block)),
        Err(VoteError::NotValidator)
    );

    // A signature that does not match the vote's content.
    let mut forged = Vote::new_approve(VoteType::Validate, 10, 2, block).sign(&keypairs[0]);
    forged.block_hash = CryptoHash::new([2u8; 32]);
    assert_eq!(set.add_vote(forged), Err(VoteError::InvalidSignature));

    // A rejection must not name a block.
    let mut rejection = Vote::new_reject(VoteType::Validate, 10, 2);
    rejection.block_hash = block;
    let rejection = rejection.sign(&keypairs[1]);
    assert_eq!(set.add_vote(rejection), Err(VoteError::InvalidSignature));

    assert_eq!(set.size(), 0);
}
