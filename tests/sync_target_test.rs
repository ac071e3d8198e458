use rialto::bft::implementation::sync_target;

/// Tests the height a node syncs to when a peer announces `new_height`, given its own `height` and
/// the latest block numbers reported by its validator peers.
#[test]
fn sync_target_test() {
    let table: Vec<(u64, u64, Vec<u64>, Option<u64>)> = vec![
        (10, 1, vec![], None),
        (10, 1, vec![0], None),
        (10, 1, vec![10], Some(11)),
        (100, 1, vec![100, 100], Some(101)),
        (100, 99, vec![100, 100], Some(101)),
        (100, 100, vec![100, 100], None),
        (100, 101, vec![10, 100], None),
        (1000, 1, vec![10, 100, 1000], Some(101)),
        (10000, 1, vec![10, 100, 1000, 10000], Some(101)),
        (1000000, 1, vec![10, 100, 1000, 10000, 100000], Some(101)),
        (u64::MAX, 1, vec![10, u64::MAX - 1, 100], Some(101)),
        (100, 1, (1..=99).collect(), Some(35)),
    ];

    for (new_height, height, peer_latest, expected) in table {
        assert_eq!(
            sync_target(height, new_height, &peer_latest),
            expected,
            "new height = {}, height = {}, peers = {:?}",
            new_height,
            height,
            peer_latest
        );
    }
}

/// Tests that the target never wraps around when peers report the largest block number.
#[test]
fn sync_target_saturates_test() {
    assert_eq!(
        sync_target(1, u64::MAX, &[u64::MAX, u64::MAX, u64::MAX]),
        Some(u64::MAX)
    );
}
