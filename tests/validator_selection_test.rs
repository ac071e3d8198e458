use rialto::{
    bft::validator_selection::{fast_rand, primary_validator},
    types::data_types::Address,
};

fn validators(n: usize) -> Vec<Address> {
    (0..n).map(|i| Address::new([i as u8; 20])).collect()
}

fn index_of(validators: &[Address], primary: Option<&Address>) -> usize {
    let primary = primary.unwrap();
    validators.iter().position(|v| v == primary).unwrap()
}

#[test]
fn fast_rand_test() {
    assert_eq!(fast_rand(0), 38);
    assert_eq!(fast_rand(1), 41);
    assert_eq!(fast_rand(12345), 7584);

    // Only the low bits of the seed matter, so the largest seed does not overflow.
    assert_eq!(fast_rand(u64::MAX), 35);
    assert_eq!(fast_rand(1 << 40), fast_rand(0));
}

/// Tests both selection rules against a table of (number of validators, height, view, uniform index,
/// legacy index).
#[test]
fn primary_validator_test() {
    let table: [(usize, u64, u32, usize, usize); 12] = [
        (1, 1, 0, 0, 0),
        (3, 1, 0, 0, 0),
        (3, 1, 1, 2, 2),
        (3, 1, 2, 0, 0),
        (3, 2, 0, 2, 1),
        (3, 2, 1, 0, 0),
        (4, 10, 0, 3, 3),
        (5, 100, 3, 3, 1),
        (7, 12345, 0, 2, 4),
        (10, 1, 0, 7, 0),
        (25, 999999, 7, 1, 21),
        (100, i64::MAX as u64, i32::MAX as u32, 38, 21),
    ];

    for (n, height, view, uniform, legacy) in table {
        let validators = validators(n);
        assert_eq!(
            index_of(&validators, primary_validator(&validators, height, view, true)),
            uniform,
            "uniform selection for n = {}, height = {}, view = {}",
            n,
            height,
            view
        );
        assert_eq!(
            index_of(&validators, primary_validator(&validators, height, view, false)),
            legacy,
            "legacy selection for n = {}, height = {}, view = {}",
            n,
            height,
            view
        );
    }
}

#[test]
fn no_validators_test() {
    assert_eq!(primary_validator(&[], 1, 0, true), None);
    assert_eq!(primary_validator(&[], 1, 0, false), None);
}

/// Tests that uniform selection spreads the first view of 3000 heights evenly over 3 validators.
#[test]
fn uniform_distribution_test() {
    let validators = validators(3);
    let mut counts = [0usize; 3];
    for height in 1..=3000 {
        counts[index_of(&validators, primary_validator(&validators, height, 0, true))] += 1;
    }
    assert_eq!(counts, [1005, 1006, 989]);
}

/// Tests that with 100 validators, over a million heights of which one in twenty needs a second
/// view, no validator is chosen more than 2% more or less often than its fair share.
#[test]
fn uniform_fairness_test() {
    let validators = validators(100);
    let mut counts = [0usize; 100];
    for height in 0..1_000_000u64 {
        let view = if height % 20 == 0 { 1 } else { 0 };
        counts[index_of(&validators, primary_validator(&validators, height, view, true))] += 1;
    }
    for count in counts {
        assert!((9_800..=10_200).contains(&count), "count = {}", count);
    }
}
