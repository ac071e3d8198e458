use rialto::types::amount::{Amount, AmountError, Unit};

#[test]
fn units_test() {
    assert_eq!(Amount::of(1, Unit::Nano).unwrap(), Amount::new(1));
    assert_eq!(Amount::of(1, Unit::Micro).unwrap(), Amount::new(1_000));
    assert_eq!(Amount::of(1, Unit::Milli).unwrap(), Amount::new(1_000_000));
    assert_eq!(Amount::of(1, Unit::Coin).unwrap(), Amount::new(1_000_000_000));
    assert_eq!(Amount::of(1, Unit::Kilo).unwrap(), Amount::new(1_000_000_000_000));
    assert_eq!(Amount::of(1, Unit::Mega).unwrap(), Amount::new(1_000_000_000_000_000));

    assert_eq!(Amount::of(i64::MAX, Unit::Coin), Err(AmountError::Overflow));
}

#[test]
fn checked_arithmetic_test() {
    let max = Amount::new(i64::MAX);
    let min = Amount::new(i64::MIN);

    assert_eq!(Amount::new(2).checked_add(Amount::new(3)), Ok(Amount::new(5)));
    assert_eq!(max.checked_add(Amount::new(1)), Err(AmountError::Overflow));

    assert_eq!(Amount::new(2).checked_sub(Amount::new(3)), Ok(Amount::new(-1)));
    assert_eq!(min.checked_sub(Amount::new(1)), Err(AmountError::Overflow));

    assert_eq!(min.checked_neg(), Err(AmountError::Overflow));
    assert_eq!(max.checked_neg(), Ok(Amount::new(-i64::MAX)));

    assert_eq!(Amount::new(10).checked_mul(21_000), Ok(Amount::new(210_000)));
    assert_eq!(Amount::new(2).checked_mul(u64::MAX), Err(AmountError::Overflow));
    assert_eq!(max.checked_mul(2), Err(AmountError::Overflow));

    assert_eq!(
        Amount::sum([Amount::new(1), Amount::new(2), Amount::new(3)]),
        Ok(Amount::new(6))
    );
    assert_eq!(
        Amount::sum([max, Amount::new(1), Amount::new(-1)]),
        Err(AmountError::Overflow)
    );
}

#[test]
fn display_test() {
    assert_eq!(Amount::of(3, Unit::Coin).unwrap().to_string(), "3 RIA");
    assert_eq!(Amount::new(1_500_000_000).to_string(), "1.5 RIA");
    assert_eq!(Amount::new(-5_000_000).to_string(), "-0.005 RIA");
    assert_eq!(Amount::new(1).to_string_in(Unit::Nano), "1 nRIA");
    assert_eq!(Amount::new(1_234).to_string_in(Unit::Micro), "1.234 μRIA");
}
