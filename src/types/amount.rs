/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Fixed-point amounts of the native coin.
//!
//! An [`Amount`] counts *nano* coins in a signed 64-bit integer. All arithmetic is checked: an
//! operation that would overflow returns [`AmountError::Overflow`] instead of wrapping. Amounts are
//! signed so that balance *deltas* can be expressed with the same type; amounts carried by
//! transactions must be non-negative.

use std::fmt::{self, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};

/// Denominations of the native coin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    Nano,
    Micro,
    Milli,
    Coin,
    Kilo,
    Mega,
}

impl Unit {
    /// Number of nano coins in one of this unit.
    pub const fn factor(&self) -> i64 {
        match self {
            Unit::Nano => 1,
            Unit::Micro => 1_000,
            Unit::Milli => 1_000_000,
            Unit::Coin => 1_000_000_000,
            Unit::Kilo => 1_000_000_000_000,
            Unit::Mega => 1_000_000_000_000_000,
        }
    }

    pub const fn symbol(&self) -> &'static str {
        match self {
            Unit::Nano => "nRIA",
            Unit::Micro => "μRIA",
            Unit::Milli => "mRIA",
            Unit::Coin => "RIA",
            Unit::Kilo => "kRIA",
            Unit::Mega => "MRIA",
        }
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize,
)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Create an `Amount` of `nano` nano coins.
    pub const fn new(nano: i64) -> Self {
        Self(nano)
    }

    /// Create an `Amount` of `n` `unit`s.
    pub fn of(n: i64, unit: Unit) -> Result<Amount, AmountError> {
        n.checked_mul(unit.factor())
            .map(Amount)
            .ok_or(AmountError::Overflow)
    }

    /// Get the number of nano coins in this `Amount`.
    pub const fn nano(&self) -> i64 {
        self.0
    }

    pub fn checked_add(self, other: Amount) -> Result<Amount, AmountError> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or(AmountError::Overflow)
    }

    pub fn checked_sub(self, other: Amount) -> Result<Amount, AmountError> {
        self.0
            .checked_sub(other.0)
            .map(Amount)
            .ok_or(AmountError::Overflow)
    }

    pub fn checked_neg(self) -> Result<Amount, AmountError> {
        self.0.checked_neg().map(Amount).ok_or(AmountError::Overflow)
    }

    /// Multiply by a count, e.g., gas units times gas price.
    pub fn checked_mul(self, n: u64) -> Result<Amount, AmountError> {
        i64::try_from(n)
            .ok()
            .and_then(|n| self.0.checked_mul(n))
            .map(Amount)
            .ok_or(AmountError::Overflow)
    }

    /// Add up `amounts`, failing if any partial sum overflows.
    pub fn sum(amounts: impl IntoIterator<Item = Amount>) -> Result<Amount, AmountError> {
        amounts
            .into_iter()
            .try_fold(Amount::ZERO, |acc, amount| acc.checked_add(amount))
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Express this amount as a (possibly fractional) number of `unit`s, without trailing zeros.
    pub fn to_string_in(&self, unit: Unit) -> String {
        let factor = unit.factor() as u64;
        let magnitude = self.0.unsigned_abs();
        let sign = if self.0 < 0 { "-" } else { "" };
        let (whole, fraction) = (magnitude / factor, magnitude % factor);
        if fraction == 0 {
            return format!("{}{} {}", sign, whole, unit.symbol());
        }
        let width = unit.factor().to_string().len() - 1;
        let fraction = format!("{:0width$}", fraction, width = width);
        format!(
            "{}{}.{} {}",
            sign,
            whole,
            fraction.trim_end_matches('0'),
            unit.symbol()
        )
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_in(Unit::Coin))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountError {
    Overflow,
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::Overflow => write!(f, "amount overflow"),
        }
    }
}
