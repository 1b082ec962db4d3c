//! Money as integer minor units (cents).
//!
//! All commercial amounts in the system are stored and computed in the
//! smallest currency unit. Amounts are signed so that cross-checks can
//! express deltas, but persisted order/invoice totals are always
//! non-negative.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// An amount in minor currency units (e.g. cents).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Checked addition; overflow is a domain invariant violation.
    pub fn add(self, other: Money) -> Result<Money, DomainError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::invariant("money overflow"))
    }

    /// Multiply a unit price by a quantity, checked.
    pub fn times(self, quantity: u32) -> Result<Money, DomainError> {
        self.0
            .checked_mul(i64::from(quantity))
            .map(Money)
            .ok_or_else(|| DomainError::invariant("money overflow"))
    }

    /// Absolute difference between two amounts, in minor units.
    ///
    /// Returns `u64` so the difference is well-defined over the full signed
    /// range.
    pub fn abs_diff(self, other: Money) -> u64 {
        self.0.abs_diff(other.0)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Render as a decimal string with two fraction digits (e.g. `"20.00"`).
    pub fn display_decimal(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.display_decimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn times_and_add_compose() {
        let unit = Money::from_cents(1000);
        let line = unit.times(2).unwrap();
        assert_eq!(line, Money::from_cents(2000));
        assert_eq!(line.add(Money::from_cents(500)).unwrap().cents(), 2500);
    }

    #[test]
    fn overflow_is_an_error() {
        assert!(Money::from_cents(i64::MAX).times(2).is_err());
        assert!(Money::from_cents(i64::MAX).add(Money::from_cents(1)).is_err());
    }

    #[test]
    fn abs_diff_spans_the_full_signed_range() {
        assert_eq!(Money::from_cents(1950).abs_diff(Money::from_cents(2000)), 50);
        assert_eq!(
            Money::from_cents(i64::MIN).abs_diff(Money::from_cents(2000)),
            9_223_372_036_854_777_808
        );
        assert_eq!(
            Money::from_cents(i64::MIN).abs_diff(Money::from_cents(i64::MAX)),
            u64::MAX
        );
    }

    #[test]
    fn decimal_display() {
        assert_eq!(Money::from_cents(2000).display_decimal(), "20.00");
        assert_eq!(Money::from_cents(5).display_decimal(), "0.05");
        assert_eq!(Money::from_cents(-150).display_decimal(), "-1.50");
    }
}
