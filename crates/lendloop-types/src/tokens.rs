//! The platform's unit of exchange
//!
//! Tokens are whole, non-negative units. There are no fractional tokens and
//! arithmetic never wraps: every operation that could overflow or go below
//! zero is checked.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// A whole number of platform tokens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tokens(pub u64);

impl Tokens {
    /// Zero tokens
    pub const ZERO: Tokens = Tokens(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Tokens) -> Option<Tokens> {
        self.0.checked_add(other.0).map(Tokens)
    }

    /// Subtract, returning `None` if the result would be negative
    pub fn checked_sub(self, other: Tokens) -> Option<Tokens> {
        self.0.checked_sub(other.0).map(Tokens)
    }

    pub fn checked_mul(self, factor: u64) -> Option<Tokens> {
        self.0.checked_mul(factor).map(Tokens)
    }

    pub fn saturating_sub(self, other: Tokens) -> Tokens {
        Tokens(self.0.saturating_sub(other.0))
    }

    pub fn min(self, other: Tokens) -> Tokens {
        Tokens(self.0.min(other.0))
    }
}

impl Add for Tokens {
    type Output = Tokens;

    /// Saturating addition; use `checked_add` where overflow must be reported
    fn add(self, rhs: Tokens) -> Tokens {
        Tokens(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Tokens {
    fn sum<I: Iterator<Item = Tokens>>(iter: I) -> Tokens {
        iter.fold(Tokens::ZERO, |acc, t| acc + t)
    }
}

impl From<u64> for Tokens {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tokens", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_sub_never_negative() {
        assert_eq!(Tokens(10).checked_sub(Tokens(4)), Some(Tokens(6)));
        assert_eq!(Tokens(3).checked_sub(Tokens(4)), None);
    }

    #[test]
    fn test_checked_mul_overflow() {
        assert_eq!(Tokens(3).checked_mul(4), Some(Tokens(12)));
        assert_eq!(Tokens(u64::MAX).checked_mul(2), None);
    }

    #[test]
    fn test_sum_and_display() {
        let total: Tokens = vec![Tokens(1), Tokens(2), Tokens(3)].into_iter().sum();
        assert_eq!(total, Tokens(6));
        assert_eq!(total.to_string(), "6 tokens");
    }
}
