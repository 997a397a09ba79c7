//! Drop amounts.
//!
//! Balances and fees are counted in drops, the smallest indivisible unit of
//! the native currency. Amounts are unsigned 64-bit integers; all arithmetic
//! in the core goes through the checked operations so a balance can never
//! silently wrap or go negative.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// An amount of drops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn new(drops: u64) -> Self {
        Self(drops)
    }

    pub fn drops(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} drops", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_sub_underflow_is_none() {
        assert_eq!(Amount::new(5).checked_sub(Amount::new(6)), None);
        assert_eq!(
            Amount::new(5).checked_sub(Amount::new(5)),
            Some(Amount::ZERO)
        );
    }

    #[test]
    fn checked_add_overflow_is_none() {
        assert_eq!(Amount::new(u64::MAX).checked_add(Amount::new(1)), None);
    }
}
