//! Wallet money using decimal arithmetic.
//!
//! Product costs, cart totals, and the wallet balance all share one unit:
//! the store's single currency. The backend sends amounts as plain JSON
//! numbers; `Money` accepts numbers or decimal strings when deserializing.
//!
//! Arithmetic saturates at the bounds of [`Decimal`] instead of panicking,
//! so totals over arbitrary backend data are always defined.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Sub};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An amount of money in the store currency.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// The smallest representable amount.
    pub const MIN: Self = Self(Decimal::MIN);

    /// The largest representable amount.
    pub const MAX: Self = Self(Decimal::MAX);

    /// Create an amount from a decimal value.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create an amount from a whole number of currency units.
    #[must_use]
    pub fn from_units(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// The cost of `quantity` items at this unit price.
    ///
    /// Saturates at [`Money::MAX`].
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }

    /// Whether the amount is below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0.normalize())
    }
}

impl From<i64> for Money {
    fn from(units: i64) -> Self {
        Self::from_units(units)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl std::str::FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_start_matches('$').parse::<Decimal>().map(Self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_times() {
        assert_eq!(Money::from_units(100).times(2), Money::from_units(200));
        assert_eq!(Money::from_units(100).times(0), Money::ZERO);
    }

    #[test]
    fn test_sum_empty_is_zero() {
        let total: Money = Vec::<Money>::new().into_iter().sum();
        assert_eq!(total, Money::ZERO);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_units(200).to_string(), "$200");
        assert_eq!("19.990".parse::<Money>().unwrap().to_string(), "$19.99");
    }

    #[test]
    fn test_deserialize_from_number() {
        let money: Money = serde_json::from_str("5000").unwrap();
        assert_eq!(money, Money::from_units(5000));

        let money: Money = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(money, "12.5".parse().unwrap());
    }

    #[test]
    fn test_negative() {
        let balance = Money::from_units(150) - Money::from_units(200);
        assert!(balance.is_negative());
        assert!(!Money::ZERO.is_negative());
    }

    #[test]
    fn test_arithmetic_saturates() {
        let huge: Money = "100000000000000000000".parse().unwrap();

        assert_eq!(huge.times(u32::MAX).times(u32::MAX), Money::MAX);
        assert_eq!(Money::MAX + Money::from_units(1), Money::MAX);
        assert_eq!(Money::MIN - Money::from_units(1), Money::MIN);

        let total: Money = [Money::MAX, Money::MAX].into_iter().sum();
        assert_eq!(total, Money::MAX);
    }

    #[test]
    fn test_parse_with_currency_symbol() {
        assert_eq!("$150".parse::<Money>().unwrap(), Money::from_units(150));
    }
}
