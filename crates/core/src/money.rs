//! Monetary amounts in minor units.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Amount of money in the smallest currency unit (cents).
///
/// Signed on purpose: callers can express a negative amount, and the ledger
/// rejects it, instead of the value silently wrapping. No currency is
/// attached; the catalog is single-currency.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Parse masked currency input such as `"1.234,56"` or `"R$ 12,50"`.
    ///
    /// Every non-digit character is dropped and the remaining digits are read
    /// as cents, so the mask never changes the value. No digits at all means
    /// zero.
    pub fn parse_masked(input: &str) -> DomainResult<Self> {
        let digits: String = input.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Ok(Self::ZERO);
        }
        digits
            .parse::<i64>()
            .map(Self)
            .map_err(|_| DomainError::validation(format!("amount out of range: {input}")))
    }
}

impl core::fmt::Display for Money {
    /// Renders `123456` cents as `1.234,56`.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let abs = self.0.unsigned_abs();
        let units = (abs / 100).to_string();
        let decimals = abs % 100;

        let mut grouped = String::with_capacity(units.len() + units.len() / 3);
        for (i, ch) in units.chars().enumerate() {
            if i > 0 && (units.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        if self.0 < 0 {
            f.write_str("-")?;
        }
        write!(f, "{grouped},{decimals:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_drops_mask_characters() {
        assert_eq!(Money::parse_masked("1.234,56").unwrap(), Money::from_cents(123_456));
        assert_eq!(Money::parse_masked("R$ 12,50").unwrap(), Money::from_cents(1_250));
        assert_eq!(Money::parse_masked("0,07").unwrap(), Money::from_cents(7));
    }

    #[test]
    fn parse_without_digits_is_zero() {
        assert_eq!(Money::parse_masked("").unwrap(), Money::ZERO);
        assert_eq!(Money::parse_masked("R$ ,").unwrap(), Money::ZERO);
    }

    #[test]
    fn parse_rejects_overflow() {
        let err = Money::parse_masked("99999999999999999999999").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn display_groups_thousands() {
        assert_eq!(Money::from_cents(0).to_string(), "0,00");
        assert_eq!(Money::from_cents(5).to_string(), "0,05");
        assert_eq!(Money::from_cents(1_250).to_string(), "12,50");
        assert_eq!(Money::from_cents(123_456).to_string(), "1.234,56");
        assert_eq!(Money::from_cents(123_456_789).to_string(), "1.234.567,89");
        assert_eq!(Money::from_cents(-1_000).to_string(), "-10,00");
    }
}
