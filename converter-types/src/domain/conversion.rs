//! Conversion of an integer amount at a stored rate.

use std::fmt;

use rust_decimal::Decimal;

use super::CurrencyCode;
use crate::error::DomainError;

/// Result of converting `amount` units of `base` into `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub amount: i64,
    pub base: CurrencyCode,
    pub target: CurrencyCode,
    pub result: Decimal,
}

impl Conversion {
    /// `result = rate * amount`, exact decimal multiplication with no rounding.
    pub fn compute(
        rate: Decimal,
        amount: i64,
        base: CurrencyCode,
        target: CurrencyCode,
    ) -> Result<Self, DomainError> {
        let result = rate
            .checked_mul(Decimal::from(amount))
            .ok_or(DomainError::AmountOverflow { amount, rate })?;

        Ok(Self {
            amount,
            base,
            target,
            result,
        })
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} = {} {}",
            self.amount, self.base, self.result, self.target
        )
    }
}
