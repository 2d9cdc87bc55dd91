//! Non-negative decimal money amounts in a single currency (USD).

use rust_decimal::Decimal;
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

use super::error::TraderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Result<Self, TraderError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(TraderError::NegativeAmount {
                field: "amount".into(),
                amount,
            });
        }
        Ok(Money(amount))
    }

    /// Parse a user-supplied amount such as `"20000.00"`.
    pub fn parse(field: &str, input: &str) -> Result<Self, TraderError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(TraderError::empty(field));
        }
        let amount = Decimal::from_str(trimmed).map_err(|_| TraderError::InvalidDecimal {
            field: field.to_string(),
            input: input.to_string(),
        })?;
        Money::new(amount).map_err(|_| TraderError::NegativeAmount {
            field: field.to_string(),
            amount,
        })
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Value of `quantity` units at this unit price.
    pub fn times(&self, quantity: u64) -> Money {
        Money(self.0 * Decimal::from(quantity))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}
