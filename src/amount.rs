//! Protect ledger operations from non-positive amounts.

use std::{borrow::Borrow, ops::Deref};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represent a strictly positive financial amount of money
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    /// Create a new amount that is guaranteed to be positive
    pub fn new(num: u64, scale: u32) -> Amount {
        let inner = Decimal::from_i128_with_scale(num.into(), scale);
        Self(inner)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("amount must be positive")]
/// Represent error when an operation was requested with a zero or negative amount
pub struct InvalidAmountErr;

impl TryFrom<Decimal> for Amount {
    type Error = InvalidAmountErr;
    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value <= Decimal::ZERO {
            Err(InvalidAmountErr)
        } else {
            Ok(Self(value))
        }
    }
}

impl From<Amount> for Decimal {
    fn from(this: Amount) -> Self {
        this.0
    }
}

impl Borrow<Decimal> for Amount {
    fn borrow(&self) -> &Decimal {
        &self.0
    }
}

impl Deref for Amount {
    type Target = Decimal;
    fn deref(&self) -> &Self::Target {
        self.borrow()
    }
}

#[cfg(test)]
mod test {
    use super::{Amount, InvalidAmountErr};
    use rust_decimal::Decimal;

    #[test]
    fn rejects_zero_and_negative() {
        assert_eq!(Amount::try_from(Decimal::ZERO), Err(InvalidAmountErr));
        assert_eq!(Amount::try_from(Decimal::new(-1, 2)), Err(InvalidAmountErr));
    }

    #[test]
    fn accepts_positive() {
        let a = Amount::try_from(Decimal::new(1500, 2)).unwrap();
        assert_eq!(*a, Decimal::new(1500, 2));
    }
}
