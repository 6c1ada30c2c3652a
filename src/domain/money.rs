use crate::error::CanteenError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Sub, SubAssign};

/// A user's spendable balance.
///
/// Wraps `rust_decimal::Decimal` so balances cannot be mixed up with prices or
/// quantities by accident. A balance is never negative once the ledger has
/// applied an entry.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

/// A strictly positive monetary amount moved by a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, CanteenError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(CanteenError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = CanteenError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn covers(&self, amount: Amount) -> bool {
        self.0 >= amount.0
    }

    /// Adds `amount`, refusing a balance that no longer fits a `Decimal`.
    pub fn checked_credit(self, amount: Amount) -> Result<Self, CanteenError> {
        self.0.checked_add(amount.0).map(Self).ok_or_else(too_large)
    }
}

/// `price * quantity` for one line.
pub fn line_total(price: Decimal, quantity: u32) -> Result<Decimal, CanteenError> {
    price.checked_mul(Decimal::from(quantity)).ok_or_else(too_large)
}

/// Sums money values, failing instead of overflowing.
pub fn checked_sum<I>(values: I) -> Result<Decimal, CanteenError>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value).ok_or_else(too_large))
}

fn too_large() -> CanteenError {
    CanteenError::ValidationError("Amount is too large".to_string())
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Balance {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balance_arithmetic() {
        let b1 = Balance::new(dec!(10000));
        let b2 = Balance::new(dec!(2500));
        assert_eq!(
            b1.checked_credit(Amount::new(dec!(2500)).unwrap()).unwrap(),
            Balance::new(dec!(12500))
        );
        assert_eq!(b1 - b2, Balance::new(dec!(7500)));
    }

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0)),
            Err(CanteenError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-500)),
            Err(CanteenError::ValidationError(_))
        ));
    }

    #[test]
    fn test_balance_covers() {
        let balance = Balance::new(dec!(1000));
        assert!(balance.covers(Amount::new(dec!(1000)).unwrap()));
        assert!(!balance.covers(Amount::new(dec!(1500)).unwrap()));
    }

    #[test]
    fn test_overflow_is_a_validation_error() {
        let near_max = Amount::new(Decimal::MAX - dec!(1)).unwrap();
        let balance = Balance::ZERO.checked_credit(near_max).unwrap();
        assert!(matches!(
            balance.checked_credit(near_max),
            Err(CanteenError::ValidationError(_))
        ));

        assert_eq!(line_total(dec!(9000), 3).unwrap(), dec!(27000));
        assert!(line_total(Decimal::MAX, 2).is_err());

        assert_eq!(checked_sum([dec!(1), dec!(2.5)]).unwrap(), dec!(3.5));
        assert_eq!(checked_sum(Vec::new()).unwrap(), Decimal::ZERO);
        assert!(checked_sum([Decimal::MAX, dec!(1)]).is_err());
    }

    #[test]
    fn test_display_is_normalized() {
        assert_eq!(Balance::new(dec!(27000.00)).to_string(), "27000");
        assert_eq!(Amount::new(dec!(9000.50)).unwrap().to_string(), "9000.5");
    }
}
