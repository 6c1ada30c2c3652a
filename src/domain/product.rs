use super::user::StandId;
use crate::error::CanteenError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type ProductId = u64;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// A menu item sold by exactly one stand.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    /// Discount percentage, 0 to 100.
    #[serde(default)]
    pub discount: Decimal,
    pub stock: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub stand_id: StandId,
}

fn default_active() -> bool {
    true
}

impl Product {
    pub fn validate(&self) -> Result<(), CanteenError> {
        if self.price < Decimal::ZERO {
            return Err(CanteenError::ValidationError(format!(
                "Price of '{}' must not be negative",
                self.name
            )));
        }
        if self.discount < Decimal::ZERO || self.discount > HUNDRED {
            return Err(CanteenError::ValidationError(format!(
                "Discount of '{}' must be between 0 and 100",
                self.name
            )));
        }
        Ok(())
    }

    /// Unit price after the percentage discount, rounded to cents.
    pub fn unit_price(&self) -> Decimal {
        if self.discount > Decimal::ZERO {
            (self.price * (Decimal::ONE - self.discount / HUNDRED)).round_dp(2)
        } else {
            self.price
        }
    }

    pub fn has_stock(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }

    /// Removes `quantity` units from stock, refusing to go below zero.
    pub fn take_stock(&mut self, quantity: u32) -> Result<(), CanteenError> {
        self.stock = self
            .stock
            .checked_sub(quantity)
            .ok_or_else(|| CanteenError::InsufficientStock(self.name.clone()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(price: Decimal, discount: Decimal, stock: u32) -> Product {
        Product {
            id: 1,
            name: "Nasi Goreng".to_string(),
            price,
            discount,
            stock,
            is_active: true,
            stand_id: 10,
        }
    }

    #[test]
    fn test_unit_price_with_discount() {
        let p = product(dec!(10000), dec!(10), 5);
        assert_eq!(p.unit_price(), dec!(9000));
        assert_eq!(p.unit_price() * Decimal::from(3), dec!(27000));
    }

    #[test]
    fn test_unit_price_without_discount() {
        let p = product(dec!(12500), Decimal::ZERO, 5);
        assert_eq!(p.unit_price(), dec!(12500));
    }

    #[test]
    fn test_take_stock_never_negative() {
        let mut p = product(dec!(5000), Decimal::ZERO, 1);
        assert!(p.take_stock(1).is_ok());
        assert_eq!(p.stock, 0);
        assert!(matches!(
            p.take_stock(1),
            Err(CanteenError::InsufficientStock(name)) if name == "Nasi Goreng"
        ));
        assert_eq!(p.stock, 0);
    }

    #[test]
    fn test_validate_discount_range() {
        assert!(product(dec!(5000), dec!(100), 1).validate().is_ok());
        assert!(product(dec!(5000), dec!(101), 1).validate().is_err());
        assert!(product(dec!(-1), Decimal::ZERO, 1).validate().is_err());
    }
}
