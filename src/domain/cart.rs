use super::money::{checked_sum, line_total};
use super::product::{Product, ProductId};
use super::user::{StandId, UserId};
use crate::error::CanteenError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type CartId = u64;
pub type CartItemId = u64;

/// Per-user staging area. One row per user, created lazily and never deleted.
///
/// `total_items` and `total_price` are derived values: they are recomputed
/// from the full item list after every mutation, never adjusted in place.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Cart {
    /// Zero for a cart that has not been persisted yet.
    pub id: CartId,
    pub user_id: UserId,
    pub total_items: u32,
    pub total_price: Decimal,
}

/// A line in a cart.
///
/// `price` is the discounted unit price captured when the product was first
/// added; `stand_id` is copied from the product at the same moment and is not
/// refreshed if the product later moves to another stand.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price: Decimal,
    pub subtotal: Decimal,
    pub stand_id: StandId,
}

/// A cart together with its current items, as returned to callers.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct CartView {
    #[serde(flatten)]
    pub cart: Cart,
    pub stand_id: Option<StandId>,
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            id: 0,
            user_id,
            total_items: 0,
            total_price: Decimal::ZERO,
        }
    }

    /// Leaves the totals untouched when they would overflow.
    pub fn recompute(&mut self, items: &[CartItem]) -> Result<(), CanteenError> {
        let total_items = items
            .iter()
            .try_fold(0u32, |acc, item| acc.checked_add(item.quantity))
            .ok_or_else(|| CanteenError::ValidationError("Cart quantity is too large".to_string()))?;
        let total_price = checked_sum(items.iter().map(|item| item.subtotal))?;
        self.total_items = total_items;
        self.total_price = total_price;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.total_items = 0;
        self.total_price = Decimal::ZERO;
    }
}

impl CartItem {
    pub fn from_product(
        id: CartItemId,
        cart_id: CartId,
        product: &Product,
        quantity: u32,
    ) -> Result<Self, CanteenError> {
        let price = product.unit_price();
        Ok(Self {
            id,
            cart_id,
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            price,
            subtotal: line_total(price, quantity)?,
            stand_id: product.stand_id,
        })
    }

    /// Changes the quantity, pricing it at the stored unit price.
    pub fn set_quantity(&mut self, quantity: u32) -> Result<(), CanteenError> {
        self.subtotal = line_total(self.price, quantity)?;
        self.quantity = quantity;
        Ok(())
    }
}

impl CartView {
    pub fn new(cart: Cart, items: Vec<CartItem>) -> Self {
        let stand_id = items.first().map(|item| item.stand_id);
        Self {
            cart,
            stand_id,
            items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
