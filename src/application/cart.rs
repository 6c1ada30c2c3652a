use super::unit_of_work::{Database, Sequence, UnitOfWork};
use crate::auth::{Identity, Role};
use crate::domain::cart::{Cart, CartItem, CartItemId, CartView};
use crate::domain::product::ProductId;
use crate::error::{CanteenError, Result};
use tracing::debug;

fn require_quantity(quantity: u32) -> Result<()> {
    if quantity == 0 {
        return Err(CanteenError::ValidationError(
            "Quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Per-user cart mutations.
#[derive(Clone)]
pub struct CartService {
    db: Database,
}

impl CartService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the caller's cart, or an empty unsaved one if none exists yet.
    pub async fn get_cart(&self, user: &Identity) -> Result<CartView> {
        let uow = self.db.begin().await;
        match uow.cart_for_user(user.user_id).await? {
            Some(cart) => {
                let items = uow.cart_items(cart.id).await?;
                Ok(CartView::new(cart, items))
            }
            None => Ok(CartView::new(Cart::empty(user.user_id), Vec::new())),
        }
    }

    pub async fn add_item(
        &self,
        user: &Identity,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartView> {
        user.require(Role::Student, "add items to a cart")?;
        require_quantity(quantity)?;

        let mut uow = self.db.begin().await;
        let product = uow
            .product(product_id)
            .await?
            .ok_or(CanteenError::NotFound("product"))?;
        if !product.is_active {
            return Err(CanteenError::ValidationError(format!(
                "Product is not available: {}",
                product.name
            )));
        }

        let cart = match uow.cart_for_user(user.user_id).await? {
            Some(cart) => cart,
            None => {
                let cart = Cart {
                    id: uow.next_id(Sequence::Cart).await?,
                    ..Cart::empty(user.user_id)
                };
                uow.put_cart(&cart)?;
                cart
            }
        };

        let items = uow.cart_items(cart.id).await?;
        if let Some(first) = items.first()
            && first.stand_id != product.stand_id
        {
            return Err(CanteenError::StandMismatch {
                current: first.stand_id,
                requested: product.stand_id,
            });
        }

        match items.iter().find(|item| item.product_id == product.id) {
            Some(existing) => {
                let mut item = existing.clone();
                let merged = item.quantity.saturating_add(quantity);
                if !product.has_stock(merged) {
                    return Err(CanteenError::InsufficientStock(product.name));
                }
                item.set_quantity(merged)?;
                uow.put_cart_item(&item)?;
            }
            None => {
                if !product.has_stock(quantity) {
                    return Err(CanteenError::InsufficientStock(product.name));
                }
                let id = uow.next_id(Sequence::CartItem).await?;
                uow.put_cart_item(&CartItem::from_product(id, cart.id, &product, quantity)?)?;
            }
        }

        let view = Self::recompute(&mut uow, cart).await?;
        uow.commit().await?;

        debug!(user_id = user.user_id, product_id, quantity, "item added to cart");
        Ok(view)
    }

    pub async fn update_item(
        &self,
        user: &Identity,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartView> {
        user.require(Role::Student, "update a cart")?;
        require_quantity(quantity)?;

        let mut uow = self.db.begin().await;
        let (cart, mut item) = Self::find_item(&uow, user, item_id).await?;
        let product = uow
            .product(item.product_id)
            .await?
            .ok_or(CanteenError::NotFound("product"))?;
        if !product.has_stock(quantity) {
            return Err(CanteenError::InsufficientStock(product.name));
        }

        item.set_quantity(quantity)?;
        uow.put_cart_item(&item)?;

        let view = Self::recompute(&mut uow, cart).await?;
        uow.commit().await?;

        debug!(user_id = user.user_id, item_id, quantity, "cart item updated");
        Ok(view)
    }

    pub async fn remove_item(&self, user: &Identity, item_id: CartItemId) -> Result<CartView> {
        user.require(Role::Student, "update a cart")?;

        let mut uow = self.db.begin().await;
        let (cart, item) = Self::find_item(&uow, user, item_id).await?;
        uow.delete_cart_item(cart.id, item.id);

        let view = Self::recompute(&mut uow, cart).await?;
        uow.commit().await?;

        debug!(user_id = user.user_id, item_id, "cart item removed");
        Ok(view)
    }

    /// Empties the caller's cart. Clearing a cart that was never created is a
    /// no-op.
    pub async fn clear_cart(&self, user: &Identity) -> Result<()> {
        user.require(Role::Student, "update a cart")?;

        let mut uow = self.db.begin().await;
        if Self::empty_cart(&mut uow, user).await? {
            uow.commit().await?;
            debug!(user_id = user.user_id, "cart cleared");
        }
        Ok(())
    }

    /// Deletes every item and zeroes the totals within `uow`. Returns whether
    /// a cart existed.
    pub(crate) async fn empty_cart(uow: &mut UnitOfWork, user: &Identity) -> Result<bool> {
        let Some(mut cart) = uow.cart_for_user(user.user_id).await? else {
            return Ok(false);
        };
        for item in uow.cart_items(cart.id).await? {
            uow.delete_cart_item(cart.id, item.id);
        }
        cart.reset();
        uow.put_cart(&cart)?;
        Ok(true)
    }

    async fn find_item(
        uow: &UnitOfWork,
        user: &Identity,
        item_id: CartItemId,
    ) -> Result<(Cart, CartItem)> {
        let cart = uow
            .cart_for_user(user.user_id)
            .await?
            .ok_or(CanteenError::NotFound("cart"))?;
        let item = uow
            .cart_items(cart.id)
            .await?
            .into_iter()
            .find(|item| item.id == item_id)
            .ok_or(CanteenError::NotFound("cart item"))?;
        Ok((cart, item))
    }

    /// Rebuilds the cart totals from the items currently staged in `uow`.
    async fn recompute(uow: &mut UnitOfWork, mut cart: Cart) -> Result<CartView> {
        let items = uow.cart_items(cart.id).await?;
        cart.recompute(&items)?;
        uow.put_cart(&cart)?;
        Ok(CartView::new(cart, items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::Product;
    use crate::infrastructure::in_memory::InMemoryStorage;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn product(id: ProductId, stand_id: u64, price: Decimal, discount: Decimal, stock: u32) -> Product {
        Product {
            id,
            name: format!("product-{id}"),
            price,
            discount,
            stock,
            is_active: true,
            stand_id,
        }
    }

    async fn service(products: &[Product]) -> CartService {
        let db = Database::new(Box::new(InMemoryStorage::new()));
        let mut uow = db.begin().await;
        for p in products {
            uow.put_product(p).unwrap();
        }
        uow.commit().await.unwrap();
        CartService::new(db)
    }

    #[tokio::test]
    async fn test_get_cart_does_not_create_a_row() {
        let carts = service(&[]).await;
        let view = carts.get_cart(&Identity::student(1)).await.unwrap();
        assert_eq!(view.cart.id, 0);
        assert_eq!(view.cart.total_items, 0);
        assert!(view.is_empty());

        let again = carts.get_cart(&Identity::student(1)).await.unwrap();
        assert_eq!(again.cart.id, 0);
    }

    #[tokio::test]
    async fn test_add_applies_discount() {
        let carts = service(&[product(1, 10, dec!(10000), dec!(10), 5)]).await;
        let view = carts.add_item(&Identity::student(1), 1, 3).await.unwrap();

        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].price, dec!(9000));
        assert_eq!(view.items[0].subtotal, dec!(27000));
        assert_eq!(view.cart.total_items, 3);
        assert_eq!(view.cart.total_price, dec!(27000));
        assert_eq!(view.stand_id, Some(10));
    }

    #[tokio::test]
    async fn test_add_merges_at_stored_price() {
        let carts = service(&[product(1, 10, dec!(5000), Decimal::ZERO, 10)]).await;
        let user = Identity::student(1);
        carts.add_item(&user, 1, 1).await.unwrap();

        // Reprice the product after it was first added.
        {
            let mut uow = carts.db.begin().await;
            uow.put_product(&product(1, 10, dec!(7000), Decimal::ZERO, 10))
                .unwrap();
            uow.commit().await.unwrap();
        }

        let view = carts.add_item(&user, 1, 2).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 3);
        assert_eq!(view.items[0].subtotal, dec!(15000));
        assert_eq!(view.cart.total_price, dec!(15000));
    }

    #[tokio::test]
    async fn test_add_rejects_other_stand() {
        let carts = service(&[
            product(1, 10, dec!(5000), Decimal::ZERO, 10),
            product(2, 20, dec!(5000), Decimal::ZERO, 10),
        ])
        .await;
        let user = Identity::student(1);
        carts.add_item(&user, 1, 1).await.unwrap();

        let err = carts.add_item(&user, 2, 1).await.unwrap_err();
        assert!(matches!(
            err,
            CanteenError::StandMismatch {
                current: 10,
                requested: 20
            }
        ));

        // Once emptied, the cart accepts the other stand.
        carts.clear_cart(&user).await.unwrap();
        let view = carts.add_item(&user, 2, 1).await.unwrap();
        assert_eq!(view.stand_id, Some(20));
    }

    #[tokio::test]
    async fn test_add_rejects_inactive_and_out_of_stock() {
        let mut inactive = product(1, 10, dec!(5000), Decimal::ZERO, 10);
        inactive.is_active = false;
        let carts = service(&[inactive, product(2, 10, dec!(5000), Decimal::ZERO, 2)]).await;
        let user = Identity::student(1);

        assert!(matches!(
            carts.add_item(&user, 1, 1).await,
            Err(CanteenError::ValidationError(_))
        ));
        assert!(matches!(
            carts.add_item(&user, 2, 3).await,
            Err(CanteenError::InsufficientStock(_))
        ));
        assert!(matches!(
            carts.add_item(&user, 99, 1).await,
            Err(CanteenError::NotFound("product"))
        ));
        assert!(matches!(
            carts.add_item(&user, 2, 0).await,
            Err(CanteenError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_remove_recompute_totals() {
        let carts = service(&[
            product(1, 10, dec!(5000), Decimal::ZERO, 10),
            product(2, 10, dec!(3000), Decimal::ZERO, 10),
        ])
        .await;
        let user = Identity::student(1);
        carts.add_item(&user, 1, 1).await.unwrap();
        let view = carts.add_item(&user, 2, 2).await.unwrap();
        assert_eq!(view.cart.total_price, dec!(11000));

        let first = view.items[0].id;
        let view = carts.update_item(&user, first, 4).await.unwrap();
        assert_eq!(view.cart.total_items, 6);
        assert_eq!(view.cart.total_price, dec!(26000));

        assert!(matches!(
            carts.update_item(&user, first, 11).await,
            Err(CanteenError::InsufficientStock(_))
        ));

        let view = carts.remove_item(&user, first).await.unwrap();
        assert_eq!(view.cart.total_items, 2);
        assert_eq!(view.cart.total_price, dec!(6000));

        assert!(matches!(
            carts.remove_item(&user, first).await,
            Err(CanteenError::NotFound("cart item"))
        ));
    }

    #[tokio::test]
    async fn test_cart_requires_student() {
        let carts = service(&[product(1, 10, dec!(5000), Decimal::ZERO, 10)]).await;
        assert!(matches!(
            carts.add_item(&Identity::stand(10), 1, 1).await,
            Err(CanteenError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_without_cart_is_noop() {
        let carts = service(&[]).await;
        carts.clear_cart(&Identity::student(1)).await.unwrap();
    }
}
