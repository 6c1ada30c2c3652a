use super::cart::CartService;
use super::checkout::{CheckoutReceipt, CheckoutService, Payment};
use super::ledger::LedgerService;
use super::orders::{MonthlySummary, OrderLifecycle, YearlyRecap};
use super::unit_of_work::Database;
use crate::auth::{Identity, TokenValidator};
use crate::domain::cart::{CartItemId, CartView};
use crate::domain::money::Balance;
use crate::domain::order::{Order, OrderId, OrderLine, OrderStatus, PaymentMethod};
use crate::domain::ports::StorageEngineBox;
use crate::domain::product::{Product, ProductId};
use crate::domain::stand::{QrisCode, StandSettings};
use crate::domain::transaction::Transaction;
use crate::domain::user::{StandId, User, UserId};
use crate::error::{CanteenError, Result};
use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

/// The canteen core behind one storage engine.
///
/// `Canteen` owns the services and exposes every operation callers need. It
/// expects an already-resolved [`Identity`] per call; [`Canteen::authenticate`]
/// turns a bearer token into one through the injected [`TokenValidator`].
pub struct Canteen {
    db: Database,
    carts: CartService,
    checkout: CheckoutService,
    orders: OrderLifecycle,
    ledger: LedgerService,
    tokens: Arc<dyn TokenValidator>,
}

impl Canteen {
    /// Creates a new `Canteen` instance.
    ///
    /// # Arguments
    ///
    /// * `engine` - The storage engine holding every canteen record.
    /// * `tokens` - Resolves bearer tokens into caller identities.
    pub fn new(engine: StorageEngineBox, tokens: Arc<dyn TokenValidator>) -> Self {
        let db = Database::new(engine);
        Self {
            carts: CartService::new(db.clone()),
            checkout: CheckoutService::new(db.clone()),
            orders: OrderLifecycle::new(db.clone()),
            ledger: LedgerService::new(db.clone()),
            db,
            tokens,
        }
    }

    /// Resolves a bearer token. Unknown and expired tokens are rejected.
    pub async fn authenticate(&self, token: &str) -> Result<Identity> {
        self.tokens
            .validate(token)
            .await?
            .ok_or(CanteenError::Forbidden("invalid or expired token"))
    }

    /// Builds the identity of a stored, active user.
    pub async fn identify(&self, user_id: UserId) -> Result<Identity> {
        let uow = self.db.begin().await;
        match uow.user(user_id).await? {
            Some(user) if user.is_active => Ok(Identity::from(&user)),
            Some(_) => Err(CanteenError::Forbidden("inactive account")),
            None => Err(CanteenError::NotFound("user")),
        }
    }

    pub async fn get_product(&self, product_id: ProductId) -> Result<Product> {
        self.db
            .begin()
            .await
            .product(product_id)
            .await?
            .ok_or(CanteenError::NotFound("product"))
    }

    pub async fn get_cart(&self, user: &Identity) -> Result<CartView> {
        self.carts.get_cart(user).await
    }

    pub async fn add_to_cart(
        &self,
        user: &Identity,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartView> {
        self.carts.add_item(user, product_id, quantity).await
    }

    pub async fn update_cart_item(
        &self,
        user: &Identity,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartView> {
        self.carts.update_item(user, item_id, quantity).await
    }

    pub async fn remove_from_cart(&self, user: &Identity, item_id: CartItemId) -> Result<CartView> {
        self.carts.remove_item(user, item_id).await
    }

    pub async fn clear_cart(&self, user: &Identity) -> Result<()> {
        self.carts.clear_cart(user).await
    }

    /// Checks out the caller's cart. `payment_method` is one of `card`,
    /// `cash` or `qris`.
    pub async fn checkout(
        &self,
        user: &Identity,
        payment_method: &str,
        cash_amount: Option<Decimal>,
    ) -> Result<CheckoutReceipt> {
        let payment = Self::payment(payment_method, cash_amount)?;
        self.checkout.checkout(user, payment).await
    }

    pub async fn place_order(
        &self,
        user: &Identity,
        payment_method: &str,
        cash_amount: Option<Decimal>,
        items: &[OrderLine],
    ) -> Result<Vec<CheckoutReceipt>> {
        let payment = Self::payment(payment_method, cash_amount)?;
        self.checkout.place_order(user, payment, items).await
    }

    pub async fn create_stand_order(
        &self,
        stand: &Identity,
        user_id: UserId,
        payment_method: &str,
        cash_amount: Option<Decimal>,
        items: &[OrderLine],
    ) -> Result<CheckoutReceipt> {
        let payment = Self::payment(payment_method, cash_amount)?;
        self.checkout
            .create_stand_order(stand, user_id, payment, items)
            .await
    }

    pub async fn update_order_status(
        &self,
        stand: &Identity,
        order_id: OrderId,
        new_status: &str,
    ) -> Result<Order> {
        let status: OrderStatus = new_status.parse()?;
        self.orders.update_status(stand, order_id, status).await
    }

    pub async fn upload_payment_proof(
        &self,
        user: &Identity,
        order_id: OrderId,
        file_ref: &str,
    ) -> Result<Order> {
        self.orders
            .upload_payment_proof(user, order_id, file_ref)
            .await
    }

    pub async fn cancel_order(&self, user: &Identity, order_id: OrderId) -> Result<Order> {
        self.orders.cancel_order(user, order_id).await
    }

    pub async fn delete_order(&self, stand: &Identity, order_id: OrderId) -> Result<Order> {
        self.orders.delete_order(stand, order_id).await
    }

    pub async fn get_order(&self, caller: &Identity, order_id: OrderId) -> Result<Order> {
        self.orders.get_order(caller, order_id).await
    }

    pub async fn list_orders_for_buyer(&self, user: &Identity) -> Result<Vec<Order>> {
        self.orders.orders_for_buyer(user).await
    }

    pub async fn list_orders_for_stand(&self, stand: &Identity) -> Result<Vec<Order>> {
        self.orders.orders_for_stand(stand).await
    }

    pub async fn pending_orders_for_stand(&self, stand: &Identity) -> Result<Vec<Order>> {
        self.orders.pending_orders(stand).await
    }

    pub async fn monthly_summary(
        &self,
        stand: &Identity,
        year: i32,
        month: u32,
    ) -> Result<MonthlySummary> {
        self.orders.monthly_summary(stand, year, month).await
    }

    /// Per-month revenue of the calling stand. `year` defaults to the
    /// current one.
    pub async fn yearly_recap(&self, stand: &Identity, year: Option<i32>) -> Result<YearlyRecap> {
        let year = year.unwrap_or_else(|| Utc::now().year());
        self.orders.yearly_recap(stand, year).await
    }

    pub async fn get_qris_for_stand(&self, stand_id: StandId) -> Result<QrisCode> {
        self.orders.qris_for_stand(stand_id).await
    }

    pub async fn get_qris_for_order(&self, user: &Identity, order_id: OrderId) -> Result<QrisCode> {
        self.orders.qris_for_order(user, order_id).await
    }

    /// Credits `amount` to a user and returns the new balance.
    pub async fn top_up_balance(
        &self,
        admin: &Identity,
        user_id: UserId,
        amount: Decimal,
    ) -> Result<Balance> {
        let tx = self.ledger.top_up(admin, user_id, amount).await?;
        Ok(tx.balance_after)
    }

    pub async fn refund_order(&self, admin: &Identity, order_id: OrderId) -> Result<Transaction> {
        self.ledger.refund_order(admin, order_id).await
    }

    pub async fn get_balance(&self, user: &Identity) -> Result<Balance> {
        self.ledger.balance(user).await
    }

    pub async fn list_transactions(&self, user: &Identity) -> Result<Vec<Transaction>> {
        self.ledger.history(user).await
    }

    /// Every user, in id order.
    pub async fn users(&self) -> Result<Vec<User>> {
        self.db.begin().await.users().await
    }

    /// Stores `user` unless a user with the same id already exists. Returns
    /// whether it was inserted.
    pub async fn seed_user(&self, user: &User) -> Result<bool> {
        let mut uow = self.db.begin().await;
        if uow.user(user.id).await?.is_some() {
            return Ok(false);
        }
        uow.put_user(user)?;
        uow.commit().await?;
        debug!(user_id = user.id, role = %user.role, "user seeded");
        Ok(true)
    }

    /// Stores `product` unless it already exists. Its stand must be a
    /// stored user.
    pub async fn seed_product(&self, product: &Product) -> Result<bool> {
        product.validate()?;
        let mut uow = self.db.begin().await;
        if uow.product(product.id).await?.is_some() {
            return Ok(false);
        }
        if uow.user(product.stand_id).await?.is_none() {
            return Err(CanteenError::NotFound("stand"));
        }
        uow.put_product(product)?;
        uow.commit().await?;
        debug!(product_id = product.id, stand_id = product.stand_id, "product seeded");
        Ok(true)
    }

    /// Stores stand settings unless the stand already has some.
    pub async fn seed_stand(&self, settings: &StandSettings) -> Result<bool> {
        let mut uow = self.db.begin().await;
        if uow.stand_settings(settings.stand_id).await?.is_some() {
            return Ok(false);
        }
        if uow.user(settings.stand_id).await?.is_none() {
            return Err(CanteenError::NotFound("stand"));
        }
        uow.put_stand_settings(settings)?;
        uow.commit().await?;
        debug!(stand_id = settings.stand_id, "stand settings seeded");
        Ok(true)
    }

    fn payment(method: &str, cash_amount: Option<Decimal>) -> Result<Payment> {
        let method: PaymentMethod = method.parse()?;
        Ok(Payment::new(method, cash_amount))
    }
}
