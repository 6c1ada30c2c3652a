use super::cart::CartService;
use super::ledger::{LedgerService, Posting};
use super::unit_of_work::{Database, Sequence, UnitOfWork};
use crate::auth::{Identity, Role};
use crate::domain::cart::CartItem;
use crate::domain::money::{Amount, checked_sum, line_total};
use crate::domain::order::{Order, OrderItem, OrderLine, OrderStatus, PaymentMethod};
use crate::domain::product::{Product, ProductId};
use crate::domain::stand::QrisCode;
use crate::domain::transaction::TransactionType;
use crate::domain::user::{StandId, UserId};
use crate::error::{CanteenError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// How the buyer intends to pay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Payment {
    pub method: PaymentMethod,
    /// Amount tendered; required for cash.
    pub cash_amount: Option<Decimal>,
}

impl Payment {
    pub fn new(method: PaymentMethod, cash_amount: Option<Decimal>) -> Self {
        Self {
            method,
            cash_amount,
        }
    }

    pub fn card() -> Self {
        Self::new(PaymentMethod::Card, None)
    }

    pub fn qris() -> Self {
        Self::new(PaymentMethod::Qris, None)
    }

    pub fn cash(amount: Decimal) -> Self {
        Self::new(PaymentMethod::Cash, Some(amount))
    }

    fn validate(&self) -> Result<()> {
        if self.method == PaymentMethod::Cash
            && !self.cash_amount.is_some_and(|amount| amount > Decimal::ZERO)
        {
            return Err(CanteenError::ValidationError(
                "Cash amount is required for cash payment".to_string(),
            ));
        }
        Ok(())
    }
}

/// A created order, plus the QRIS code to pay it with when applicable.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CheckoutReceipt {
    pub order: Order,
    pub qris: Option<QrisCode>,
}

/// A line priced before the order is written.
#[derive(Debug, Clone)]
struct PricedLine {
    product_id: ProductId,
    quantity: u32,
    price: Decimal,
    subtotal: Decimal,
}

impl From<&CartItem> for PricedLine {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id,
            quantity: item.quantity,
            price: item.price,
            subtotal: item.subtotal,
        }
    }
}

impl PricedLine {
    fn at_current_price(product: &Product, quantity: u32) -> Result<Self> {
        let price = product.unit_price();
        Ok(Self {
            product_id: product.id,
            quantity,
            price,
            subtotal: line_total(price, quantity)?,
        })
    }
}

/// Turns carts and explicit item lists into orders, one per stand.
///
/// Stock checks, stock decrements, the card debit and the order rows for one
/// checkout are written in a single unit of work: they all land or none do.
#[derive(Clone)]
pub struct CheckoutService {
    db: Database,
}

impl CheckoutService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Checks out the caller's cart into a single order for the cart's stand.
    ///
    /// Emptying the cart afterwards is best-effort: if it fails, the order
    /// stands and the failure is only logged.
    pub async fn checkout(&self, user: &Identity, payment: Payment) -> Result<CheckoutReceipt> {
        user.require(Role::Student, "check out")?;
        payment.validate()?;

        let mut uow = self.db.begin().await;
        let cart = uow
            .cart_for_user(user.user_id)
            .await?
            .ok_or(CanteenError::EmptyCart)?;
        let items = uow.cart_items(cart.id).await?;
        let stand_id = items.first().ok_or(CanteenError::EmptyCart)?.stand_id;

        let lines = items.iter().map(PricedLine::from).collect();
        let receipt = Self::fulfil(&mut uow, user.user_id, stand_id, payment, lines).await?;
        uow.commit().await?;
        Self::log_created(&receipt.order);

        if let Err(err) = self.empty_cart_after_checkout(user).await {
            warn!(
                user_id = user.user_id,
                order_id = receipt.order.id,
                error = ?err,
                "failed to clear cart after checkout"
            );
        }

        Ok(receipt)
    }

    /// Orders an explicit item list directly. Items are grouped by the stand
    /// that owns them and every group becomes its own order, all in one unit
    /// of work.
    ///
    /// For cash, the tendered amount must cover the combined total. With more
    /// than one stand, each order records its own total as its cash amount.
    pub async fn place_order(
        &self,
        user: &Identity,
        payment: Payment,
        lines: &[OrderLine],
    ) -> Result<Vec<CheckoutReceipt>> {
        user.require(Role::Student, "place orders")?;
        payment.validate()?;
        if lines.is_empty() {
            return Err(CanteenError::EmptyCart);
        }

        let mut uow = self.db.begin().await;
        let mut groups: BTreeMap<StandId, Vec<PricedLine>> = BTreeMap::new();
        for line in lines {
            let product = Self::orderable_product(&uow, line).await?;
            groups
                .entry(product.stand_id)
                .or_default()
                .push(PricedLine::at_current_price(&product, line.quantity)?);
        }

        let split = groups.len() > 1;
        let mut receipts = Vec::with_capacity(groups.len());
        for (stand_id, lines) in groups {
            let group_payment = if split && payment.method == PaymentMethod::Cash {
                Payment::cash(checked_sum(lines.iter().map(|line| line.subtotal))?)
            } else {
                payment
            };
            receipts.push(Self::fulfil(&mut uow, user.user_id, stand_id, group_payment, lines).await?);
        }

        if let (PaymentMethod::Cash, Some(tendered)) = (payment.method, payment.cash_amount) {
            let required = checked_sum(receipts.iter().map(|r| r.order.total_amount))?;
            if tendered < required {
                return Err(CanteenError::InsufficientCash {
                    required,
                    provided: tendered,
                });
            }
        }

        uow.commit().await?;
        for receipt in &receipts {
            Self::log_created(&receipt.order);
        }
        Ok(receipts)
    }

    /// A stand rings up an order on behalf of a buyer. Only the stand's own
    /// products may be ordered.
    pub async fn create_stand_order(
        &self,
        stand: &Identity,
        buyer_id: UserId,
        payment: Payment,
        lines: &[OrderLine],
    ) -> Result<CheckoutReceipt> {
        stand.require(Role::StandAdmin, "create stand orders")?;
        payment.validate()?;
        if lines.is_empty() {
            return Err(CanteenError::EmptyCart);
        }

        let mut uow = self.db.begin().await;
        if uow.user(buyer_id).await?.is_none() {
            return Err(CanteenError::NotFound("user"));
        }

        let mut priced = Vec::with_capacity(lines.len());
        for line in lines {
            let product = Self::orderable_product(&uow, line).await?;
            if product.stand_id != stand.user_id {
                return Err(CanteenError::NotFound("product"));
            }
            priced.push(PricedLine::at_current_price(&product, line.quantity)?);
        }

        let receipt = Self::fulfil(&mut uow, buyer_id, stand.user_id, payment, priced).await?;
        uow.commit().await?;
        Self::log_created(&receipt.order);
        Ok(receipt)
    }

    async fn orderable_product(uow: &UnitOfWork, line: &OrderLine) -> Result<Product> {
        if line.quantity == 0 {
            return Err(CanteenError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }
        let product = uow
            .product(line.product_id)
            .await?
            .ok_or(CanteenError::NotFound("product"))?;
        if !product.is_active {
            return Err(CanteenError::ValidationError(format!(
                "Product is not available: {}",
                product.name
            )));
        }
        Ok(product)
    }

    /// Creates one order for one stand inside `uow`.
    ///
    /// Stock is re-read from storage here, not taken from earlier reads, and
    /// decremented before any balance is touched.
    async fn fulfil(
        uow: &mut UnitOfWork,
        buyer_id: UserId,
        stand_id: StandId,
        payment: Payment,
        lines: Vec<PricedLine>,
    ) -> Result<CheckoutReceipt> {
        if lines.is_empty() {
            return Err(CanteenError::EmptyCart);
        }

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let mut product = uow
                .product(line.product_id)
                .await?
                .ok_or(CanteenError::NotFound("product"))?;
            product.take_stock(line.quantity)?;
            uow.put_product(&product)?;
            items.push(OrderItem {
                product_id: product.id,
                product_name: product.name,
                quantity: line.quantity,
                price: line.price,
                subtotal: line.subtotal,
            });
        }

        let total_amount = checked_sum(items.iter().map(|item| item.subtotal))?;

        let (status, cash_amount) = match payment.method {
            PaymentMethod::Cash => {
                let provided = payment.cash_amount.unwrap_or_default();
                if provided < total_amount {
                    return Err(CanteenError::InsufficientCash {
                        required: total_amount,
                        provided,
                    });
                }
                (OrderStatus::Request, Some(provided))
            }
            PaymentMethod::Card => (OrderStatus::Request, None),
            PaymentMethod::Qris => (OrderStatus::PaymentPending, None),
        };

        let id = uow.next_id(Sequence::Order).await?;
        let now = Utc::now();
        let order = Order {
            id,
            order_number: format!(
                "ORD-{buyer_id}-{stand_id}-{}-{id:06}",
                now.format("%Y%m%d%H%M%S")
            ),
            user_id: buyer_id,
            stand_id,
            status,
            payment_method: payment.method,
            total_amount,
            cash_amount,
            payment_proof_url: None,
            items,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        if payment.method == PaymentMethod::Card && total_amount > Decimal::ZERO {
            LedgerService::apply(
                uow,
                Posting {
                    user_id: buyer_id,
                    kind: TransactionType::Purchase,
                    amount: Amount::new(total_amount)?,
                    order_id: Some(order.id),
                    description: format!("Purchase: {}", order.order_number),
                },
            )
            .await?;
        }

        uow.put_order(&order)?;

        let qris = match payment.method {
            PaymentMethod::Qris => uow
                .stand_settings(stand_id)
                .await?
                .and_then(|settings| settings.qris_code()),
            _ => None,
        };

        Ok(CheckoutReceipt { order, qris })
    }

    async fn empty_cart_after_checkout(&self, user: &Identity) -> Result<()> {
        let mut uow = self.db.begin().await;
        CartService::empty_cart(&mut uow, user).await?;
        uow.commit().await
    }

    fn log_created(order: &Order) {
        info!(
            order_id = order.id,
            order_number = %order.order_number,
            user_id = order.user_id,
            stand_id = order.stand_id,
            payment_method = %order.payment_method,
            status = %order.status,
            total = %order.total_amount,
            "order created"
        );
    }
}
