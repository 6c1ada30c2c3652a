use super::unit_of_work::{Database, Sequence, UnitOfWork};
use crate::auth::{Identity, Role};
use crate::domain::money::{Amount, Balance};
use crate::domain::order::{OrderId, OrderStatus, PaymentMethod};
use crate::domain::transaction::{Transaction, TransactionType};
use crate::domain::user::UserId;
use crate::error::{CanteenError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

/// A balance movement to record against one user.
#[derive(Debug, Clone)]
pub struct Posting {
    pub user_id: UserId,
    pub kind: TransactionType,
    pub amount: Amount,
    pub order_id: Option<OrderId>,
    pub description: String,
}

/// Balance mutations and their append-only transaction history.
///
/// Every balance change writes the new user balance and the matching
/// [`Transaction`] row in the same unit of work, so the two never diverge.
#[derive(Clone)]
pub struct LedgerService {
    db: Database,
}

impl LedgerService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Applies a posting inside the caller's unit of work.
    ///
    /// A failed purchase leaves the unit of work untouched; the caller decides
    /// whether to roll back anything else it staged.
    pub async fn apply(uow: &mut UnitOfWork, posting: Posting) -> Result<Transaction> {
        let mut user = uow
            .user(posting.user_id)
            .await?
            .ok_or(CanteenError::NotFound("user"))?;

        let balance_before = user.balance;
        match posting.kind {
            TransactionType::Purchase => user.debit(posting.amount)?,
            TransactionType::TopUp | TransactionType::Refund => user.credit(posting.amount)?,
        }

        let id = uow.next_id(Sequence::Transaction).await?;
        let now = Utc::now();
        let tx = Transaction {
            id,
            transaction_number: format!(
                "{}-{}-{:06}",
                posting.kind.number_prefix(),
                now.format("%Y%m%d%H%M%S"),
                id
            ),
            user_id: user.id,
            r#type: posting.kind,
            amount: posting.amount,
            balance_before,
            balance_after: user.balance,
            description: posting.description,
            order_id: posting.order_id,
            created_at: now,
        };

        uow.put_user(&user)?;
        uow.append_transaction(&tx)?;
        Ok(tx)
    }

    pub async fn top_up(
        &self,
        admin: &Identity,
        user_id: UserId,
        amount: Decimal,
    ) -> Result<Transaction> {
        admin.require(Role::Admin, "top up balances")?;
        let amount = Amount::new(amount)?;

        let mut uow = self.db.begin().await;
        let tx = Self::apply(
            &mut uow,
            Posting {
                user_id,
                kind: TransactionType::TopUp,
                amount,
                order_id: None,
                description: "Balance top-up".to_string(),
            },
        )
        .await?;
        uow.commit().await?;

        info!(
            user_id,
            amount = %amount,
            balance = %tx.balance_after,
            transaction = %tx.transaction_number,
            "balance topped up"
        );
        Ok(tx)
    }

    /// Credits back a cancelled card order. Cancellation never refunds on its
    /// own; this is the explicit reconciliation step, allowed once per order.
    pub async fn refund_order(&self, admin: &Identity, order_id: OrderId) -> Result<Transaction> {
        admin.require(Role::Admin, "refund orders")?;

        let mut uow = self.db.begin().await;
        let order = uow
            .order(order_id)
            .await?
            .ok_or(CanteenError::NotFound("order"))?;

        if order.payment_method != PaymentMethod::Card {
            return Err(CanteenError::NotEligible(
                "only card orders are refunded to the balance".to_string(),
            ));
        }
        if order.status != OrderStatus::Cancelled {
            return Err(CanteenError::NotEligible(
                "only cancelled orders can be refunded".to_string(),
            ));
        }
        let already_refunded = uow
            .transactions_for_user(order.user_id)
            .await?
            .iter()
            .any(|tx| tx.r#type == TransactionType::Refund && tx.order_id == Some(order.id));
        if already_refunded {
            return Err(CanteenError::NotEligible(
                "order has already been refunded".to_string(),
            ));
        }

        let tx = Self::apply(
            &mut uow,
            Posting {
                user_id: order.user_id,
                kind: TransactionType::Refund,
                amount: Amount::new(order.total_amount)?,
                order_id: Some(order.id),
                description: format!("Refund: {}", order.order_number),
            },
        )
        .await?;
        uow.commit().await?;

        info!(order_id, user_id = order.user_id, amount = %tx.amount, "order refunded");
        Ok(tx)
    }

    pub async fn balance(&self, identity: &Identity) -> Result<Balance> {
        let uow = self.db.begin().await;
        let user = uow
            .user(identity.user_id)
            .await?
            .ok_or(CanteenError::NotFound("user"))?;
        Ok(user.balance)
    }

    /// The caller's ledger, oldest entry first.
    pub async fn history(&self, identity: &Identity) -> Result<Vec<Transaction>> {
        let uow = self.db.begin().await;
        uow.transactions_for_user(identity.user_id).await
    }
}
