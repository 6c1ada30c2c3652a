use super::unit_of_work::{Database, UnitOfWork};
use crate::auth::{Identity, Role};
use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::domain::stand::QrisCode;
use crate::domain::user::StandId;
use crate::domain::money::checked_sum;
use crate::error::{CanteenError, Result};
use chrono::{Datelike, Month, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

/// Order counts and revenue for one stand over one calendar month.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MonthlySummary {
    pub total_orders: usize,
    pub completed_orders: usize,
    /// Orders still waiting on payment or on the stand to start them.
    pub pending_orders: usize,
    /// Sum over every live order, whatever its status.
    pub total_revenue: Decimal,
}

/// Order count, `done` count and revenue over a set of live orders.
#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct RevenueTotals {
    pub total_orders: usize,
    pub completed_orders: usize,
    pub total_revenue: Decimal,
}

impl RevenueTotals {
    fn tally<'a>(orders: impl IntoIterator<Item = &'a Order> + Clone) -> Result<Self> {
        Ok(Self {
            total_orders: orders.clone().into_iter().count(),
            completed_orders: orders
                .clone()
                .into_iter()
                .filter(|o| o.status == OrderStatus::Done)
                .count(),
            total_revenue: checked_sum(orders.into_iter().map(|o| o.total_amount))?,
        })
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MonthlyRevenue {
    pub month: u32,
    pub month_name: &'static str,
    #[serde(flatten)]
    pub totals: RevenueTotals,
}

/// Twelve monthly rows for one stand, January first, plus the year's totals.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct YearlyRecap {
    pub year: i32,
    pub monthly_data: Vec<MonthlyRevenue>,
    pub yearly_summary: RevenueTotals,
}

/// Status changes and reads of orders after creation.
///
/// Nothing here touches stock or balances; those move once, when the order
/// is created.
#[derive(Clone)]
pub struct OrderLifecycle {
    db: Database,
}

impl OrderLifecycle {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Sets a stand's order to any known status. Transitions are not
    /// restricted to forward progression.
    pub async fn update_status(
        &self,
        stand: &Identity,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order> {
        stand.require(Role::StandAdmin, "update order status")?;

        let mut uow = self.db.begin().await;
        let mut order = Self::stand_order(&uow, stand.user_id, order_id).await?;
        let previous = order.status;
        order.set_status(status, Utc::now());
        uow.put_order(&order)?;
        uow.commit().await?;

        info!(
            order_id,
            stand_id = stand.user_id,
            from = %previous,
            to = %status,
            "order status updated"
        );
        Ok(order)
    }

    /// Records the proof for a pending QRIS order and moves it to `request`.
    pub async fn upload_payment_proof(
        &self,
        buyer: &Identity,
        order_id: OrderId,
        file_ref: &str,
    ) -> Result<Order> {
        buyer.require(Role::Student, "upload payment proofs")?;
        let file_ref = file_ref.trim();
        if file_ref.is_empty() {
            return Err(CanteenError::ValidationError(
                "Payment proof reference is required".to_string(),
            ));
        }

        let mut uow = self.db.begin().await;
        let mut order = Self::buyer_order(&uow, buyer, order_id).await?;
        order.accept_payment_proof(file_ref, Utc::now())?;
        uow.put_order(&order)?;
        uow.commit().await?;

        info!(order_id, user_id = buyer.user_id, "payment proof accepted");
        Ok(order)
    }

    /// Buyer-side cancellation, only before the stand starts cooking.
    pub async fn cancel_order(&self, buyer: &Identity, order_id: OrderId) -> Result<Order> {
        buyer.require(Role::Student, "cancel orders")?;

        let mut uow = self.db.begin().await;
        let mut order = Self::buyer_order(&uow, buyer, order_id).await?;
        if !order.status.buyer_cancellable() {
            return Err(CanteenError::NotEligible(format!(
                "order cannot be cancelled once it is {}",
                order.status
            )));
        }
        order.soft_cancel(Utc::now());
        uow.put_order(&order)?;
        uow.commit().await?;

        info!(order_id, user_id = buyer.user_id, "order cancelled by buyer");
        Ok(order)
    }

    /// Stand-side deletion of any order that is not finished yet.
    pub async fn delete_order(&self, stand: &Identity, order_id: OrderId) -> Result<Order> {
        stand.require(Role::StandAdmin, "delete orders")?;

        let mut uow = self.db.begin().await;
        let mut order = Self::stand_order(&uow, stand.user_id, order_id).await?;
        if !order.status.stand_deletable() {
            return Err(CanteenError::NotEligible(format!(
                "order cannot be deleted once it is {}",
                order.status
            )));
        }
        order.soft_cancel(Utc::now());
        uow.put_order(&order)?;
        uow.commit().await?;

        info!(order_id, stand_id = stand.user_id, "order deleted by stand");
        Ok(order)
    }

    /// An order visible to the caller: the buyer, the owning stand, or an
    /// admin.
    pub async fn get_order(&self, caller: &Identity, order_id: OrderId) -> Result<Order> {
        let uow = self.db.begin().await;
        let order = Self::live_order(&uow, order_id).await?;
        let visible = match caller.role {
            Role::Admin => true,
            Role::Student => order.user_id == caller.user_id,
            Role::StandAdmin => order.stand_id == caller.user_id,
        };
        if visible {
            Ok(order)
        } else {
            Err(CanteenError::NotFound("order"))
        }
    }

    /// The caller's own orders, newest first.
    pub async fn orders_for_buyer(&self, buyer: &Identity) -> Result<Vec<Order>> {
        buyer.require(Role::Student, "list own orders")?;
        self.list(|order| order.user_id == buyer.user_id).await
    }

    /// Orders received by the calling stand, newest first.
    pub async fn orders_for_stand(&self, stand: &Identity) -> Result<Vec<Order>> {
        stand.require(Role::StandAdmin, "list stand orders")?;
        self.list(|order| order.stand_id == stand.user_id).await
    }

    /// Orders the calling stand still has to work on, oldest first.
    pub async fn pending_orders(&self, stand: &Identity) -> Result<Vec<Order>> {
        stand.require(Role::StandAdmin, "list stand orders")?;
        let mut orders = self
            .list(|order| order.stand_id == stand.user_id && order.status.is_pending())
            .await?;
        orders.reverse();
        Ok(orders)
    }

    pub async fn monthly_summary(
        &self,
        stand: &Identity,
        year: i32,
        month: u32,
    ) -> Result<MonthlySummary> {
        stand.require(Role::StandAdmin, "view stand summaries")?;
        if !(1..=12).contains(&month) {
            return Err(CanteenError::ValidationError(format!(
                "Invalid month {month}"
            )));
        }

        let orders = self
            .list(|order| {
                order.stand_id == stand.user_id
                    && order.created_at.year() == year
                    && order.created_at.month() == month
            })
            .await?;

        let totals = RevenueTotals::tally(&orders)?;
        Ok(MonthlySummary {
            total_orders: totals.total_orders,
            completed_orders: totals.completed_orders,
            pending_orders: orders.iter().filter(|o| o.status.awaits_stand()).count(),
            total_revenue: totals.total_revenue,
        })
    }

    pub async fn yearly_recap(&self, stand: &Identity, year: i32) -> Result<YearlyRecap> {
        stand.require(Role::StandAdmin, "view stand summaries")?;

        let orders = self
            .list(|order| order.stand_id == stand.user_id && order.created_at.year() == year)
            .await?;

        let mut monthly_data = Vec::with_capacity(12);
        let mut month = Month::January;
        for _ in 0..12 {
            let number = month.number_from_month();
            let in_month = orders.iter().filter(|o| o.created_at.month() == number);
            monthly_data.push(MonthlyRevenue {
                month: number,
                month_name: month.name(),
                totals: RevenueTotals::tally(in_month)?,
            });
            month = month.succ();
        }

        Ok(YearlyRecap {
            year,
            monthly_data,
            yearly_summary: RevenueTotals::tally(&orders)?,
        })
    }

    pub async fn qris_for_stand(&self, stand_id: StandId) -> Result<QrisCode> {
        let uow = self.db.begin().await;
        uow.stand_settings(stand_id)
            .await?
            .and_then(|settings| settings.qris_code())
            .ok_or(CanteenError::NotFound("QRIS code"))
    }

    /// The QRIS code to pay one of the caller's orders with.
    pub async fn qris_for_order(&self, buyer: &Identity, order_id: OrderId) -> Result<QrisCode> {
        let stand_id = {
            let uow = self.db.begin().await;
            Self::buyer_order(&uow, buyer, order_id).await?.stand_id
        };
        self.qris_for_stand(stand_id).await
    }

    async fn list<F>(&self, keep: F) -> Result<Vec<Order>>
    where
        F: Fn(&Order) -> bool,
    {
        let uow = self.db.begin().await;
        let mut orders: Vec<Order> = uow
            .orders()
            .await?
            .into_iter()
            .filter(|order| !order.is_deleted() && keep(order))
            .collect();
        // Ids are allocated in creation order.
        orders.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(orders)
    }

    async fn live_order(uow: &UnitOfWork, order_id: OrderId) -> Result<Order> {
        uow.order(order_id)
            .await?
            .filter(|order| !order.is_deleted())
            .ok_or(CanteenError::NotFound("order"))
    }

    async fn buyer_order(uow: &UnitOfWork, buyer: &Identity, order_id: OrderId) -> Result<Order> {
        let order = Self::live_order(uow, order_id).await?;
        if order.user_id != buyer.user_id {
            return Err(CanteenError::NotFound("order"));
        }
        Ok(order)
    }

    async fn stand_order(uow: &UnitOfWork, stand_id: StandId, order_id: OrderId) -> Result<Order> {
        let order = Self::live_order(uow, order_id).await?;
        if order.stand_id != stand_id {
            return Err(CanteenError::NotFound("order"));
        }
        Ok(order)
    }
}
