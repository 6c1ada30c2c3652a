use super::product::ProductId;
use super::user::{StandId, UserId};
use crate::error::CanteenError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type OrderId = u64;

/// Order progression: `payment_pending -> request -> cooking -> done`, with
/// `cancelled` as the alternate terminal state.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PaymentPending,
    Request,
    Cooking,
    Done,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentPending => "payment_pending",
            Self::Request => "request",
            Self::Cooking => "cooking",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    /// Statuses a buyer may still cancel from.
    pub fn buyer_cancellable(&self) -> bool {
        matches!(self, Self::PaymentPending | Self::Request)
    }

    /// Statuses a stand may still delete from.
    pub fn stand_deletable(&self) -> bool {
        !matches!(self, Self::Done | Self::Cancelled)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::PaymentPending | Self::Request | Self::Cooking)
    }

    /// Not yet picked up by the stand: unpaid, or paid and still queued.
    pub fn awaits_stand(&self) -> bool {
        matches!(self, Self::PaymentPending | Self::Request)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = CanteenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "payment_pending" => Ok(Self::PaymentPending),
            "request" => Ok(Self::Request),
            "cooking" => Ok(Self::Cooking),
            "done" => Ok(Self::Done),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(CanteenError::ValidationError(format!(
                "Invalid status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Debited from the buyer's balance at order creation.
    Card,
    /// Paid over the counter; the tendered amount must cover the total.
    Cash,
    /// Paid by scanning the stand's QRIS code, confirmed by a proof upload.
    Qris,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Cash => "cash",
            Self::Qris => "qris",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = CanteenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "card" => Ok(Self::Card),
            "cash" => Ok(Self::Cash),
            "qris" => Ok(Self::Qris),
            other => Err(CanteenError::InvalidPaymentMethod(other.to_string())),
        }
    }
}

/// Immutable price snapshot of one ordered product.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub stand_id: StandId,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub total_amount: Decimal,
    pub cash_amount: Option<Decimal>,
    pub payment_proof_url: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A requested `(product, quantity)` pair for orders built from an explicit
/// item list rather than a cart.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl Order {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn set_status(&mut self, status: OrderStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    /// Soft-cancels the order: it keeps its row but leaves every listing.
    pub fn soft_cancel(&mut self, now: DateTime<Utc>) {
        self.set_status(OrderStatus::Cancelled, now);
        self.deleted_at = Some(now);
    }

    /// Records a QRIS payment proof and releases the order to the stand.
    pub fn accept_payment_proof(
        &mut self,
        file_ref: &str,
        now: DateTime<Utc>,
    ) -> Result<(), CanteenError> {
        if self.payment_method != PaymentMethod::Qris
            || self.status != OrderStatus::PaymentPending
        {
            return Err(CanteenError::NotEligible(
                "order is not eligible for payment proof upload".to_string(),
            ));
        }
        self.payment_proof_url = Some(file_ref.to_string());
        self.set_status(OrderStatus::Request, now);
        Ok(())
    }
}
