use crate::domain::order::OrderLine;
use crate::domain::user::UserId;
use crate::error::{CanteenError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum Operation {
    #[serde(rename = "topup")]
    TopUp,
    #[serde(rename = "add")]
    AddToCart,
    #[serde(rename = "update")]
    UpdateCartItem,
    #[serde(rename = "remove")]
    RemoveFromCart,
    #[serde(rename = "clear")]
    ClearCart,
    #[serde(rename = "checkout")]
    Checkout,
    #[serde(rename = "order")]
    PlaceOrder,
    #[serde(rename = "stand_order")]
    StandOrder,
    #[serde(rename = "status")]
    UpdateStatus,
    #[serde(rename = "proof")]
    UploadProof,
    #[serde(rename = "cancel")]
    Cancel,
    #[serde(rename = "delete")]
    Delete,
    #[serde(rename = "refund")]
    Refund,
}

/// One row of a command file.
///
/// `actor` is the user performing the command. The meaning of `target`
/// depends on the operation: a user, product, cart item or order id.
/// `reference` carries a status, a proof reference, or an item list such as
/// `3x2;5x1` (product 3 twice, product 5 once).
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CommandRecord {
    pub op: Operation,
    pub actor: UserId,
    #[serde(default)]
    pub target: Option<u64>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

impl CommandRecord {
    pub fn target(&self) -> Result<u64> {
        self.target
            .ok_or_else(|| CanteenError::ValidationError("missing target".to_string()))
    }

    pub fn quantity(&self) -> Result<u32> {
        self.quantity
            .ok_or_else(|| CanteenError::ValidationError("missing quantity".to_string()))
    }

    pub fn amount(&self) -> Result<Decimal> {
        self.amount
            .ok_or_else(|| CanteenError::ValidationError("missing amount".to_string()))
    }

    pub fn method(&self) -> Result<&str> {
        self.method
            .as_deref()
            .ok_or_else(|| CanteenError::ValidationError("missing payment method".to_string()))
    }

    pub fn reference(&self) -> Result<&str> {
        self.reference
            .as_deref()
            .filter(|r| !r.is_empty())
            .ok_or_else(|| CanteenError::ValidationError("missing reference".to_string()))
    }

    /// Parses `reference` as an item list.
    pub fn order_lines(&self) -> Result<Vec<OrderLine>> {
        parse_order_lines(self.reference()?)
    }
}

/// Parses `product x quantity` pairs separated by `;`, e.g. `3x2;5x1`.
pub fn parse_order_lines(raw: &str) -> Result<Vec<OrderLine>> {
    raw.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let invalid = || CanteenError::ValidationError(format!("Invalid item '{part}'"));
            let (product, quantity) = part.split_once('x').ok_or_else(invalid)?;
            Ok(OrderLine {
                product_id: product.trim().parse().map_err(|_| invalid())?,
                quantity: quantity.trim().parse().map_err(|_| invalid())?,
            })
        })
        .collect()
}

/// Reads commands from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<CommandRecord>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes commands.
    pub fn commands(self) -> impl Iterator<Item = Result<CommandRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(CanteenError::from))
    }
}
