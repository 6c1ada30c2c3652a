use rust_decimal::Decimal;
use thiserror::Error;

/// Broad classification of a [`CanteenError`].
///
/// Everything except `Persistence` is the caller's problem and is never
/// retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Stock,
    Balance,
    Forbidden,
    Persistence,
}

#[derive(Error, Debug)]
pub enum CanteenError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Invalid payment method '{0}'. Use 'card', 'cash', or 'qris'")]
    InvalidPaymentMethod(String),
    #[error("Insufficient cash. Required: {required}, provided: {provided}")]
    InsufficientCash { required: Decimal, provided: Decimal },
    #[error("Order is not eligible: {0}")]
    NotEligible(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(
        "Cannot add products from different stands (cart holds stand {current}, product belongs to stand {requested}). Please checkout or clear cart first."
    )]
    StandMismatch { current: u64, requested: u64 },
    #[error("Insufficient stock for product: {0}")]
    InsufficientStock(String),
    #[error("Insufficient balance. Required: {required}, available: {available}")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },
    #[error("Operation not permitted: {0}")]
    Forbidden(&'static str),
    #[error("Internal storage failure")]
    Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CanteenError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationError(_)
            | Self::EmptyCart
            | Self::InvalidPaymentMethod(_)
            | Self::InsufficientCash { .. }
            | Self::NotEligible(_)
            | Self::CsvError(_)
            | Self::YamlError(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::StandMismatch { .. } => ErrorKind::Conflict,
            Self::InsufficientStock(_) => ErrorKind::Stock,
            Self::InsufficientBalance { .. } => ErrorKind::Balance,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::IoError(_) | Self::Persistence(_) => ErrorKind::Persistence,
        }
    }

    pub(crate) fn persistence<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Persistence(Box::new(err))
    }
}

impl From<serde_json::Error> for CanteenError {
    fn from(err: serde_json::Error) -> Self {
        Self::persistence(err)
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for CanteenError {
    fn from(err: rocksdb::Error) -> Self {
        Self::persistence(err)
    }
}

pub type Result<T> = std::result::Result<T, CanteenError>;
