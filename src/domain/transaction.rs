use super::money::{Amount, Balance};
use super::order::OrderId;
use super::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type TransactionId = u64;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    TopUp,
    Purchase,
    Refund,
}

impl TransactionType {
    /// Prefix of the human-readable transaction number.
    pub fn number_prefix(&self) -> &'static str {
        match self {
            Self::TopUp => "TOPUP",
            Self::Purchase => "PUR",
            Self::Refund => "REF",
        }
    }

    /// The balance after moving `amount`, or `None` when it does not fit.
    pub fn apply(&self, balance: Balance, amount: Amount) -> Option<Balance> {
        match self {
            Self::TopUp | Self::Refund => balance.checked_credit(amount).ok(),
            Self::Purchase => balance.0.checked_sub(amount.value()).map(Balance),
        }
    }
}

/// One immutable ledger entry. `balance_after` always equals
/// `balance_before` moved by `amount` in the direction of `type`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub transaction_number: String,
    pub user_id: UserId,
    pub r#type: TransactionType,
    pub amount: Amount,
    pub balance_before: Balance,
    pub balance_after: Balance,
    pub description: String,
    pub order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn reconciles(&self) -> bool {
        self.r#type.apply(self.balance_before, self.amount) == Some(self.balance_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_apply_direction() {
        let balance = Balance::new(dec!(1000));
        let amount = Amount::new(dec!(400)).unwrap();
        assert_eq!(
            TransactionType::TopUp.apply(balance, amount),
            Some(Balance::new(dec!(1400)))
        );
        assert_eq!(
            TransactionType::Refund.apply(balance, amount),
            Some(Balance::new(dec!(1400)))
        );
        assert_eq!(
            TransactionType::Purchase.apply(balance, amount),
            Some(Balance::new(dec!(600)))
        );
        assert_eq!(
            TransactionType::TopUp.apply(Balance::new(rust_decimal::Decimal::MAX), amount),
            None
        );
    }

    #[test]
    fn test_transaction_type_serialization() {
        let json = serde_json::to_string(&TransactionType::TopUp).unwrap();
        assert_eq!(json, "\"top_up\"");
    }

    #[test]
    fn test_reconciles() {
        let tx = Transaction {
            id: 1,
            transaction_number: "TOPUP-1".to_string(),
            user_id: 1,
            r#type: TransactionType::TopUp,
            amount: Amount::new(dec!(50000)).unwrap(),
            balance_before: Balance::ZERO,
            balance_after: Balance::new(dec!(50000)),
            description: "Balance top-up".to_string(),
            order_id: None,
            created_at: Utc::now(),
        };
        assert!(tx.reconciles());
    }
}
