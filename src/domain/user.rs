use super::money::{Amount, Balance};
use crate::auth::Role;
use crate::error::CanteenError;
use serde::{Deserialize, Serialize};

pub type UserId = u64;

/// A stand is a user account with the `stand_admin` role.
pub type StandId = UserId;

/// A canteen account: student, administrator or stand (vendor).
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub balance: Balance,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            balance: Balance::ZERO,
            is_active: true,
        }
    }

    /// Adds funds to the balance
    pub fn credit(&mut self, amount: Amount) -> Result<(), CanteenError> {
        self.balance = self.balance.checked_credit(amount)?;
        Ok(())
    }

    /// Removes funds from the balance if sufficient
    pub fn debit(&mut self, amount: Amount) -> Result<(), CanteenError> {
        if self.balance.covers(amount) {
            self.balance -= amount.into();
            Ok(())
        } else {
            Err(CanteenError::InsufficientBalance {
                required: amount.value(),
                available: self.balance.0,
            })
        }
    }
}
