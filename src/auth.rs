//! Caller identity handed to the canteen core.
//!
//! Credentials are validated outside the core. Operations receive a trusted
//! [`Identity`] and only check that its role may perform them.

use crate::domain::user::{User, UserId};
use crate::error::{CanteenError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Admin,
    StandAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
            Role::StandAdmin => "stand_admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn student(user_id: UserId) -> Self {
        Self::new(user_id, Role::Student)
    }

    pub fn stand(user_id: UserId) -> Self {
        Self::new(user_id, Role::StandAdmin)
    }

    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn require(&self, role: Role, action: &'static str) -> Result<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(CanteenError::Forbidden(action))
        }
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.role)
    }
}

/// Resolves an opaque bearer token into an [`Identity`].
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Returns `None` for unknown or expired tokens.
    async fn validate(&self, token: &str) -> Result<Option<Identity>>;
}

#[derive(Debug, Clone)]
struct Session {
    identity: Identity,
    expires_at: DateTime<Utc>,
}

/// Token sessions kept in memory, each with an explicit expiry.
///
/// Instances are injected where needed; there is no process-wide store.
#[derive(Default, Clone)]
pub struct InMemoryTokenValidator {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl InMemoryTokenValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn issue(
        &self,
        token: impl Into<String>,
        identity: Identity,
        expires_at: DateTime<Utc>,
    ) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            token.into(),
            Session {
                identity,
                expires_at,
            },
        );
    }

    pub async fn revoke(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    /// Drops every session that expired before `now`.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.expires_at > now);
        before - sessions.len()
    }
}

#[async_trait]
impl TokenValidator for InMemoryTokenValidator {
    async fn validate(&self, token: &str) -> Result<Option<Identity>> {
        let session = self.sessions.read().await.get(token).cloned();
        match session {
            Some(session) if session.expires_at > Utc::now() => Ok(Some(session.identity)),
            Some(_) => {
                self.revoke(token).await;
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_role_gate() {
        let student = Identity::student(1);
        assert!(student.require(Role::Student, "checkout").is_ok());
        assert!(matches!(
            student.require(Role::Admin, "top up balances"),
            Err(CanteenError::Forbidden("top up balances"))
        ));
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::StandAdmin).unwrap();
        assert_eq!(json, "\"stand_admin\"");
    }

    #[tokio::test]
    async fn test_token_validation_respects_expiry() {
        let validator = InMemoryTokenValidator::new();
        let now = Utc::now();
        validator
            .issue("live", Identity::student(7), now + Duration::days(10))
            .await;
        validator
            .issue("stale", Identity::admin(1), now - Duration::seconds(1))
            .await;

        assert_eq!(
            validator.validate("live").await.unwrap(),
            Some(Identity::student(7))
        );
        assert_eq!(validator.validate("stale").await.unwrap(), None);
        assert_eq!(validator.validate("unknown").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let validator = InMemoryTokenValidator::new();
        let now = Utc::now();
        validator
            .issue("a", Identity::student(1), now - Duration::hours(1))
            .await;
        validator
            .issue("b", Identity::student(2), now + Duration::hours(1))
            .await;

        assert_eq!(validator.purge_expired(now).await, 1);
        assert!(validator.validate("b").await.unwrap().is_some());
    }
}
