//! In-memory auth repositories.
//!
//! Same contracts as the PostgreSQL implementations, backed by maps behind a
//! lock. Used by tests and for running the API without a database.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::AuthError;
use super::repository::{RefreshTokenRepository, UserDirectory};
use crate::models::auth::{
    NewUser, RefreshTokenRecord, UserAccount, UserCredentials, UserId, UserRole, UserStatus,
};

/// Refresh tokens keyed by hash.
#[derive(Debug, Default)]
pub struct MemoryRefreshTokenRepository {
    rows: RwLock<HashMap<String, RefreshTokenRecord>>,
}

impl MemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, revoked or not.
    pub fn len(&self) -> usize {
        self.rows.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RefreshTokenRepository for MemoryRefreshTokenRepository {
    async fn create(&self, record: &RefreshTokenRecord) -> Result<(), AuthError> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        if rows.contains_key(&record.token_hash) {
            return Err(AuthError::Conflict("duplicate refresh token hash".into()));
        }
        rows.insert(record.token_hash.clone(), record.clone());
        Ok(())
    }

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AuthError> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        Ok(rows.get(token_hash).cloned())
    }

    async fn revoke_by_hash(&self, token_hash: &str) -> Result<bool, AuthError> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        match rows.get_mut(token_hash) {
            Some(row) => {
                row.revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_active_by_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthError> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        match rows.get_mut(token_hash) {
            Some(row) if row.is_valid_at(now) => {
                row.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_for_user(&self, user_id: UserId) -> Result<u64, AuthError> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        let mut flipped = 0;
        for row in rows
            .values_mut()
            .filter(|r| r.user_id == user_id && !r.revoked)
        {
            row.revoked = true;
            flipped += 1;
        }
        Ok(flipped)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        let before = rows.len();
        rows.retain(|_, r| r.expires_at >= now);
        Ok((before - rows.len()) as u64)
    }
}

#[derive(Debug, Default)]
struct UserTable {
    next_id: UserId,
    rows: HashMap<UserId, UserCredentials>,
}

/// Users keyed by id.
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    table: RwLock<UserTable>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user with an explicit status, bypassing registration.
    pub fn insert(&self, user: NewUser, status: UserStatus) -> Result<UserAccount, AuthError> {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = table.rows.values().find(|c| {
            c.account.email == user.email || c.account.username == user.username
        }) {
            let message = if existing.account.email == user.email {
                "Email already registered"
            } else {
                "Username already taken"
            };
            return Err(AuthError::Conflict(message.into()));
        }

        table.next_id += 1;
        let account = UserAccount {
            id: table.next_id,
            email: user.email,
            username: user.username,
            status,
            role: UserRole::User,
        };
        table.rows.insert(
            account.id,
            UserCredentials {
                account: account.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(account)
    }

    /// Change an account's moderation status. Returns `false` for unknown ids.
    pub fn set_status(&self, id: UserId, status: UserStatus) -> bool {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        match table.rows.get_mut(&id) {
            Some(creds) => {
                creds.account.status = status;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserAccount>, AuthError> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        Ok(table.rows.get(&id).map(|c| c.account.clone()))
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, AuthError> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        Ok(table
            .rows
            .values()
            .find(|c| c.account.email == email)
            .cloned())
    }

    async fn create(&self, user: NewUser) -> Result<UserAccount, AuthError> {
        self.insert(user, UserStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn new_user(email: &str, username: &str) -> NewUser {
        NewUser {
            email: email.into(),
            username: username.into(),
            password_hash: "hash".into(),
        }
    }

    fn row(hash: &str, user_id: UserId, expires_at: DateTime<Utc>) -> RefreshTokenRecord {
        RefreshTokenRecord {
            id: Uuid::now_v7(),
            user_id,
            token_hash: hash.into(),
            expires_at,
            revoked: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_hash_is_rejected() {
        let repo = MemoryRefreshTokenRepository::new();
        let exp = Utc::now() + Duration::days(1);
        repo.create(&row("h1", 1, exp)).await.unwrap();
        assert!(matches!(
            repo.create(&row("h1", 2, exp)).await,
            Err(AuthError::Conflict(_))
        ));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn conditional_revoke_flips_once() {
        let repo = MemoryRefreshTokenRepository::new();
        let now = Utc::now();
        repo.create(&row("h1", 1, now + Duration::days(1)))
            .await
            .unwrap();

        assert!(repo.revoke_active_by_hash("h1", now).await.unwrap());
        assert!(!repo.revoke_active_by_hash("h1", now).await.unwrap());
        assert!(!repo.revoke_active_by_hash("missing", now).await.unwrap());
    }

    #[tokio::test]
    async fn delete_expired_keeps_live_rows() {
        let repo = MemoryRefreshTokenRepository::new();
        let now = Utc::now();
        repo.create(&row("old", 1, now - Duration::seconds(1)))
            .await
            .unwrap();
        repo.create(&row("live", 1, now + Duration::days(1)))
            .await
            .unwrap();

        assert_eq!(repo.delete_expired(now).await.unwrap(), 1);
        assert!(repo.find_by_hash("old").await.unwrap().is_none());
        assert!(repo.find_by_hash("live").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn created_users_start_pending() {
        let users = MemoryUserDirectory::new();
        let account = users.create(new_user("a@example.com", "alice")).await.unwrap();
        assert_eq!(account.status, UserStatus::Pending);
        assert!(users.set_status(account.id, UserStatus::Approved));

        let found = users.find_by_id(account.id).await.unwrap().unwrap();
        assert!(found.is_active());
        assert!(!users.set_status(999, UserStatus::Approved));
    }

    #[tokio::test]
    async fn duplicate_email_or_username_conflicts() {
        let users = MemoryUserDirectory::new();
        users.create(new_user("a@example.com", "alice")).await.unwrap();

        assert!(matches!(
            users.create(new_user("a@example.com", "other")).await,
            Err(AuthError::Conflict(m)) if m.contains("Email")
        ));
        assert!(matches!(
            users.create(new_user("b@example.com", "alice")).await,
            Err(AuthError::Conflict(m)) if m.contains("Username")
        ));
    }
}
