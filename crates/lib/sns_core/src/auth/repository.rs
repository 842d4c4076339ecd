//! Persistence contracts required by the session core.
//!
//! [`RefreshTokenRepository`] is the durable store behind
//! [`super::RefreshTokenStore`]; [`UserDirectory`] is the slice of the user
//! store the core consumes. PostgreSQL implementations live in
//! [`super::queries`], in-memory ones in [`super::memory`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::AuthError;
use crate::models::auth::{
    NewUser, RefreshTokenRecord, UserAccount, UserCredentials, UserId,
};

/// Storage for hashed refresh tokens. Every method must be atomic per row.
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Insert a new row. `token_hash` is unique across all rows.
    async fn create(&self, record: &RefreshTokenRecord) -> Result<(), AuthError>;

    async fn find_by_hash(&self, token_hash: &str)
    -> Result<Option<RefreshTokenRecord>, AuthError>;

    /// Set `revoked = true` on the matching row. Returns `false` when no row
    /// matches; an already revoked row still counts as a match.
    async fn revoke_by_hash(&self, token_hash: &str) -> Result<bool, AuthError>;

    /// Revoke only if the row is still active at `now`. Returns `true` only
    /// for the caller that performed the flip.
    async fn revoke_active_by_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthError>;

    /// Revoke every non-revoked row owned by `user_id`. Returns rows flipped.
    async fn revoke_all_for_user(&self, user_id: UserId) -> Result<u64, AuthError>;

    /// Delete rows with `expires_at < now`. Returns rows deleted.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError>;
}

/// User lookups needed by authentication.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserAccount>, AuthError>;

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, AuthError>;

    /// Create a pending account. Duplicate email or username is
    /// [`AuthError::Conflict`].
    async fn create(&self, user: NewUser) -> Result<UserAccount, AuthError>;
}
