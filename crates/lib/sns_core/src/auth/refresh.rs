//! Refresh token issuance, validation and revocation.
//!
//! The client receives an opaque random secret exactly once. Only its
//! SHA-256 digest is persisted, so a storage leak does not disclose usable
//! tokens. Revocation is a one-way flag; expired rows are reclaimed by a
//! background sweep.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, rng};
use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::AuthError;
use super::repository::RefreshTokenRepository;
use crate::models::auth::{RefreshTokenRecord, UserId};
use crate::uuid::uuidv7;

/// Bytes of entropy in a refresh token.
const REFRESH_TOKEN_BYTES: usize = 32;

/// Generate a cryptographically random refresh token
/// (32 bytes, base64url without padding).
pub fn generate_refresh_token() -> String {
    let bytes: [u8; REFRESH_TOKEN_BYTES] = rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hash a refresh token for storage.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Durable, rotatable, revocable refresh tokens.
pub struct RefreshTokenStore {
    repo: Arc<dyn RefreshTokenRepository>,
    ttl: Duration,
}

impl RefreshTokenStore {
    pub fn new(repo: Arc<dyn RefreshTokenRepository>, ttl: Duration) -> Self {
        Self { repo, ttl }
    }

    /// Refresh token lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a new refresh token for `user_id`, returning the plaintext.
    pub async fn issue(&self, user_id: UserId) -> Result<String, AuthError> {
        self.issue_at(user_id, Utc::now()).await
    }

    /// Like [`issue`](Self::issue) with an explicit issue time.
    pub async fn issue_at(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String, AuthError> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AuthError::Internal("refresh token expiry out of range".into()))?;
        let plaintext = generate_refresh_token();
        let record = RefreshTokenRecord {
            id: uuidv7(),
            user_id,
            token_hash: hash_refresh_token(&plaintext),
            expires_at,
            revoked: false,
            created_at: now,
        };
        self.repo.create(&record).await?;
        debug!(user_id, token_id = %record.id, "refresh token issued");
        Ok(plaintext)
    }

    /// Look up a refresh token and check that it is still usable.
    pub async fn validate(&self, token: &str) -> Result<RefreshTokenRecord, AuthError> {
        self.validate_at(token, Utc::now()).await
    }

    /// Like [`validate`](Self::validate) against an explicit clock.
    pub async fn validate_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, AuthError> {
        let record = self
            .repo
            .find_by_hash(&hash_refresh_token(token))
            .await?
            .ok_or(AuthError::RefreshTokenNotFound)?;

        if record.revoked {
            return Err(AuthError::RefreshTokenRevoked);
        }
        if now >= record.expires_at {
            return Err(AuthError::RefreshTokenExpired);
        }
        Ok(record)
    }

    /// Revoke a refresh token. Revoking an already revoked token succeeds.
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        if self.repo.revoke_by_hash(&hash_refresh_token(token)).await? {
            Ok(())
        } else {
            Err(AuthError::RefreshTokenNotFound)
        }
    }

    /// Revoke only if the token is still active. Exactly one concurrent
    /// caller observes `true` for a given token.
    pub async fn revoke_if_active(&self, token: &str) -> Result<bool, AuthError> {
        self.repo
            .revoke_active_by_hash(&hash_refresh_token(token), Utc::now())
            .await
    }

    /// Revoke every active refresh token owned by `user_id`.
    pub async fn revoke_all(&self, user_id: UserId) -> Result<u64, AuthError> {
        let revoked = self.repo.revoke_all_for_user(user_id).await?;
        info!(user_id, revoked, "revoked all refresh tokens");
        Ok(revoked)
    }

    /// Delete rows past their expiry. Storage reclamation only: expired rows
    /// are already rejected by [`validate`](Self::validate).
    pub async fn cleanup_expired(&self) -> Result<u64, AuthError> {
        self.repo.delete_expired(Utc::now()).await
    }

    /// Spawn a periodic cleanup task that runs until `shutdown` is cancelled.
    pub fn spawn_cleanup_task(
        self: &Arc<Self>,
        every: std::time::Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => match store.cleanup_expired().await {
                        Ok(0) => {}
                        Ok(deleted) => info!(deleted, "expired refresh tokens removed"),
                        Err(e) => warn!(error = %e, "refresh token cleanup failed"),
                    },
                }
            }
            debug!("refresh token cleanup task stopped");
        })
    }
}
