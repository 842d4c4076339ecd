//! Session orchestration: login, rotation, logout and revoke-all.
//!
//! Refresh token state machine: `Active -> Revoked` on refresh or logout,
//! `Active -> Expired` when the TTL elapses. Both are terminal.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::AuthError;
use super::config::SessionConfig;
use super::jwt::TokenCodec;
use super::refresh::RefreshTokenStore;
use super::repository::RefreshTokenRepository;
use crate::models::auth::{TokenPair, UserId};

/// Composes the access-token codec and the refresh-token store.
pub struct SessionService {
    codec: TokenCodec,
    store: Arc<RefreshTokenStore>,
}

impl SessionService {
    pub fn new(codec: TokenCodec, store: Arc<RefreshTokenStore>) -> Self {
        Self { codec, store }
    }

    /// Build the codec and store from configuration over `repo`.
    pub fn from_config(config: &SessionConfig, repo: Arc<dyn RefreshTokenRepository>) -> Self {
        Self::new(
            TokenCodec::from_config(config),
            Arc::new(RefreshTokenStore::new(repo, config.refresh_token_ttl)),
        )
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn store(&self) -> &Arc<RefreshTokenStore> {
        &self.store
    }

    /// Issue a fresh access + refresh pair for an authenticated user.
    pub async fn login(&self, user_id: UserId) -> Result<TokenPair, AuthError> {
        let pair = self.issue_pair(user_id).await?;
        info!(user_id, "session started");
        Ok(pair)
    }

    /// Rotate: validate the old refresh token, revoke it, issue a new pair.
    ///
    /// The old token is revoked with a conditional update, so when two
    /// requests race with the same token only one of them gets a new pair.
    pub async fn refresh(&self, old_refresh_token: &str) -> Result<TokenPair, AuthError> {
        let record = self
            .store
            .validate(old_refresh_token)
            .await
            .map_err(reject_refresh)?;

        if !self.store.revoke_if_active(old_refresh_token).await? {
            warn!(user_id = record.user_id, "refresh token reused during rotation");
            return Err(AuthError::Unauthorized("Invalid refresh token".into()));
        }

        let pair = self.issue_pair(record.user_id).await?;
        debug!(user_id = record.user_id, "session rotated");
        Ok(pair)
    }

    /// Best-effort revoke. Never fails from the caller's point of view.
    pub async fn logout(&self, refresh_token: &str) {
        match self.store.revoke(refresh_token).await {
            Ok(()) => debug!("session ended"),
            Err(AuthError::RefreshTokenNotFound) => debug!("logout with unknown refresh token"),
            Err(e) => warn!(error = %e, "logout revoke failed"),
        }
    }

    /// Revoke every refresh token of `user_id` ("log out everywhere").
    pub async fn revoke_all_sessions(&self, user_id: UserId) -> Result<u64, AuthError> {
        self.store.revoke_all(user_id).await
    }

    /// Verify an access token and return its subject.
    pub fn verify_access(&self, access_token: &str) -> Result<UserId, AuthError> {
        self.codec.verify(access_token)
    }

    async fn issue_pair(&self, user_id: UserId) -> Result<TokenPair, AuthError> {
        let access_token = self.codec.issue(user_id)?;
        let refresh_token = self.store.issue(user_id).await?;
        Ok(TokenPair {
            user_id,
            access_token,
            access_expires_in: self.codec.ttl().num_seconds(),
            refresh_token,
            refresh_expires_in: self.store.ttl().num_seconds(),
        })
    }
}

/// Refresh token rejections become `Unauthorized`; infrastructure errors
/// pass through untouched.
fn reject_refresh(e: AuthError) -> AuthError {
    if e.is_refresh_rejection() {
        AuthError::Unauthorized(e.to_string())
    } else {
        e
    }
}
