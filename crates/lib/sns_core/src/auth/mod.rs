//! Authentication and session lifecycle.
//!
//! Access tokens are stateless HS256 JWTs ([`jwt::TokenCodec`]). Refresh
//! tokens are opaque, hashed at rest and revocable
//! ([`refresh::RefreshTokenStore`]). [`session::SessionService`] composes the
//! two into login, rotation, logout and revoke-all.

pub mod config;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod queries;
pub mod refresh;
pub mod repository;
pub mod session;

use thiserror::Error;

pub use config::{JwtSecret, SessionConfig};
pub use jwt::TokenCodec;
pub use refresh::RefreshTokenStore;
pub use repository::{RefreshTokenRepository, UserDirectory};
pub use session::SessionService;

use crate::config::ConfigError;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Bad signature, wrong algorithm or unparseable token.
    #[error("Invalid token")]
    InvalidToken,

    /// Signature is fine but the subject or expiry claim is missing or mistyped.
    #[error("Malformed token claims")]
    MalformedClaims,

    #[error("Token expired")]
    TokenExpired,

    #[error("Refresh token not found")]
    RefreshTokenNotFound,

    #[error("Refresh token expired")]
    RefreshTokenExpired,

    #[error("Refresh token revoked")]
    RefreshTokenRevoked,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid credentials")]
    CredentialError,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// True for every rejection of a refresh token itself, as opposed to an
    /// infrastructure failure while checking it.
    pub fn is_refresh_rejection(&self) -> bool {
        matches!(
            self,
            Self::RefreshTokenNotFound | Self::RefreshTokenExpired | Self::RefreshTokenRevoked
        )
    }

    /// True for every rejection of an access token.
    pub fn is_access_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidToken | Self::MalformedClaims | Self::TokenExpired
        )
    }
}
