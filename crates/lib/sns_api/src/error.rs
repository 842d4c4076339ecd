//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use sns_core::auth::AuthError;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;
use crate::services::cookies::CookiePolicy;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 401 that also expires the auth cookies.
    #[error("Session rejected: {0}")]
    SessionRejected(String, CookiePolicy),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 403 for accounts that are not approved; also expires the auth cookies.
    #[error("Account not active: {0}")]
    AccountInactive(String, CookiePolicy),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// Attach cookie clearing to token rejections.
    pub fn clearing_cookies(self, policy: CookiePolicy) -> Self {
        match self {
            AppError::Unauthorized(m) | AppError::SessionRejected(m, _) => {
                AppError::SessionRejected(m, policy)
            }
            other => other,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.as_str()),
            AppError::Unauthorized(m) | AppError::SessionRejected(m, _) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str())
            }
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::AccountInactive(m, _) => {
                (StatusCode::FORBIDDEN, "account_not_active", m.as_str())
            }
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit_exceeded",
                "Too many requests, please try again later",
            ),
            AppError::Internal(detail) => {
                error!(%detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });

        match &self {
            AppError::SessionRejected(_, policy) | AppError::AccountInactive(_, policy) => {
                (status, policy.clear_all(CookieJar::new()), body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidToken | AuthError::MalformedClaims => {
                AppError::Unauthorized("Invalid token".into())
            }
            AuthError::TokenExpired => AppError::Unauthorized("Token expired".into()),
            AuthError::RefreshTokenNotFound
            | AuthError::RefreshTokenExpired
            | AuthError::RefreshTokenRevoked => {
                AppError::Unauthorized("Invalid refresh token".into())
            }
            AuthError::Unauthorized(msg) => AppError::Unauthorized(msg),
            AuthError::CredentialError => AppError::Unauthorized("Invalid email or password".into()),
            AuthError::ValidationError(msg) => AppError::Validation(msg),
            AuthError::Conflict(msg) => AppError::Conflict(msg),
            AuthError::DbError(e) => AppError::from(e),
            AuthError::Config(e) => AppError::Internal(e.to_string()),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}
