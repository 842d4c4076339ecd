//! Authentication middleware: access token extraction, JWT verification
//! and account status check.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum::http::header::AUTHORIZATION;
use sns_core::auth::UserDirectory;
use sns_core::models::auth::{UserId, UserRole};
use tracing::debug;

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies::{ACCESS_COOKIE, read_cookie};

/// Stored in request extensions for authenticated routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub role: UserRole,
}

/// `Authorization: Bearer <token>` first, then the access cookie.
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    bearer.or_else(|| read_cookie(headers, ACCESS_COOKIE))
}

/// Axum middleware: verifies the access token, confirms the account still
/// exists and is approved, and injects [`AuthenticatedUser`].
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_access_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("Missing access token".into()))?;

    let user_id = state.sessions.verify_access(&token)?;

    let account = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    if !account.is_active() {
        debug!(user_id, status = %account.status, "inactive account rejected");
        return Err(AppError::AccountInactive(
            format!("Account is {}", account.status),
            state.config.cookie_policy(),
        ));
    }

    request.extensions_mut().insert(AuthenticatedUser {
        user_id: account.id,
        role: account.role,
    });

    Ok(next.run(request).await)
}
