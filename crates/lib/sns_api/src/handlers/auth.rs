//! Authentication request handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use sns_core::auth::UserDirectory;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    LoginRequest, LoginResponse, MessageResponse, RefreshRequest, RegisterRequest,
    RevokeAllResponse, TokenResponse, UserResponse,
};
use crate::services::auth;
use crate::services::cookies::{REFRESH_COOKIE, read_cookie};

/// Refresh token from the cookie, else from an optional JSON body.
fn refresh_token_from(headers: &HeaderMap, body: &Bytes) -> Option<String> {
    read_cookie(headers, REFRESH_COOKIE).or_else(|| {
        serde_json::from_slice::<RefreshRequest>(body)
            .ok()
            .and_then(|b| b.refresh_token)
            .filter(|t| !t.is_empty())
    })
}

/// `POST /api/v1/auth/register`: create a pending account.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let account =
        auth::register(state.users.as_ref(), &body.email, &body.username, &body.password).await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

/// `POST /api/v1/auth/login`: authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let (account, pair) = auth::login(
        state.users.as_ref(),
        &state.sessions,
        &body.email,
        &body.password,
    )
    .await?;

    let jar = state.config.cookie_policy().set_pair(jar, &pair);
    Ok((
        jar,
        Json(LoginResponse {
            user: account.into(),
            tokens: TokenResponse::from(&pair),
        }),
    ))
}

/// `POST /api/v1/auth/refresh`: rotate the refresh token.
///
/// Any rejection also expires the auth cookies so the client stops
/// replaying them.
pub async fn refresh_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    body: Bytes,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let policy = state.config.cookie_policy();
    let token = refresh_token_from(&headers, &body)
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".into()))
        .map_err(|e| e.clearing_cookies(policy))?;

    let pair = state
        .sessions
        .refresh(&token)
        .await
        .map_err(|e| AppError::from(e).clearing_cookies(policy))?;

    Ok((policy.set_pair(jar, &pair), Json(TokenResponse::from(&pair))))
}

/// `POST /api/v1/auth/logout`: revoke the refresh token if present. Always
/// succeeds and always clears the cookies.
pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    body: Bytes,
) -> (CookieJar, Json<MessageResponse>) {
    if let Some(token) = refresh_token_from(&headers, &body) {
        state.sessions.logout(&token).await;
    }
    (
        state.config.cookie_policy().clear_all(jar),
        Json(MessageResponse::new("Logged out")),
    )
}

/// `POST /api/v1/auth/revoke-all`: log out every device of the caller.
pub async fn revoke_all_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<RevokeAllResponse>)> {
    let revoked = state.sessions.revoke_all_sessions(user.user_id).await?;
    Ok((
        state.config.cookie_policy().clear_all(jar),
        Json(RevokeAllResponse {
            message: "All sessions revoked".into(),
            revoked,
        }),
    ))
}

/// `GET /api/v1/auth/me`: the authenticated account.
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<UserResponse>> {
    let account = state
        .users
        .find_by_id(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(account.into()))
}
