//! # sns_api
//!
//! HTTP API library for the SNS backend session core.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use sns_core::auth::{RefreshTokenRepository, SessionService, UserDirectory};
use sns_core::ratelimit::RateLimiter;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ApiConfig;
use crate::handlers::{auth, health};
use crate::middleware::rate_limit::X_RATELIMIT_REMAINING;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Login, rotation and revocation.
    pub sessions: Arc<SessionService>,
    /// User lookups for login and the active-account check.
    pub users: Arc<dyn UserDirectory>,
    /// Per-client admission control.
    pub limiter: Arc<RateLimiter>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// Wire the session core over the given repositories.
    pub fn new(
        config: ApiConfig,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            sessions: Arc::new(SessionService::from_config(&config.session, refresh_tokens)),
            users,
            limiter: Arc::new(RateLimiter::with_window(config.rate_limit.window)),
            config,
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `sns_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sns_core::migrate::migrate(pool).await
}

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
        .expose_headers([X_RATELIMIT_REMAINING])
        .allow_credentials(true);

    match HeaderValue::from_str(&config.frontend_url) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            warn!(frontend_url = %config.frontend_url, "invalid FRONTEND_URL, CORS disabled");
            layer
        }
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::GET_HEALTH, get(health::health_handler))
        .route(routes::POST_AUTH_REGISTER, post(auth::register_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler))
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler));

    // Protected routes (require an approved account)
    let protected = Router::new()
        .route(routes::GET_AUTH_ME, get(auth::me_handler))
        .route(routes::POST_AUTH_REVOKE_ALL, post(auth::revoke_all_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit,
        ))
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
