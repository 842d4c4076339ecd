//! Rate-limit middleware.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sns_core::ratelimit::EndpointClass;
use tracing::warn;

use crate::AppState;
use crate::error::AppError;

pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";
const UNKNOWN_CLIENT: &str = "unknown";

/// Client address used as the limiter key.
///
/// Proxy headers are only honoured when `trust_proxy` is set; otherwise any
/// client could pick its own key.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let real_ip = || {
            headers
                .get(X_REAL_IP)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };
        if let Some(ip) = forwarded.or_else(real_ip) {
            return ip.to_string();
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Axum middleware: counts the request against its endpoint class and sets
/// `X-RateLimit-Remaining` on the response, allowed or not.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(
        request.headers(),
        peer,
        state.config.rate_limit.trust_proxy_headers,
    );
    let class = EndpointClass::classify(request.uri().path());
    let limit = state.config.rate_limit.limit_for(class);

    let (allowed, remaining) = state.limiter.check(&client, limit);

    let mut response = if allowed {
        next.run(request).await
    } else {
        warn!(%client, class = class.as_str(), "rate limit exceeded");
        AppError::RateLimited.into_response()
    };
    response
        .headers_mut()
        .insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
    response
}
