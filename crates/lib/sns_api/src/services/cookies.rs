//! Cookie service: set/get/clear HttpOnly auth cookies.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sns_core::config::Deployment;
use sns_core::models::auth::TokenPair;
use time::Duration;

/// Cookie name for the access token.
pub const ACCESS_COOKIE: &str = "access_token";
/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Attributes shared by every auth cookie.
///
/// Production serves a cross-site frontend, which needs `SameSite=None`,
/// and browsers only accept that together with `Secure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    secure: bool,
    same_site: SameSite,
}

impl CookiePolicy {
    pub fn for_deployment(deployment: Deployment) -> Self {
        if deployment.is_production() {
            Self {
                secure: true,
                same_site: SameSite::None,
            }
        } else {
            Self {
                secure: false,
                same_site: SameSite::Lax,
            }
        }
    }

    fn build(&self, name: &'static str, value: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build((name, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site)
            .path("/")
            .max_age(max_age)
            .build()
    }

    /// HttpOnly cookie for the access token.
    pub fn access_cookie(&self, token: &str, max_age_secs: i64) -> Cookie<'static> {
        self.build(ACCESS_COOKIE, token.to_string(), Duration::seconds(max_age_secs))
    }

    /// HttpOnly cookie for the refresh token.
    pub fn refresh_cookie(&self, token: &str, max_age_secs: i64) -> Cookie<'static> {
        self.build(REFRESH_COOKIE, token.to_string(), Duration::seconds(max_age_secs))
    }

    /// Expired access cookie, clears auth state in the browser.
    pub fn clear_access_cookie(&self) -> Cookie<'static> {
        self.build(ACCESS_COOKIE, String::new(), Duration::ZERO)
    }

    /// Expired refresh cookie.
    pub fn clear_refresh_cookie(&self) -> Cookie<'static> {
        self.build(REFRESH_COOKIE, String::new(), Duration::ZERO)
    }

    /// Add both cookies for a freshly issued pair.
    pub fn set_pair(&self, jar: CookieJar, pair: &TokenPair) -> CookieJar {
        jar.add(self.access_cookie(&pair.access_token, pair.access_expires_in))
            .add(self.refresh_cookie(&pair.refresh_token, pair.refresh_expires_in))
    }

    /// Add expired versions of both cookies.
    pub fn clear_all(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.clear_access_cookie())
            .add(self.clear_refresh_cookie())
    }
}

/// Non-empty value of cookie `name` from request headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
