//! API server configuration.

use std::time::Duration;

use sns_core::auth::SessionConfig;
use sns_core::config::{ConfigError, Deployment, env_var, parse_env};
use sns_core::ratelimit::RateLimitConfig;

use crate::services::cookies::CookiePolicy;

const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
const DEFAULT_TOKEN_CLEANUP_INTERVAL_SECS: u64 = 60 * 60;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub deployment: Deployment,
    /// Signing secret and token lifetimes.
    pub session: SessionConfig,
    pub rate_limit: RateLimitConfig,
    /// Allowed CORS origin.
    pub frontend_url: String,
    /// Period of the expired refresh token sweep.
    pub token_cleanup_interval: Duration,
}

impl ApiConfig {
    /// Defaults for `deployment` around an already validated session config.
    pub fn new(deployment: Deployment, session: SessionConfig) -> Self {
        Self {
            deployment,
            session,
            rate_limit: RateLimitConfig::defaults_for(deployment),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            token_cleanup_interval: Duration::from_secs(DEFAULT_TOKEN_CLEANUP_INTERVAL_SECS),
        }
    }

    /// Reads configuration from environment variables.
    ///
    /// | Variable                      | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `APP_ENV`                     | `development`           |
    /// | `JWT_SECRET`                  | required                |
    /// | `ACCESS_TOKEN_TTL_SECS`       | `3600`                  |
    /// | `REFRESH_TOKEN_TTL_SECS`      | `604800`                |
    /// | `RATE_LIMIT_AUTH`             | `5` prod, else `1000`   |
    /// | `RATE_LIMIT_GENERAL`          | `60` prod, else `1000`  |
    /// | `TRUST_PROXY_HEADERS`         | `false`                 |
    /// | `FRONTEND_URL`                | `http://localhost:5173` |
    /// | `TOKEN_CLEANUP_INTERVAL_SECS` | `3600`                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        let deployment = Deployment::from_env()?;
        let cleanup_secs = parse_env::<u64>("TOKEN_CLEANUP_INTERVAL_SECS")?
            .unwrap_or(DEFAULT_TOKEN_CLEANUP_INTERVAL_SECS);
        if cleanup_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "TOKEN_CLEANUP_INTERVAL_SECS",
                value: cleanup_secs.to_string(),
            });
        }

        Ok(Self {
            deployment,
            session: SessionConfig::from_env(deployment)?,
            rate_limit: RateLimitConfig::from_env(deployment)?,
            frontend_url: frontend_url(
                env_var("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.into()),
            )?,
            token_cleanup_interval: Duration::from_secs(cleanup_secs),
        })
    }

    pub fn cookie_policy(&self) -> CookiePolicy {
        CookiePolicy::for_deployment(self.deployment)
    }
}

/// CORS is sent with credentials, which browsers refuse for a wildcard origin.
fn frontend_url(value: String) -> Result<String, ConfigError> {
    if value.trim() == "*" {
        return Err(ConfigError::Invalid {
            name: "FRONTEND_URL",
            value,
        });
    }
    Ok(value)
}
