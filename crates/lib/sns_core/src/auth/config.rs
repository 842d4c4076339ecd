//! Session configuration: signing secret and token lifetimes.

use std::fmt;

use chrono::Duration;

use crate::config::{ConfigError, Deployment, env_var, parse_env};

/// Minimum secret length accepted in production.
pub const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// Default access token lifetime: 1 hour.
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 60 * 60;

/// Default refresh token lifetime: 7 days.
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Upper bound for either lifetime: 5 years.
pub const MAX_TOKEN_TTL_SECS: i64 = 5 * 365 * 24 * 60 * 60;

/// Symmetric JWT signing secret. Never printed.
#[derive(Clone)]
pub struct JwtSecret(Vec<u8>);

impl JwtSecret {
    /// Validate a raw secret against the deployment's policy.
    ///
    /// Empty secrets are always rejected; production additionally requires
    /// at least [`MIN_PRODUCTION_SECRET_LEN`] bytes.
    pub fn new(raw: impl Into<Vec<u8>>, deployment: Deployment) -> Result<Self, ConfigError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if deployment.is_production() && raw.len() < MIN_PRODUCTION_SECRET_LEN {
            return Err(ConfigError::TooShort {
                name: "JWT_SECRET",
                min: MIN_PRODUCTION_SECRET_LEN,
            });
        }
        Ok(Self(raw))
    }

    /// Read `JWT_SECRET`. There is no generated fallback.
    pub fn from_env(deployment: Deployment) -> Result<Self, ConfigError> {
        let raw = env_var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        Self::new(raw, deployment)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JwtSecret(<redacted>)")
    }
}

/// Configuration consumed by [`super::SessionService`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub jwt_secret: JwtSecret,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl SessionConfig {
    /// Config with default lifetimes.
    pub fn new(jwt_secret: JwtSecret) -> Self {
        Self {
            jwt_secret,
            access_token_ttl: Duration::seconds(DEFAULT_ACCESS_TOKEN_TTL_SECS),
            refresh_token_ttl: Duration::seconds(DEFAULT_REFRESH_TOKEN_TTL_SECS),
        }
    }

    /// Reads configuration from environment variables.
    ///
    /// | Variable                 | Default          |
    /// |--------------------------|------------------|
    /// | `JWT_SECRET`             | required         |
    /// | `ACCESS_TOKEN_TTL_SECS`  | `3600`           |
    /// | `REFRESH_TOKEN_TTL_SECS` | `604800`         |
    pub fn from_env(deployment: Deployment) -> Result<Self, ConfigError> {
        Ok(Self {
            jwt_secret: JwtSecret::from_env(deployment)?,
            access_token_ttl: ttl_from_env("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TOKEN_TTL_SECS)?,
            refresh_token_ttl: ttl_from_env(
                "REFRESH_TOKEN_TTL_SECS",
                DEFAULT_REFRESH_TOKEN_TTL_SECS,
            )?,
        })
    }
}

/// A lifetime in `1..=MAX_TOKEN_TTL_SECS` seconds.
fn ttl_from_env(name: &'static str, default: i64) -> Result<Duration, ConfigError> {
    let secs = parse_env::<i64>(name)?.unwrap_or(default);
    if !(1..=MAX_TOKEN_TTL_SECS).contains(&secs) {
        return Err(ConfigError::Invalid {
            name,
            value: secs.to_string(),
        });
    }
    Duration::try_seconds(secs).ok_or(ConfigError::Invalid {
        name,
        value: secs.to_string(),
    })
}
