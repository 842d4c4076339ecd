//! Rate-limit thresholds.
//!
//! | Variable | Production | Otherwise |
//! |---|---|---|
//! | `RATE_LIMIT_AUTH` | 5 | 1000 |
//! | `RATE_LIMIT_GENERAL` | 60 | 1000 |
//! | `TRUST_PROXY_HEADERS` | false | false |

use std::time::Duration;

use super::{DEFAULT_WINDOW, EndpointClass};
use crate::config::{ConfigError, Deployment, flag_env, parse_env};

const PRODUCTION_AUTH_LIMIT: u32 = 5;
const PRODUCTION_GENERAL_LIMIT: u32 = 60;
const RELAXED_LIMIT: u32 = 1000;

/// Per-class request limits for one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub auth_limit: u32,
    pub general_limit: u32,
    pub window: Duration,
    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`.
    pub trust_proxy_headers: bool,
}

impl RateLimitConfig {
    /// Defaults for `deployment`, before any overrides.
    pub fn defaults_for(deployment: Deployment) -> Self {
        let (auth_limit, general_limit) = if deployment.is_production() {
            (PRODUCTION_AUTH_LIMIT, PRODUCTION_GENERAL_LIMIT)
        } else {
            (RELAXED_LIMIT, RELAXED_LIMIT)
        };
        Self {
            auth_limit,
            general_limit,
            window: DEFAULT_WINDOW,
            trust_proxy_headers: false,
        }
    }

    pub fn from_env(deployment: Deployment) -> Result<Self, ConfigError> {
        let defaults = Self::defaults_for(deployment);
        Ok(Self {
            auth_limit: parse_env("RATE_LIMIT_AUTH")?.unwrap_or(defaults.auth_limit),
            general_limit: parse_env("RATE_LIMIT_GENERAL")?.unwrap_or(defaults.general_limit),
            window: defaults.window,
            trust_proxy_headers: flag_env("TRUST_PROXY_HEADERS"),
        })
    }

    pub fn limit_for(&self, class: EndpointClass) -> u32 {
        match class {
            EndpointClass::Auth => self.auth_limit,
            EndpointClass::General => self.general_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_is_strict() {
        let cfg = RateLimitConfig::defaults_for(Deployment::Production);
        assert_eq!(cfg.limit_for(EndpointClass::Auth), 5);
        assert_eq!(cfg.limit_for(EndpointClass::General), 60);
        assert_eq!(cfg.window, Duration::from_secs(60));
    }

    #[test]
    fn other_modes_are_relaxed() {
        for deployment in [Deployment::Development, Deployment::Test] {
            let cfg = RateLimitConfig::defaults_for(deployment);
            assert_eq!(cfg.auth_limit, 1000);
            assert_eq!(cfg.general_limit, 1000);
            assert!(!cfg.trust_proxy_headers);
        }
    }
}
