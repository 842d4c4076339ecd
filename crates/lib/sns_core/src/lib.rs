//! # sns_core
//!
//! Session and credential lifecycle for the SNS backend: access-token
//! signing, rotating refresh tokens, and per-client rate limiting.

pub mod auth;
pub mod config;
pub mod migrate;
pub mod models;
pub mod ratelimit;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
