//! Domain models shared across the core and the HTTP layer.

pub mod auth;
