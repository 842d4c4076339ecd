//! Per-client request admission.
//!
//! A fixed one-minute tumbling window per client address. The whole map sits
//! behind a single lock; every [`RateLimiter::check`] is one read-modify-write
//! under it. A client can therefore get up to `2 × limit` requests through
//! across a window boundary.

pub mod config;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub use config::RateLimitConfig;

/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Path prefixes that get the strict auth limit.
const AUTH_PATH_PREFIXES: &[&str] = &[
    "/api/v1/auth/register",
    "/api/v1/auth/login",
    "/api/v1/auth/password-reset",
];

/// Which limit a request is counted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    /// Credential endpoints (registration, login, password reset).
    Auth,
    General,
}

impl EndpointClass {
    pub fn classify(path: &str) -> Self {
        if AUTH_PATH_PREFIXES.iter().any(|p| path.starts_with(p)) {
            Self::Auth
        } else {
            Self::General
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::General => "general",
        }
    }
}

/// Quota consumed by one client in the current window.
#[derive(Debug, Clone, Copy)]
pub struct ClientLimitInfo {
    pub count: u32,
    pub window_reset_at: Instant,
}

#[derive(Debug)]
struct LimiterState {
    clients: HashMap<String, ClientLimitInfo>,
    last_sweep: Instant,
}

/// In-memory fixed-window rate limiter, shared through `Arc`.
#[derive(Debug)]
pub struct RateLimiter {
    state: RwLock<LimiterState>,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            state: RwLock::new(LimiterState {
                clients: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count one request from `client` against `limit`.
    ///
    /// Returns `(allowed, remaining)`. The `limit`-th request in a window is
    /// allowed with `remaining == 0`; the next one is rejected and not
    /// counted. A limit of zero rejects everything.
    pub fn check(&self, client: &str, limit: u32) -> (bool, u32) {
        self.check_at(client, limit, Instant::now())
    }

    /// Like [`check`](Self::check) against an explicit clock.
    pub fn check_at(&self, client: &str, limit: u32, now: Instant) -> (bool, u32) {
        if limit == 0 {
            return (false, 0);
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let info = match state.clients.get_mut(client) {
            Some(info) if now < info.window_reset_at => info,
            _ => {
                state.clients.insert(
                    client.to_string(),
                    ClientLimitInfo {
                        count: 1,
                        window_reset_at: now + self.window,
                    },
                );
                return (true, limit - 1);
            }
        };

        if info.count >= limit {
            return (false, 0);
        }
        info.count += 1;
        let remaining = limit.saturating_sub(info.count);

        if now.duration_since(state.last_sweep) >= self.window {
            Self::sweep_locked(&mut state, now);
        }
        (true, remaining)
    }

    /// Current entry for `client`, if any.
    pub fn client_info(&self, client: &str) -> Option<ClientLimitInfo> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.clients.get(client).copied()
    }

    /// Number of tracked clients, including stale ones not yet swept.
    pub fn tracked_clients(&self) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.clients.len()
    }

    /// Drop entries whose window has ended. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        Self::sweep_locked(&mut state, now)
    }

    /// Forget every client. Test isolation only.
    pub fn reset(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.clients.clear();
        state.last_sweep = Instant::now();
    }

    fn sweep_locked(state: &mut LimiterState, now: Instant) -> usize {
        let before = state.clients.len();
        state.clients.retain(|_, info| now < info.window_reset_at);
        state.last_sweep = now;
        before - state.clients.len()
    }

    /// Spawn a periodic sweep that runs until `shutdown` is cancelled.
    pub fn spawn_cleanup_task(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(limiter.window);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        let removed = limiter.sweep();
                        if removed > 0 {
                            debug!(removed, "stale rate-limit entries swept");
                        }
                    }
                }
            }
        })
    }
}
