//! Per-route, per-caller fixed-window rate limiting.
//!
//! Each `(route, caller key)` pair owns a single window that starts at the
//! caller's first call and lasts [`RATE_LIMIT_WINDOW_SECS`]. Admission is a
//! single check-and-increment: a slot is reserved at admission time and can
//! be handed back with [`RateLimiter::release`] when the downstream call
//! never completed.
//!
//! [`decide`] holds the window arithmetic. [`InMemoryRateLimiter`] applies it
//! under a mutex; the Postgres limiter in `afya-db` expresses the same rules
//! as one conditional upsert.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Duration;

use crate::types::{DbId, Timestamp};

/// Length of a rate-limit window.
pub const RATE_LIMIT_WINDOW_SECS: i64 = 60;

// ---------------------------------------------------------------------------
// Caller key
// ---------------------------------------------------------------------------

/// Identity a quota is scoped to.
///
/// Authenticated callers are keyed on their user id alone; the source IP is
/// carried for auditing but only keys anonymous callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerKey {
    key: String,
    user_id: Option<DbId>,
    ip_address: Option<String>,
}

impl CallerKey {
    /// Build a key such as `u:42` or `ip:10.0.0.7`. Both parts absent gives
    /// `anonymous`.
    pub fn new(user_id: Option<DbId>, ip_address: Option<&str>) -> Self {
        let ip_address = ip_address
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string);

        let key = match (user_id, ip_address.as_deref()) {
            (Some(u), _) => format!("u:{u}"),
            (None, Some(ip)) => format!("ip:{ip}"),
            (None, None) => "anonymous".to_string(),
        };

        Self {
            key,
            user_id,
            ip_address,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn user_id(&self) -> Option<DbId> {
        self.user_id
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }
}

impl std::fmt::Display for CallerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}

// ---------------------------------------------------------------------------
// Window arithmetic
// ---------------------------------------------------------------------------

/// Counter state of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub window_start: Timestamp,
    pub window_end: Timestamp,
    pub count: i64,
}

impl WindowState {
    /// A new window opened at `now` holding one call.
    pub fn open(now: Timestamp) -> Self {
        Self {
            window_start: now,
            window_end: now + Duration::seconds(RATE_LIMIT_WINDOW_SECS),
            count: 1,
        }
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.window_end
    }

    /// Whole seconds until the window closes, never less than one.
    pub fn retry_after_secs(&self, now: Timestamp) -> i64 {
        let millis = (self.window_end - now).num_milliseconds();
        ((millis + 999) / 1000).max(1)
    }
}

/// Outcome of applying one call attempt to a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowDecision {
    /// No usable window existed; a fresh one was opened with count 1.
    Opened(WindowState),
    /// The current window had room; its count was incremented.
    Incremented(WindowState),
    /// The current window is full.
    Denied { retry_after_secs: i64 },
}

/// Apply one call attempt to the current window of a key.
///
/// A stale window is never incremented: it is replaced by a fresh one.
pub fn decide(current: Option<&WindowState>, quota: i64, now: Timestamp) -> WindowDecision {
    match current {
        Some(w) if !w.is_expired(now) => {
            if w.count < quota {
                WindowDecision::Incremented(WindowState {
                    count: w.count + 1,
                    ..*w
                })
            } else {
                WindowDecision::Denied {
                    retry_after_secs: w.retry_after_secs(now),
                }
            }
        }
        _ if quota < 1 => WindowDecision::Denied {
            retry_after_secs: RATE_LIMIT_WINDOW_SECS,
        },
        _ => WindowDecision::Opened(WindowState::open(now)),
    }
}

// ---------------------------------------------------------------------------
// Limiter contract
// ---------------------------------------------------------------------------

/// A slot held in a specific window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub route_id: DbId,
    pub caller_key: String,
    pub window_start: Timestamp,
}

/// Result of an admission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Granted(Reservation),
    Denied { retry_after_secs: i64 },
}

/// Failure of the limiter's backing store.
#[derive(Debug, thiserror::Error)]
#[error("Rate limiter storage error: {0}")]
pub struct LimiterError(#[source] pub Box<dyn std::error::Error + Send + Sync>);

/// Admission control shared by every concurrent execution.
///
/// Implementations must make `try_acquire` linearizable per
/// `(route_id, caller)`: no more than `quota` grants per window, no matter
/// how many callers race.
#[async_trait::async_trait]
pub trait RateLimiter: Send + Sync {
    /// Reserve one slot in the caller's current window.
    async fn try_acquire(
        &self,
        route_id: DbId,
        caller: &CallerKey,
        quota: i64,
        now: Timestamp,
    ) -> Result<Admission, LimiterError>;

    /// Hand a slot back. No-op when the reservation's window has rolled over.
    async fn release(&self, reservation: &Reservation) -> Result<(), LimiterError>;

    /// Drop windows that closed before `now`. Returns how many were removed.
    async fn purge_expired(&self, now: Timestamp) -> Result<u64, LimiterError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// Process-local limiter. Suitable for a single API instance and for tests.
///
/// The mutex is only held for the decision itself, never across an `.await`.
#[derive(Debug, Default)]
pub struct InMemoryRateLimiter {
    windows: Mutex<HashMap<(DbId, String), WindowState>>,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of a key's window, if any.
    pub fn window(&self, route_id: DbId, caller: &CallerKey) -> Option<WindowState> {
        let windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        windows.get(&(route_id, caller.as_str().to_string())).copied()
    }
}

#[async_trait::async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn try_acquire(
        &self,
        route_id: DbId,
        caller: &CallerKey,
        quota: i64,
        now: Timestamp,
    ) -> Result<Admission, LimiterError> {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let key = (route_id, caller.as_str().to_string());

        match decide(windows.get(&key), quota, now) {
            WindowDecision::Opened(state) | WindowDecision::Incremented(state) => {
                windows.insert(key, state);
                Ok(Admission::Granted(Reservation {
                    route_id,
                    caller_key: caller.as_str().to_string(),
                    window_start: state.window_start,
                }))
            }
            WindowDecision::Denied { retry_after_secs } => {
                Ok(Admission::Denied { retry_after_secs })
            }
        }
    }

    async fn release(&self, reservation: &Reservation) -> Result<(), LimiterError> {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let key = (reservation.route_id, reservation.caller_key.clone());
        if let Some(state) = windows.get_mut(&key) {
            if state.window_start == reservation.window_start && state.count > 0 {
                state.count -= 1;
            }
        }
        Ok(())
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<u64, LimiterError> {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let before = windows.len();
        windows.retain(|_, w| !w.is_expired(now));
        Ok((before - windows.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
