//! Postgres-backed rate limiting.
//!
//! Each `(route_id, caller_key)` owns one row in `rate_limit_windows`.
//! Admission is a single conditional upsert, so concurrent callers are
//! serialized by the row lock and a full window is never over-admitted.

use afya_core::rate_limit::{
    Admission, CallerKey, LimiterError, RateLimiter, Reservation, RATE_LIMIT_WINDOW_SECS,
};
use afya_core::types::{DbId, Timestamp};
use chrono::Duration;
use sqlx::PgPool;

use crate::models::rate_limit::RateLimitWindow;

/// Column list for rate_limit_windows queries.
const COLUMNS: &str =
    "id, route_id, caller_key, user_id, ip_address, window_start, window_end, request_count";

/// Window and violation bookkeeping.
pub struct RateLimitRepo;

impl RateLimitRepo {
    /// Reserve one slot, opening a fresh window when the current one is
    /// absent or closed.
    ///
    /// Returns the updated window, or `None` when the current window is full.
    pub async fn try_increment(
        pool: &PgPool,
        route_id: DbId,
        caller: &CallerKey,
        quota: i64,
        now: Timestamp,
    ) -> Result<Option<RateLimitWindow>, sqlx::Error> {
        let window_end = now + Duration::seconds(RATE_LIMIT_WINDOW_SECS);
        let query = format!(
            "INSERT INTO rate_limit_windows AS w
                (route_id, caller_key, user_id, ip_address, window_start, window_end, request_count)
             VALUES ($1, $2, $3, $4, $5, $6, 1)
             ON CONFLICT (route_id, caller_key) DO UPDATE SET
                window_start  = CASE WHEN w.window_end <= EXCLUDED.window_start
                                     THEN EXCLUDED.window_start ELSE w.window_start END,
                window_end    = CASE WHEN w.window_end <= EXCLUDED.window_start
                                     THEN EXCLUDED.window_end ELSE w.window_end END,
                request_count = CASE WHEN w.window_end <= EXCLUDED.window_start
                                     THEN 1 ELSE w.request_count + 1 END,
                user_id       = EXCLUDED.user_id,
                ip_address    = EXCLUDED.ip_address
             WHERE w.window_end <= EXCLUDED.window_start OR w.request_count < $7
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RateLimitWindow>(&query)
            .bind(route_id)
            .bind(caller.as_str())
            .bind(caller.user_id())
            .bind(caller.ip_address())
            .bind(now)
            .bind(window_end)
            .bind(quota)
            .fetch_optional(pool)
            .await
    }

    /// Current window row of a key, if any.
    pub async fn find_window(
        pool: &PgPool,
        route_id: DbId,
        caller_key: &str,
    ) -> Result<Option<RateLimitWindow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM rate_limit_windows WHERE route_id = $1 AND caller_key = $2"
        );
        sqlx::query_as::<_, RateLimitWindow>(&query)
            .bind(route_id)
            .bind(caller_key)
            .fetch_optional(pool)
            .await
    }

    /// Give back one slot if the reservation's window is still current.
    pub async fn decrement(pool: &PgPool, reservation: &Reservation) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE rate_limit_windows SET request_count = request_count - 1
             WHERE route_id = $1 AND caller_key = $2 AND window_start = $3
               AND request_count > 0",
        )
        .bind(reservation.route_id)
        .bind(&reservation.caller_key)
        .bind(reservation.window_start)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete windows that closed at or before `now`.
    pub async fn delete_expired(pool: &PgPool, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM rate_limit_windows WHERE window_end <= $1")
            .bind(now)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Record a denied admission for statistics.
    pub async fn record_violation(
        pool: &PgPool,
        route_id: DbId,
        caller_key: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO rate_limit_violations (route_id, caller_key) VALUES ($1, $2)")
            .bind(route_id)
            .bind(caller_key)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Delete violation records older than `cutoff`. Returns rows removed.
    pub async fn delete_violations_older_than(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM rate_limit_violations WHERE occurred_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Number of denied admissions, optionally since a point in time.
    pub async fn count_violations(
        pool: &PgPool,
        since: Option<Timestamp>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM rate_limit_violations
             WHERE ($1::TIMESTAMPTZ IS NULL OR occurred_at >= $1)",
        )
        .bind(since)
        .fetch_one(pool)
        .await
    }
}

// ---------------------------------------------------------------------------
// RateLimiter implementation
// ---------------------------------------------------------------------------

/// [`RateLimiter`] shared across API instances through Postgres.
#[derive(Debug, Clone)]
pub struct PgRateLimiter {
    pool: PgPool,
}

impl PgRateLimiter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn storage(err: sqlx::Error) -> LimiterError {
    LimiterError(Box::new(err))
}

#[async_trait::async_trait]
impl RateLimiter for PgRateLimiter {
    async fn try_acquire(
        &self,
        route_id: DbId,
        caller: &CallerKey,
        quota: i64,
        now: Timestamp,
    ) -> Result<Admission, LimiterError> {
        if quota < 1 {
            return Ok(Admission::Denied {
                retry_after_secs: RATE_LIMIT_WINDOW_SECS,
            });
        }

        if let Some(window) = RateLimitRepo::try_increment(&self.pool, route_id, caller, quota, now)
            .await
            .map_err(storage)?
        {
            return Ok(Admission::Granted(Reservation {
                route_id,
                caller_key: window.caller_key,
                window_start: window.window_start,
            }));
        }

        // The upsert matched a full window. Read it back only to report how
        // long the caller has to wait; a concurrent rollover just yields 1s.
        let retry_after_secs = RateLimitRepo::find_window(&self.pool, route_id, caller.as_str())
            .await
            .map_err(storage)?
            .map(|w| w.state().retry_after_secs(now))
            .unwrap_or(1);

        Ok(Admission::Denied { retry_after_secs })
    }

    async fn release(&self, reservation: &Reservation) -> Result<(), LimiterError> {
        RateLimitRepo::decrement(&self.pool, reservation)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<u64, LimiterError> {
        RateLimitRepo::delete_expired(&self.pool, now)
            .await
            .map_err(storage)
    }
}
