//! `PgRateLimiter` behaviour against a real Postgres instance.

use std::sync::Arc;

use afya_core::rate_limit::{Admission, CallerKey, RateLimiter};
use afya_db::models::integration::CreateIntegration;
use afya_db::models::integration_route::CreateIntegrationRoute;
use afya_db::repositories::{IntegrationRepo, IntegrationRouteRepo, PgRateLimiter, RateLimitRepo};
use assert_matches::assert_matches;
use chrono::{Duration, DurationRound, Utc};
use sqlx::PgPool;

/// Create one integration with one route and return the route id.
async fn seed_route(pool: &PgPool) -> i64 {
    let integration = IntegrationRepo::create(
        pool,
        &CreateIntegration {
            name: "M-Pesa".to_string(),
            description: None,
            integration_type: "payment".to_string(),
            base_url: "https://payments.example.com".to_string(),
            auth_type: "oauth2".to_string(),
            auth_config: None,
            headers: None,
            created_by: None,
        },
    )
    .await
    .unwrap();

    IntegrationRouteRepo::create(
        pool,
        &CreateIntegrationRoute {
            integration_id: integration.id,
            name: Some("stk push".to_string()),
            path: "/stkpush".to_string(),
            method: "POST".to_string(),
            request_schema: None,
            response_schema: None,
            rate_limit_per_minute: Some(3),
            timeout_secs: None,
            is_active: None,
        },
    )
    .await
    .unwrap()
    .id
}

/// Postgres stores microseconds; truncate so reservations compare equal.
fn now() -> chrono::DateTime<Utc> {
    Utc::now()
        .duration_trunc(Duration::microseconds(1))
        .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
async fn test_quota_then_denial_then_new_window(pool: PgPool) {
    let route_id = seed_route(&pool).await;
    let limiter = PgRateLimiter::new(pool.clone());
    let caller = CallerKey::new(Some(1), Some("10.0.0.1"));
    let t0 = now();

    for _ in 0..2 {
        assert_matches!(
            limiter.try_acquire(route_id, &caller, 2, t0).await.unwrap(),
            Admission::Granted(_)
        );
    }
    assert_matches!(
        limiter
            .try_acquire(route_id, &caller, 2, t0 + Duration::seconds(20))
            .await
            .unwrap(),
        Admission::Denied { retry_after_secs: 40 }
    );

    let later = t0 + Duration::seconds(61);
    assert_matches!(
        limiter.try_acquire(route_id, &caller, 2, later).await.unwrap(),
        Admission::Granted(r) if r.window_start == later
    );

    let window = RateLimitRepo::find_window(&pool, route_id, caller.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(window.request_count, 1);
    assert_eq!(window.user_id, Some(1));
    assert_eq!(window.ip_address.as_deref(), Some("10.0.0.1"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_release_refunds_only_current_window(pool: PgPool) {
    let route_id = seed_route(&pool).await;
    let limiter = PgRateLimiter::new(pool.clone());
    let caller = CallerKey::new(None, Some("10.0.0.9"));
    let t0 = now();

    let Admission::Granted(first) = limiter.try_acquire(route_id, &caller, 1, t0).await.unwrap()
    else {
        panic!("first call should be granted");
    };
    limiter.release(&first).await.unwrap();
    assert_matches!(
        limiter.try_acquire(route_id, &caller, 1, t0).await.unwrap(),
        Admission::Granted(_)
    );

    limiter
        .try_acquire(route_id, &caller, 1, t0 + Duration::seconds(70))
        .await
        .unwrap();
    limiter.release(&first).await.unwrap();

    let window = RateLimitRepo::find_window(&pool, route_id, caller.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(window.request_count, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_admissions_never_exceed_quota(pool: PgPool) {
    let route_id = seed_route(&pool).await;
    let limiter = Arc::new(PgRateLimiter::new(pool.clone()));
    let caller = CallerKey::new(Some(5), None);
    let t0 = now();

    let attempts = (0..20).map(|_| {
        let limiter = Arc::clone(&limiter);
        let caller = caller.clone();
        async move { limiter.try_acquire(route_id, &caller, 5, t0).await }
    });
    let results = futures::future::join_all(attempts).await;

    let granted = results
        .into_iter()
        .filter(|r| matches!(r, Ok(Admission::Granted(_))))
        .count();
    assert_eq!(granted, 5);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_purge_and_violation_counting(pool: PgPool) {
    let route_id = seed_route(&pool).await;
    let limiter = PgRateLimiter::new(pool.clone());
    let t0 = now();

    limiter
        .try_acquire(route_id, &CallerKey::new(Some(1), None), 5, t0)
        .await
        .unwrap();
    limiter
        .try_acquire(
            route_id,
            &CallerKey::new(Some(2), None),
            5,
            t0 + Duration::seconds(30),
        )
        .await
        .unwrap();

    let removed = limiter
        .purge_expired(t0 + Duration::seconds(75))
        .await
        .unwrap();
    assert_eq!(removed, 1);

    RateLimitRepo::record_violation(&pool, route_id, "u:1")
        .await
        .unwrap();
    RateLimitRepo::record_violation(&pool, route_id, "u:2")
        .await
        .unwrap();
    assert_eq!(RateLimitRepo::count_violations(&pool, None).await.unwrap(), 2);
    assert_eq!(
        RateLimitRepo::count_violations(&pool, Some(Utc::now() + Duration::hours(1)))
            .await
            .unwrap(),
        0
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_old_violations_are_pruned(pool: PgPool) {
    let route_id = seed_route(&pool).await;
    RateLimitRepo::record_violation(&pool, route_id, "u:1")
        .await
        .unwrap();
    RateLimitRepo::record_violation(&pool, route_id, "u:2")
        .await
        .unwrap();
    sqlx::query(
        "UPDATE rate_limit_violations SET occurred_at = now() - interval '45 days'
         WHERE caller_key = 'u:1'",
    )
    .execute(&pool)
    .await
    .unwrap();

    let cutoff = Utc::now() - Duration::days(30);
    let removed = RateLimitRepo::delete_violations_older_than(&pool, cutoff)
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(RateLimitRepo::count_violations(&pool, None).await.unwrap(), 1);
}
