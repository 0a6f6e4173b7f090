#![allow(dead_code)]

use std::sync::Arc;

use afya_api::auth::jwt::{generate_access_token, JwtConfig};
use afya_api::config::{RateLimitBackend, ServerConfig};
use afya_api::router::build_app_router;
use afya_api::state::{build_rate_limiter, AppState};
use afya_core::types::DbId;
use afya_gateway::{HttpDownstream, IntegrationGateway, PgGatewayStore};
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses the in-memory rate limiter so each test starts with empty windows.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 330,
        shutdown_timeout_secs: 5,
        rate_limit_backend: RateLimitBackend::Memory,
        reminder_dispatch_interval_secs: 60,
        jwt: JwtConfig {
            secret: "api-test-secret-that-is-long-enough".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Build the application state around `pool` with a fresh in-memory limiter.
pub fn test_state(pool: PgPool) -> AppState {
    let config = test_config();
    let limiter = build_rate_limiter(config.rate_limit_backend, &pool);
    let gateway = IntegrationGateway::new(
        Arc::new(PgGatewayStore::new(pool.clone())),
        limiter,
        Arc::new(HttpDownstream::new().expect("http client")),
    );
    AppState {
        pool,
        config: Arc::new(config),
        gateway,
    }
}

/// Build the full application router with the production middleware stack.
pub fn build_test_app(pool: PgPool) -> Router {
    build_app_router(test_state(pool), &test_config())
}

/// Mint an access token signed with the test secret.
pub fn token_for(user_id: DbId, role: &str) -> String {
    generate_access_token(user_id, role, &test_config().jwt).expect("token")
}

pub fn admin_token() -> String {
    token_for(1, "admin")
}

pub fn user_token() -> String {
    token_for(2, "chw_supervisor")
}

pub fn service_token() -> String {
    token_for(3, "service")
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

async fn send_json_auth(
    app: Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send_json_auth(app, Method::POST, uri, body, token).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send_json_auth(app, Method::PUT, uri, body, token).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}
