//! Execution of a single outbound call through a configured route.
//!
//! Order of operations:
//!
//! 1. load the route and its integration; both must be active
//! 2. reserve a rate-limit slot (routes without a quota skip this)
//! 3. append the audit entry
//! 4. call the downstream system under the route's timeout
//! 5. complete the audit entry; a transport failure refunds the slot
//!
//! Denied or unavailable calls never reach step 3, so every audit entry
//! corresponds to exactly one admitted execution.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use afya_core::error::CoreError;
use afya_core::integrations::{
    join_url, merge_headers, validate_headers, AuthType, HttpMethod, IntegrationStatus,
};
use afya_core::rate_limit::{Admission, CallerKey, RateLimiter, Reservation};
use afya_core::types::DbId;
use afya_db::models::integration::Integration;
use afya_db::models::integration_log::{CompleteIntegrationLog, CreateIntegrationLog};
use afya_db::models::integration_route::IntegrationRoute;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::auth::auth_headers;
use crate::downstream::{Downstream, DownstreamRequest, DownstreamResponse};
use crate::error::GatewayError;
use crate::store::GatewayStore;

// ---------------------------------------------------------------------------
// Request / result
// ---------------------------------------------------------------------------

/// Body of `POST /integrations/routes/{id}/execute`.
///
/// `method` and `path` default to the route's own.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecuteRequest {
    pub method: Option<String>,
    pub path: Option<String>,
    pub headers: Option<serde_json::Value>,
    pub body: Option<serde_json::Value>,
}

/// Normalized downstream response returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub request_id: Uuid,
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Option<serde_json::Value>,
    pub duration_ms: i64,
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Executes integration calls. Cheap to clone; share one per process.
#[derive(Clone)]
pub struct IntegrationGateway {
    store: Arc<dyn GatewayStore>,
    limiter: Arc<dyn RateLimiter>,
    downstream: Arc<dyn Downstream>,
}

/// Everything resolved before the call is attempted.
struct Prepared {
    route: IntegrationRoute,
    integration: Integration,
    auth_type: AuthType,
    method: HttpMethod,
    path: String,
    caller_headers: serde_json::Value,
}

impl IntegrationGateway {
    pub fn new(
        store: Arc<dyn GatewayStore>,
        limiter: Arc<dyn RateLimiter>,
        downstream: Arc<dyn Downstream>,
    ) -> Self {
        Self {
            store,
            limiter,
            downstream,
        }
    }

    pub fn rate_limiter(&self) -> &Arc<dyn RateLimiter> {
        &self.limiter
    }

    /// Execute one call through `route_id` on behalf of `caller`.
    ///
    /// Once a slot is reserved the rest of the call runs on its own task, so
    /// a dropped request future still completes the audit entry and refunds
    /// the slot on failure.
    pub async fn execute(
        &self,
        route_id: DbId,
        request: ExecuteRequest,
        caller: &CallerKey,
    ) -> Result<ExecutionResult, GatewayError> {
        let prepared = self.prepare(route_id, &request).await?;
        let reservation = self.admit(&prepared.route, caller).await?;

        let gateway = self.clone();
        let caller = caller.clone();
        tokio::spawn(async move {
            gateway
                .run_admitted(prepared, request.body, &caller, reservation)
                .await
        })
        .await?
    }

    /// Steps 3 to 5 for a call that has been admitted.
    async fn run_admitted(
        &self,
        prepared: Prepared,
        body: Option<serde_json::Value>,
        caller: &CallerKey,
        reservation: Option<Reservation>,
    ) -> Result<ExecutionResult, GatewayError> {
        let route_id = prepared.route.id;
        let request_id = Uuid::new_v4();
        let logged_headers = merge_headers([&prepared.integration.headers, &prepared.caller_headers]);
        let entry = CreateIntegrationLog {
            request_id,
            integration_id: prepared.integration.id,
            route_id,
            user_id: caller.user_id(),
            ip_address: caller.ip_address().map(str::to_string),
            method: prepared.method.as_str().to_string(),
            path: prepared.path.clone(),
            request_headers: headers_to_json(&logged_headers),
            request_body: body.clone(),
        };

        if let Err(e) = self.store.append_log(&entry).await {
            self.refund(reservation.as_ref()).await;
            return Err(e.into());
        }

        let credentials = auth_headers(prepared.auth_type, &prepared.integration.auth_config);
        let outbound = DownstreamRequest {
            method: prepared.method,
            url: join_url(&prepared.integration.base_url, &prepared.path),
            headers: merge_headers([
                &prepared.integration.headers,
                &credentials,
                &prepared.caller_headers,
            ]),
            body,
            timeout: Duration::from_secs(prepared.route.timeout_secs.max(1) as u64),
        };

        let started = Instant::now();
        let result = self.downstream.send(outbound).await;
        let duration_ms = started.elapsed().as_millis() as i64;

        match result {
            Ok(response) => {
                self.complete(request_id, success_outcome(&response, duration_ms))
                    .await;
                tracing::info!(
                    %request_id,
                    route_id,
                    integration_id = prepared.integration.id,
                    status = response.status,
                    duration_ms,
                    "Integration call completed"
                );
                Ok(ExecutionResult {
                    request_id,
                    status_code: response.status,
                    headers: response.headers,
                    body: response.body,
                    duration_ms,
                })
            }
            Err(err) => {
                let message = err.to_string();
                self.complete(
                    request_id,
                    CompleteIntegrationLog {
                        duration_ms,
                        error: Some(message.clone()),
                        ..Default::default()
                    },
                )
                .await;
                self.refund(reservation.as_ref()).await;
                tracing::warn!(
                    %request_id,
                    route_id,
                    integration_id = prepared.integration.id,
                    duration_ms,
                    error = %message,
                    "Integration call failed"
                );
                Err(CoreError::Downstream(message).into())
            }
        }
    }

    /// Resolve and validate everything needed before admission.
    async fn prepare(
        &self,
        route_id: DbId,
        request: &ExecuteRequest,
    ) -> Result<Prepared, GatewayError> {
        let route = self
            .store
            .find_route(route_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "IntegrationRoute",
                id: route_id,
            })?;
        if !route.is_active {
            return Err(CoreError::Unavailable(format!("Route {route_id} is not active")).into());
        }

        let integration = self
            .store
            .find_integration(route.integration_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Integration",
                id: route.integration_id,
            })?;
        if integration.status != IntegrationStatus::Active.as_str() {
            return Err(CoreError::Unavailable(format!(
                "Integration {} is {}",
                integration.id, integration.status
            ))
            .into());
        }

        let auth_type = AuthType::from_str(&integration.auth_type)?;
        let method = HttpMethod::from_str(request.method.as_deref().unwrap_or(&route.method))?;
        let path = request.path.clone().unwrap_or_else(|| route.path.clone());
        let caller_headers = match request.headers {
            Some(ref headers) => {
                validate_headers(headers)?;
                headers.clone()
            }
            None => serde_json::Value::Object(Default::default()),
        };

        Ok(Prepared {
            route,
            integration,
            auth_type,
            method,
            path,
            caller_headers,
        })
    }

    /// Reserve a slot on quota-limited routes.
    async fn admit(
        &self,
        route: &IntegrationRoute,
        caller: &CallerKey,
    ) -> Result<Option<Reservation>, GatewayError> {
        let Some(quota) = route.rate_limit_per_minute else {
            return Ok(None);
        };

        match self
            .limiter
            .try_acquire(route.id, caller, i64::from(quota), Utc::now())
            .await?
        {
            Admission::Granted(reservation) => Ok(Some(reservation)),
            Admission::Denied { retry_after_secs } => {
                if let Err(e) = self.store.record_violation(route.id, caller.as_str()).await {
                    tracing::error!(
                        route_id = route.id,
                        error = %e,
                        "Failed to record rate-limit violation"
                    );
                }
                tracing::info!(
                    route_id = route.id,
                    caller = %caller,
                    retry_after_secs,
                    "Integration call rate limited"
                );
                Err(CoreError::RateLimited { retry_after_secs }.into())
            }
        }
    }

    /// Complete the audit entry. Failures are logged, never returned.
    async fn complete(&self, request_id: Uuid, outcome: CompleteIntegrationLog) {
        if let Err(e) = self.store.complete_log(request_id, &outcome).await {
            tracing::error!(%request_id, error = %e, "Failed to complete integration log");
        }
    }

    async fn refund(&self, reservation: Option<&Reservation>) {
        let Some(reservation) = reservation else {
            return;
        };
        if let Err(e) = self.limiter.release(reservation).await {
            tracing::error!(
                route_id = reservation.route_id,
                error = %e,
                "Failed to release rate-limit reservation"
            );
        }
    }
}

fn headers_to_json(headers: &BTreeMap<String, String>) -> serde_json::Value {
    serde_json::Value::Object(
        headers
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect(),
    )
}

fn success_outcome(response: &DownstreamResponse, duration_ms: i64) -> CompleteIntegrationLog {
    CompleteIntegrationLog {
        status_code: Some(i32::from(response.status)),
        response_headers: Some(headers_to_json(&response.headers)),
        response_body: response.body.clone(),
        duration_ms,
        error: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
