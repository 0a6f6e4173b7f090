//! Handlers for the integration registry, route catalog, gateway execution,
//! audit log, and stored transformations.

use afya_core::error::CoreError;
use afya_core::integrations::{
    self, AuthType, HttpMethod, IntegrationStatus, IntegrationType, TransformationType,
};
use afya_core::rate_limit::CallerKey;
use afya_core::types::DbId;
use afya_db::models::integration::{
    CreateIntegration, Integration, IntegrationFilter, UpdateIntegration,
};
use afya_db::models::integration_log::IntegrationLogQuery;
use afya_db::models::integration_route::{
    CreateIntegrationRoute, IntegrationRoute, UpdateIntegrationRoute,
};
use afya_db::models::transformation::{CreateTransformation, UpdateTransformation};
use afya_db::repositories::{
    IntegrationLogRepo, IntegrationRepo, IntegrationRouteRepo, IntegrationStatsRepo,
    TransformationRepo,
};
use afya_gateway::ExecuteRequest;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::middleware::client_ip::ClientIp;
use crate::middleware::rbac::{RequireAdmin, RequireAuth};
use crate::query::ActiveFilterParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Verify that an integration exists, returning the full row.
async fn ensure_integration_exists(pool: &sqlx::PgPool, id: DbId) -> AppResult<Integration> {
    IntegrationRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Integration",
                id,
            })
        })
}

/// Verify that a route exists, returning the full row.
async fn ensure_route_exists(pool: &sqlx::PgPool, id: DbId) -> AppResult<IntegrationRoute> {
    IntegrationRouteRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "IntegrationRoute",
                id,
            })
        })
}

fn validate_auth_config(auth_config: &serde_json::Value) -> Result<(), CoreError> {
    if !auth_config.is_object() {
        return Err(CoreError::Validation(
            "auth_config must be a JSON object".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// POST /integrations
// ---------------------------------------------------------------------------

/// Register a new integration. It starts `pending` and cannot execute until
/// an admin activates it.
pub async fn create_integration(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<CreateIntegration>,
) -> AppResult<impl IntoResponse> {
    integrations::validate_name("name", &body.name)?;
    IntegrationType::from_str(&body.integration_type)?;
    AuthType::from_str(&body.auth_type)?;
    integrations::validate_base_url(&body.base_url)?;
    if let Some(ref cfg) = body.auth_config {
        validate_auth_config(cfg)?;
    }
    if let Some(ref headers) = body.headers {
        integrations::validate_headers(headers)?;
    }

    let input = CreateIntegration {
        created_by: Some(admin.user_id),
        ..body
    };

    let integration = IntegrationRepo::create(&state.pool, &input).await?;

    tracing::info!(
        integration_id = integration.id,
        integration_type = %integration.integration_type,
        user_id = admin.user_id,
        "Integration created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: integration })))
}

// ---------------------------------------------------------------------------
// GET /integrations
// ---------------------------------------------------------------------------

/// List integrations, optionally filtered by `integration_type` and `status`.
pub async fn list_integrations(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(filter): Query<IntegrationFilter>,
) -> AppResult<impl IntoResponse> {
    if let Some(ref it) = filter.integration_type {
        IntegrationType::from_str(it)?;
    }
    if let Some(ref st) = filter.status {
        IntegrationStatus::from_str(st)?;
    }

    let items = IntegrationRepo::list(&state.pool, &filter).await?;

    tracing::debug!(count = items.len(), "Listed integrations");

    Ok(Json(DataResponse { data: items }))
}

// ---------------------------------------------------------------------------
// GET /integrations/stats
// ---------------------------------------------------------------------------

/// Aggregate counts across the registry, the route catalog, and the audit log.
pub async fn get_integration_stats(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
) -> AppResult<impl IntoResponse> {
    let stats = IntegrationStatsRepo::collect(&state.pool).await?;
    Ok(Json(DataResponse { data: stats }))
}

// ---------------------------------------------------------------------------
// GET /integrations/{id}
// ---------------------------------------------------------------------------

pub async fn get_integration(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let integration = ensure_integration_exists(&state.pool, id).await?;
    Ok(Json(DataResponse { data: integration }))
}

// ---------------------------------------------------------------------------
// PUT /integrations/{id}
// ---------------------------------------------------------------------------

/// Partially update an integration. Status changes go through here too.
pub async fn update_integration(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateIntegration>,
) -> AppResult<impl IntoResponse> {
    let existing = ensure_integration_exists(&state.pool, id).await?;

    if let Some(ref name) = body.name {
        integrations::validate_name("name", name)?;
    }
    if let Some(ref it) = body.integration_type {
        IntegrationType::from_str(it)?;
    }
    if let Some(ref at) = body.auth_type {
        AuthType::from_str(at)?;
    }
    if let Some(ref url) = body.base_url {
        integrations::validate_base_url(url)?;
    }
    if let Some(ref cfg) = body.auth_config {
        validate_auth_config(cfg)?;
    }
    if let Some(ref headers) = body.headers {
        integrations::validate_headers(headers)?;
    }
    if let Some(ref status) = body.status {
        let next = IntegrationStatus::from_str(status)?;
        let current = IntegrationStatus::from_str(&existing.status)?;
        if !current.can_transition_to(next) {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Integration cannot move from '{current}' back to '{next}'"
            ))));
        }
    }

    let integration = IntegrationRepo::update(&state.pool, id, &body)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Integration",
            id,
        }))?;

    if integration.status != existing.status {
        tracing::info!(
            integration_id = id,
            from = %existing.status,
            to = %integration.status,
            user_id = admin.user_id,
            "Integration status changed"
        );
    } else {
        tracing::info!(integration_id = id, user_id = admin.user_id, "Integration updated");
    }

    Ok(Json(DataResponse { data: integration }))
}

// ---------------------------------------------------------------------------
// GET /integrations/{id}/routes
// ---------------------------------------------------------------------------

/// List the routes of one integration, optionally filtered by `is_active`.
pub async fn list_routes(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(integration_id): Path<DbId>,
    Query(params): Query<ActiveFilterParams>,
) -> AppResult<impl IntoResponse> {
    ensure_integration_exists(&state.pool, integration_id).await?;

    let routes =
        IntegrationRouteRepo::list_by_integration(&state.pool, integration_id, params.is_active)
            .await?;

    Ok(Json(DataResponse { data: routes }))
}

// ---------------------------------------------------------------------------
// POST /integrations/routes
// ---------------------------------------------------------------------------

/// Add a route to an existing integration.
pub async fn create_route(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<CreateIntegrationRoute>,
) -> AppResult<impl IntoResponse> {
    // A dangling integration_id is a bad request, not a missing resource.
    if IntegrationRepo::find_by_id(&state.pool, body.integration_id)
        .await?
        .is_none()
    {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Integration {} does not exist",
            body.integration_id
        ))));
    }

    integrations::validate_route_path(&body.path)?;
    let method = HttpMethod::from_str(&body.method)?;
    integrations::validate_rate_limit(body.rate_limit_per_minute)?;
    if let Some(timeout) = body.timeout_secs {
        integrations::validate_timeout(timeout)?;
    }

    let input = CreateIntegrationRoute {
        method: method.as_str().to_string(),
        ..body
    };

    let route = IntegrationRouteRepo::create(&state.pool, &input).await?;

    tracing::info!(
        route_id = route.id,
        integration_id = route.integration_id,
        method = %route.method,
        path = %route.path,
        user_id = admin.user_id,
        "Integration route created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: route })))
}

// ---------------------------------------------------------------------------
// GET /integrations/routes/{id}
// ---------------------------------------------------------------------------

pub async fn get_route(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let route = ensure_route_exists(&state.pool, id).await?;
    Ok(Json(DataResponse { data: route }))
}

// ---------------------------------------------------------------------------
// PUT /integrations/routes/{id}
// ---------------------------------------------------------------------------

pub async fn update_route(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateIntegrationRoute>,
) -> AppResult<impl IntoResponse> {
    ensure_route_exists(&state.pool, id).await?;

    if let Some(ref path) = body.path {
        integrations::validate_route_path(path)?;
    }
    let method = body
        .method
        .as_deref()
        .map(HttpMethod::from_str)
        .transpose()?;
    integrations::validate_rate_limit(body.rate_limit_per_minute)?;
    if let Some(timeout) = body.timeout_secs {
        integrations::validate_timeout(timeout)?;
    }

    let input = UpdateIntegrationRoute {
        method: method.map(|m| m.as_str().to_string()),
        ..body
    };

    let route = IntegrationRouteRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "IntegrationRoute",
            id,
        }))?;

    tracing::info!(route_id = id, user_id = admin.user_id, "Integration route updated");

    Ok(Json(DataResponse { data: route }))
}

// ---------------------------------------------------------------------------
// POST /integrations/routes/{id}/execute
// ---------------------------------------------------------------------------

/// Call the external system behind a route on behalf of the authenticated user.
pub async fn execute_route(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ClientIp(ip): ClientIp,
    Path(route_id): Path<DbId>,
    Json(body): Json<ExecuteRequest>,
) -> AppResult<impl IntoResponse> {
    let caller = CallerKey::new(Some(user.user_id), ip.as_deref());

    let result = state.gateway.execute(route_id, body, &caller).await?;

    tracing::info!(
        route_id,
        request_id = %result.request_id,
        status_code = result.status_code,
        duration_ms = result.duration_ms,
        user_id = user.user_id,
        "Integration route executed"
    );

    Ok(Json(DataResponse { data: result }))
}

// ---------------------------------------------------------------------------
// GET /integrations/routes/{id}/logs
// ---------------------------------------------------------------------------

/// Audit entries for a route, newest first.
pub async fn list_route_logs(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(route_id): Path<DbId>,
    Query(query): Query<IntegrationLogQuery>,
) -> AppResult<impl IntoResponse> {
    ensure_route_exists(&state.pool, route_id).await?;

    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        if start > end {
            return Err(AppError::Core(CoreError::Validation(
                "start_date must not be after end_date".into(),
            )));
        }
    }

    let logs = IntegrationLogRepo::list_for_route(&state.pool, route_id, &query).await?;

    tracing::debug!(route_id, count = logs.len(), "Listed integration logs");

    Ok(Json(DataResponse { data: logs }))
}

// ---------------------------------------------------------------------------
// Transformations
// ---------------------------------------------------------------------------

/// GET /integrations/routes/{id}/transformations
pub async fn list_transformations(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(route_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_route_exists(&state.pool, route_id).await?;
    let items = TransformationRepo::list_by_route(&state.pool, route_id).await?;
    Ok(Json(DataResponse { data: items }))
}

/// POST /integrations/routes/{id}/transformations
pub async fn create_transformation(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(route_id): Path<DbId>,
    Json(body): Json<CreateTransformation>,
) -> AppResult<impl IntoResponse> {
    ensure_route_exists(&state.pool, route_id).await?;

    integrations::validate_name("name", &body.name)?;
    TransformationType::from_str(&body.transformation_type)?;
    if body.script.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "script must not be empty".into(),
        )));
    }

    let transformation = TransformationRepo::create(&state.pool, route_id, &body).await?;

    tracing::info!(
        transformation_id = transformation.id,
        route_id,
        user_id = admin.user_id,
        "Transformation created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: transformation })))
}

/// PUT /integrations/transformations/{id}
pub async fn update_transformation(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateTransformation>,
) -> AppResult<impl IntoResponse> {
    if let Some(ref name) = body.name {
        integrations::validate_name("name", name)?;
    }
    if let Some(ref tt) = body.transformation_type {
        TransformationType::from_str(tt)?;
    }
    if body.script.as_deref().is_some_and(|s| s.trim().is_empty()) {
        return Err(AppError::Core(CoreError::Validation(
            "script must not be empty".into(),
        )));
    }

    let transformation = TransformationRepo::update(&state.pool, id, &body)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Transformation",
            id,
        }))?;

    tracing::info!(transformation_id = id, user_id = admin.user_id, "Transformation updated");

    Ok(Json(DataResponse {
        data: transformation,
    }))
}

/// DELETE /integrations/transformations/{id}
pub async fn delete_transformation(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let deleted = TransformationRepo::delete(&state.pool, id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Transformation",
            id,
        }));
    }

    tracing::info!(transformation_id = id, user_id = admin.user_id, "Transformation deleted");

    Ok(StatusCode::NO_CONTENT)
}
