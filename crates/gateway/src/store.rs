//! Persistence the executor depends on.

use afya_core::types::DbId;
use afya_db::models::integration::Integration;
use afya_db::models::integration_log::{CompleteIntegrationLog, CreateIntegrationLog};
use afya_db::models::integration_route::IntegrationRoute;
use afya_db::repositories::{
    IntegrationLogRepo, IntegrationRepo, IntegrationRouteRepo, RateLimitRepo,
};
use sqlx::PgPool;
use uuid::Uuid;

/// Route/integration lookup plus audit and violation writes.
///
/// Reads always go to storage; configuration is never cached between calls.
#[async_trait::async_trait]
pub trait GatewayStore: Send + Sync {
    async fn find_route(&self, id: DbId) -> Result<Option<IntegrationRoute>, sqlx::Error>;

    async fn find_integration(&self, id: DbId) -> Result<Option<Integration>, sqlx::Error>;

    async fn append_log(&self, entry: &CreateIntegrationLog) -> Result<(), sqlx::Error>;

    async fn complete_log(
        &self,
        request_id: Uuid,
        outcome: &CompleteIntegrationLog,
    ) -> Result<(), sqlx::Error>;

    async fn record_violation(&self, route_id: DbId, caller_key: &str) -> Result<(), sqlx::Error>;
}

/// [`GatewayStore`] backed by the Postgres repositories.
#[derive(Debug, Clone)]
pub struct PgGatewayStore {
    pool: PgPool,
}

impl PgGatewayStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl GatewayStore for PgGatewayStore {
    async fn find_route(&self, id: DbId) -> Result<Option<IntegrationRoute>, sqlx::Error> {
        IntegrationRouteRepo::find_by_id(&self.pool, id).await
    }

    async fn find_integration(&self, id: DbId) -> Result<Option<Integration>, sqlx::Error> {
        IntegrationRepo::find_by_id(&self.pool, id).await
    }

    async fn append_log(&self, entry: &CreateIntegrationLog) -> Result<(), sqlx::Error> {
        IntegrationLogRepo::append(&self.pool, entry).await?;
        Ok(())
    }

    async fn complete_log(
        &self,
        request_id: Uuid,
        outcome: &CompleteIntegrationLog,
    ) -> Result<(), sqlx::Error> {
        match IntegrationLogRepo::complete(&self.pool, request_id, outcome).await? {
            Some(_) => Ok(()),
            None => Err(sqlx::Error::RowNotFound),
        }
    }

    async fn record_violation(&self, route_id: DbId, caller_key: &str) -> Result<(), sqlx::Error> {
        RateLimitRepo::record_violation(&self.pool, route_id, caller_key).await
    }
}
