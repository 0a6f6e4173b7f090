//! Aggregate statistics returned by `GET /integrations/stats`.

use std::collections::BTreeMap;

use serde::Serialize;

use super::integration_log::IntegrationLog;

/// Gateway-wide counters.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrationStats {
    pub total_integrations: i64,
    pub integrations_by_type: BTreeMap<String, i64>,
    pub integrations_by_status: BTreeMap<String, i64>,
    pub total_routes: i64,
    pub active_routes: i64,
    pub total_requests: i64,
    pub requests_by_status_class: BTreeMap<String, i64>,
    pub avg_duration_ms: Option<f64>,
    pub recent_logs: Vec<IntegrationLog>,
    pub rate_limit_violations: i64,
    pub transformation_count: i64,
}
