use axum::extract::{Json, State};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{ApiResponse, ApiResult, Context};
use crate::daemon::AppState;
use crate::store::StoreStatus;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexResponse {
    pub name: String,
    pub version: String,
    pub endpoints: Vec<String>,
}

pub const ENDPOINTS: &[&str] = &[
    "GET /health",
    "GET /api/test-db",
    "GET /api/members",
    "POST /api/members",
    "GET /api/members/full",
    "GET /api/members/:id",
    "PUT /api/members/:id",
    "DELETE /api/members/:id",
    "GET /api/members/:id/dashboard",
    "GET /api/members/:id/health-metrics",
    "GET /api/members/:id/episodes",
    "GET /api/health-metrics",
    "POST /api/health-metrics",
    "DELETE /api/health-metrics/:id",
    "GET /api/conversations",
    "POST /api/conversations",
    "GET /api/conversations/:id",
    "PUT /api/conversations/:id",
    "POST /api/conversations/:id/messages",
    "GET /api/episodes",
    "POST /api/episodes",
    "PUT /api/episodes/:id",
    "GET /api/team-members",
    "POST /api/team-members",
    "GET /api/analytics/overview",
];

pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        name: "care-chronicle".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: ENDPOINTS.iter().map(|e| e.to_string()).collect(),
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: OffsetDateTime::now_utc(),
    })
}

pub async fn test_db(State(state): State<AppState>) -> ApiResult<StoreStatus> {
    let status = state
        .store
        .status()
        .await
        .context("Database connection failed")?;
    Ok(Json(
        ApiResponse::ok(status).with_message("Database connection successful"),
    ))
}
