use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};

use super::{body, ApiResponse, ApiResult, Context};
use crate::daemon::AppState;
use crate::models::{HealthMetric, HealthMetricWithMember, NewHealthMetric};

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<HealthMetricWithMember>> {
    let metrics = state
        .store
        .list_health_metrics(state.limits.health_metrics)
        .await
        .context("Failed to fetch health metrics")?;
    Ok(Json(ApiResponse::list(metrics)))
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewHealthMetric>, JsonRejection>,
) -> ApiResult<HealthMetric> {
    const CONTEXT: &str = "Failed to create health metric";
    let input = body(payload, CONTEXT)?;
    let metric = state
        .store
        .create_health_metric(input)
        .await
        .context(CONTEXT)?;
    Ok(Json(
        ApiResponse::ok(metric).with_message("Health metric recorded successfully"),
    ))
}

pub async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state
        .store
        .delete_health_metric(&id)
        .await
        .context("Failed to delete health metric")?;
    Ok(Json(ApiResponse::done("Health metric deleted successfully")))
}
