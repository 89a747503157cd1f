use axum::extract::{Json, State};
use time::OffsetDateTime;

use super::{ApiResponse, ApiResult, Context};
use crate::daemon::AppState;
use crate::insights::{analytics_overview, AnalyticsOverview};

pub async fn overview(State(state): State<AppState>) -> ApiResult<AnalyticsOverview> {
    let snapshot = state
        .store
        .overview_snapshot()
        .await
        .context("Failed to fetch analytics")?;
    let overview = analytics_overview(
        &snapshot.members,
        &snapshot.health_metrics,
        &snapshot.episodes,
        &snapshot.conversations,
        OffsetDateTime::now_utc(),
    );
    Ok(Json(ApiResponse::ok(overview)))
}
