use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Path, Query, State};
use serde::Deserialize;
use time::OffsetDateTime;

use super::{body, query, to_summary, ApiResponse, ApiResult, Context};
use crate::daemon::AppState;
use crate::insights::{
    member_dashboard, member_profile, member_with_insights, members_summary, MemberDashboard,
    MemberProfile, MemberWithInsights,
};
use crate::models::{Episode, HealthMetric, Member, MemberUpdate, NewMember};

#[derive(Debug, Deserialize)]
pub struct MetricFilter {
    #[serde(rename = "type")]
    pub metric_type: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Member>> {
    let members = state
        .store
        .list_members(Some(state.limits.members))
        .await
        .context("Failed to fetch members")?;
    Ok(Json(ApiResponse::list(members)))
}

pub async fn full(State(state): State<AppState>) -> ApiResult<Vec<MemberWithInsights>> {
    const CONTEXT: &str = "Failed to fetch members with insights";
    let records = state.store.all_member_records().await.context(CONTEXT)?;
    let summary = to_summary(&members_summary(&records), CONTEXT)?;
    let data: Vec<MemberWithInsights> = records.iter().map(member_with_insights).collect();
    Ok(Json(ApiResponse::list(data).with_summary(summary)))
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewMember>, JsonRejection>,
) -> ApiResult<Member> {
    const CONTEXT: &str = "Failed to create member";
    let input = body(payload, CONTEXT)?;
    let member = state.store.create_member(input).await.context(CONTEXT)?;
    Ok(Json(
        ApiResponse::ok(member).with_message("Member created successfully"),
    ))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<MemberProfile> {
    let records = state
        .store
        .member_records(&id)
        .await
        .context("Failed to fetch member")?;
    Ok(Json(ApiResponse::ok(member_profile(
        &records,
        OffsetDateTime::now_utc(),
    ))))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<MemberUpdate>, JsonRejection>,
) -> ApiResult<Member> {
    const CONTEXT: &str = "Failed to update member";
    let input = body(payload, CONTEXT)?;
    let member = state
        .store
        .update_member(&id, input)
        .await
        .context(CONTEXT)?;
    Ok(Json(
        ApiResponse::ok(member).with_message("Member updated successfully"),
    ))
}

pub async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state
        .store
        .delete_member(&id)
        .await
        .context("Failed to delete member")?;
    Ok(Json(ApiResponse::done("Member deleted successfully")))
}

pub async fn dashboard(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<MemberDashboard> {
    let records = state
        .store
        .member_records(&id)
        .await
        .context("Failed to fetch dashboard data")?;
    Ok(Json(ApiResponse::ok(member_dashboard(
        &records,
        OffsetDateTime::now_utc(),
    ))))
}

pub async fn health_metrics(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<MetricFilter>, QueryRejection>,
) -> ApiResult<Vec<HealthMetric>> {
    const CONTEXT: &str = "Failed to fetch health metrics";
    let filter = query(params, CONTEXT)?;
    state.store.get_member(&id).await.context(CONTEXT)?;
    let limit = filter
        .limit
        .unwrap_or(state.limits.member_health_metrics);
    let metrics = state
        .store
        .member_health_metrics(&id, filter.metric_type.as_deref(), Some(limit))
        .await
        .context(CONTEXT)?;
    Ok(Json(ApiResponse::list(metrics)))
}

pub async fn episodes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Episode>> {
    const CONTEXT: &str = "Failed to fetch episodes";
    state.store.get_member(&id).await.context(CONTEXT)?;
    let episodes = state.store.member_episodes(&id).await.context(CONTEXT)?;
    Ok(Json(ApiResponse::list(episodes)))
}
