use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};

use super::{body, ApiResponse, ApiResult, Context};
use crate::daemon::AppState;
use crate::models::{NewTeamMember, TeamMember};

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<TeamMember>> {
    let team = state
        .store
        .list_team_members(state.limits.team_members)
        .await
        .context("Failed to fetch team members")?;
    Ok(Json(ApiResponse::list(team)))
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewTeamMember>, JsonRejection>,
) -> ApiResult<TeamMember> {
    const CONTEXT: &str = "Failed to create team member";
    let input = body(payload, CONTEXT)?;
    let member = state
        .store
        .create_team_member(input)
        .await
        .context(CONTEXT)?;
    Ok(Json(
        ApiResponse::ok(member).with_message("Team member created successfully"),
    ))
}
