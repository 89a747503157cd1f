use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};

use super::{body, ApiResponse, ApiResult, Context};
use crate::daemon::AppState;
use crate::models::{Episode, EpisodeUpdate, EpisodeWithMember, NewEpisode};

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<EpisodeWithMember>> {
    let episodes = state
        .store
        .list_episodes(state.limits.episodes)
        .await
        .context("Failed to fetch episodes")?;
    Ok(Json(ApiResponse::list(episodes)))
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewEpisode>, JsonRejection>,
) -> ApiResult<Episode> {
    const CONTEXT: &str = "Failed to create episode";
    let input = body(payload, CONTEXT)?;
    let episode = state.store.create_episode(input).await.context(CONTEXT)?;
    Ok(Json(
        ApiResponse::ok(episode).with_message("Episode created successfully"),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<EpisodeUpdate>, JsonRejection>,
) -> ApiResult<Episode> {
    const CONTEXT: &str = "Failed to update episode";
    let input = body(payload, CONTEXT)?;
    let episode = state
        .store
        .update_episode(&id, input)
        .await
        .context(CONTEXT)?;
    Ok(Json(
        ApiResponse::ok(episode).with_message("Episode updated successfully"),
    ))
}
