use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};

use super::{body, ApiResponse, ApiResult, Context};
use crate::daemon::AppState;
use crate::models::{
    Conversation, ConversationDetail, ConversationThread, ConversationUpdate, Message,
    NewConversation, NewMessage,
};

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<ConversationThread>> {
    let threads = state
        .store
        .list_conversations(
            state.limits.conversations,
            state.limits.conversation_preview_messages,
        )
        .await
        .context("Failed to fetch conversations")?;
    Ok(Json(ApiResponse::list(threads)))
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewConversation>, JsonRejection>,
) -> ApiResult<Conversation> {
    const CONTEXT: &str = "Failed to create conversation";
    let input = body(payload, CONTEXT)?;
    let conversation = state
        .store
        .create_conversation(input)
        .await
        .context(CONTEXT)?;
    Ok(Json(
        ApiResponse::ok(conversation).with_message("Conversation created successfully"),
    ))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ConversationDetail> {
    let detail = state
        .store
        .get_conversation(&id)
        .await
        .context("Failed to fetch conversation")?;
    Ok(Json(ApiResponse::ok(detail)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ConversationUpdate>, JsonRejection>,
) -> ApiResult<Conversation> {
    const CONTEXT: &str = "Failed to update conversation";
    let input = body(payload, CONTEXT)?;
    let conversation = state
        .store
        .update_conversation(&id, input)
        .await
        .context(CONTEXT)?;
    Ok(Json(
        ApiResponse::ok(conversation).with_message("Conversation updated successfully"),
    ))
}

pub async fn add_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<NewMessage>, JsonRejection>,
) -> ApiResult<Message> {
    const CONTEXT: &str = "Failed to add message";
    let input = body(payload, CONTEXT)?;
    let message = state
        .store
        .add_message(&id, input)
        .await
        .context(CONTEXT)?;
    Ok(Json(
        ApiResponse::ok(message).with_message("Message added successfully"),
    ))
}
