// ============================================================================
// Message Routes
// ============================================================================
//
// Endpoints:
// - POST /messages/send - Send a direct message
// - GET /messages - Unread messages for a user, or a group's messages
// - POST /messages/group/send - Append a message to a group
//
// GET /messages with a userId is the one place a read couples to a write:
// the handler fetches the unread page, then marks it read, and only
// responds once the whole batch has been flipped.
//
// ============================================================================

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::AppError;
use crate::model::Message;
use crate::routes::extractors::JsonBody;
use crate::storage::Cursor;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
}

/// POST /messages/send
pub async fn send_message(
    State(app_context): State<Arc<AppContext>>,
    JsonBody(request): JsonBody<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let message = app_context
        .messaging
        .send(&request.sender_id, &request.receiver_id, &request.content)
        .await?;
    Ok((StatusCode::OK, Json(message)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMessagesParams {
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesResponse {
    pub items: Vec<Message>,
    pub next_cursor: Option<String>,
}

/// GET /messages
pub async fn get_messages(
    State(app_context): State<Arc<AppContext>>,
    Query(params): Query<GetMessagesParams>,
) -> Result<impl IntoResponse, AppError> {
    let response = if let Some(user_id) = params.user_id {
        let cursor = params.cursor.map(Cursor::from_token);
        let listing = app_context.messaging.fetch_unread(&user_id, cursor).await?;
        app_context.messaging.mark_read(&listing.items).await?;

        MessagesResponse {
            items: listing.items,
            next_cursor: listing.next_cursor.map(|c| c.as_str().to_string()),
        }
    } else if let Some(group_id) = params.group_id {
        MessagesResponse {
            items: app_context.messaging.fetch_for_group(&group_id).await?,
            next_cursor: None,
        }
    } else {
        return Err(AppError::InvalidRequest(
            "Either userId or groupId must be provided.".to_string(),
        ));
    };

    Ok((StatusCode::OK, Json(response)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendGroupMessageRequest {
    pub group_id: String,
    pub sender_id: String,
    pub content: String,
}

/// POST /messages/group/send
pub async fn send_group_message(
    State(app_context): State<Arc<AppContext>>,
    JsonBody(request): JsonBody<SendGroupMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let message = app_context
        .messaging
        .send_to_group(&request.group_id, &request.sender_id, &request.content)
        .await?;
    Ok((StatusCode::OK, Json(message)))
}
