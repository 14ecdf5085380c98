// ============================================================================
// User Routes
// ============================================================================
//
// Endpoints:
// - POST /users/register - Register a new user
// - GET /users - Paginated user listing
// - GET /users/check-block - Block status between two users
// - POST /users/block - Block or unblock a target user
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
use crate::model::{BlockAction, User};
use crate::routes::extractors::JsonBody;
use crate::storage::Cursor;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
}

/// POST /users/register
pub async fn register_user(
    State(app_context): State<Arc<AppContext>>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = app_context.users.register(&request.username).await?;
    Ok((StatusCode::OK, Json(user)))
}

#[derive(Deserialize)]
pub struct ListUsersParams {
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersResponse {
    pub items: Vec<User>,
    pub next_cursor: Option<String>,
}

/// GET /users
pub async fn get_users(
    State(app_context): State<Arc<AppContext>>,
    Query(params): Query<ListUsersParams>,
) -> Result<impl IntoResponse, AppError> {
    let cursor = params.cursor.map(Cursor::from_token);
    let listing = app_context.users.list(params.limit, cursor).await?;

    Ok((
        StatusCode::OK,
        Json(UsersResponse {
            items: listing.items,
            next_cursor: listing.next_cursor.map(|c| c.as_str().to_string()),
        }),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckBlockParams {
    pub user_id: String,
    pub target_id: String,
}

/// GET /users/check-block
pub async fn check_block_status(
    State(app_context): State<Arc<AppContext>>,
    Query(params): Query<CheckBlockParams>,
) -> Result<impl IntoResponse, AppError> {
    let blocked = app_context
        .users
        .is_blocked(&params.user_id, &params.target_id)
        .await?;

    let message = if blocked {
        "User is blocked."
    } else {
        "User is not blocked."
    };
    Ok((StatusCode::OK, message))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManageBlockRequest {
    pub user_id: String,
    pub target_id: String,
    pub action: BlockAction,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManageBlockResponse {
    pub user_id: String,
    pub blocked_users: Vec<String>,
}

/// POST /users/block
pub async fn manage_block(
    State(app_context): State<Arc<AppContext>>,
    JsonBody(request): JsonBody<ManageBlockRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = app_context
        .users
        .set_block(&request.user_id, &request.target_id, request.action)
        .await?;

    Ok((
        StatusCode::OK,
        Json(ManageBlockResponse {
            user_id: user.user_id,
            blocked_users: user.blocked_users,
        }),
    ))
}
