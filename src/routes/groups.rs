// ============================================================================
// Group Routes
// ============================================================================
//
// Endpoints:
// - POST /groups/create - Create a group from a member list
// - POST /groups/manage - Add or remove a single member
//
// ============================================================================

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::AppError;
use crate::model::MemberAction;
use crate::routes::extractors::JsonBody;

#[derive(Deserialize)]
pub struct CreateGroupRequest {
    pub members: Vec<String>,
}

/// POST /groups/create
pub async fn create_group(
    State(app_context): State<Arc<AppContext>>,
    JsonBody(request): JsonBody<CreateGroupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let group = app_context.groups.create(request.members).await?;
    Ok((StatusCode::OK, Json(group)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManageGroupMembersRequest {
    pub group_id: String,
    pub member_id: String,
    pub action: MemberAction,
}

/// POST /groups/manage
pub async fn manage_group_members(
    State(app_context): State<Arc<AppContext>>,
    JsonBody(request): JsonBody<ManageGroupMembersRequest>,
) -> Result<impl IntoResponse, AppError> {
    let group = app_context
        .groups
        .manage_members(&request.group_id, &request.member_id, request.action)
        .await?;
    Ok((StatusCode::OK, Json(group)))
}
