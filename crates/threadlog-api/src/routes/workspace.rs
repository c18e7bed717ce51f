use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use threadlog_store::{
    schema::{normalize_emails, validate_thread_id},
    ThreadMember,
};

use crate::{
    error::{ApiError, ApiResult},
    extract::{ApiJson, AuthUser},
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct WorkspaceRequest {
    #[serde(default)]
    pub emails: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WorkspaceCreatedResponse {
    pub thread_id: String,
    pub is_workspace: bool,
    pub added_members: Vec<String>,
    pub not_found: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MemberResponse {
    pub user_id: String,
    pub email: Option<String>,
    /// `owner` or `member`
    pub role: String,
    pub created_at: Option<DateTime<Utc>>,
}

fn member_to_response(member: ThreadMember) -> MemberResponse {
    MemberResponse {
        user_id: member.user_id,
        email: member.email,
        role: member.role.as_str().to_string(),
        created_at: member.created_at,
    }
}

/// Promote an owned thread to a shared workspace
#[utoipa::path(
    post,
    path = "/threads/{thread_id}/workspace",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    request_body = WorkspaceRequest,
    responses(
        (status = 200, description = "Thread is a workspace", body = WorkspaceCreatedResponse),
        (status = 404, description = "Thread not found"),
        (status = 422, description = "Invalid email")
    ),
    security(("bearer" = [])),
    tag = "workspace"
)]
pub async fn convert_to_workspace(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(thread_id): Path<String>,
    ApiJson(req): ApiJson<WorkspaceRequest>,
) -> ApiResult<Json<WorkspaceCreatedResponse>> {
    validate_thread_id(&thread_id)?;
    let emails = normalize_emails(&req.emails)?;

    let outcome = state
        .store
        .convert_to_workspace(&user.identity.id, &thread_id, &emails, &user.access_token)
        .await
        .map_err(ApiError::store("DB_INSERT_FAILED"))?
        .ok_or_else(|| ApiError::ThreadNotFound(thread_id))?;

    Ok(Json(WorkspaceCreatedResponse {
        thread_id: outcome.thread_id,
        is_workspace: true,
        added_members: outcome.added_members,
        not_found: outcome.not_found,
    }))
}

/// List the members of a thread, owner first
#[utoipa::path(
    get,
    path = "/threads/{thread_id}/members",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 200, description = "Thread members", body = [MemberResponse]),
        (status = 404, description = "Thread not found")
    ),
    security(("bearer" = [])),
    tag = "workspace"
)]
pub async fn list_members(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<Vec<MemberResponse>>> {
    validate_thread_id(&thread_id)?;

    let members = state
        .store
        .list_thread_members(&user.identity.id, &thread_id, &user.access_token)
        .await
        .map_err(ApiError::store("DB_QUERY_FAILED"))?
        .ok_or_else(|| ApiError::ThreadNotFound(thread_id))?;

    Ok(Json(members.into_iter().map(member_to_response).collect()))
}
