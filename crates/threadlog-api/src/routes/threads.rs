use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use threadlog_store::{
    schema::validate_thread_id, NewMessage, NewThread, Page, ThreadDetail, ThreadSummary,
    THREAD_PAGE,
};

use crate::{
    error::{ApiError, ApiResult},
    extract::{ApiJson, AuthUser},
    routes::messages::{message_to_response, MessageIn, MessageResponse},
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateThreadRequest {
    pub title: String,
    /// Optional; must match the authenticated user when present.
    #[serde(default, alias = "ownerId")]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<MessageIn>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateThreadResponse {
    pub thread_id: String,
    pub status: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListThreadsQuery {
    /// 1..=100, default 20
    pub limit: Option<String>,
    /// >= 0, default 0
    pub offset: Option<String>,
    /// `asc` or `desc`, default `desc`
    pub order: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ThreadSummaryResponse {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub is_workspace: bool,
    pub message_count: u64,
    pub last_message_preview: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ThreadsListResponse {
    pub threads: Vec<ThreadSummaryResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ThreadDetailResponse {
    pub id: String,
    pub title: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub is_workspace: bool,
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteThreadResponse {
    pub ok: bool,
}

fn summary_to_response(summary: ThreadSummary) -> ThreadSummaryResponse {
    ThreadSummaryResponse {
        id: summary.id,
        title: summary.title,
        created_at: summary.created_at,
        is_workspace: summary.is_workspace,
        message_count: summary.message_count,
        last_message_preview: summary.last_message_preview,
    }
}

fn detail_to_response(detail: ThreadDetail) -> ThreadDetailResponse {
    ThreadDetailResponse {
        id: detail.id,
        title: detail.title,
        owner_id: detail.owner_id,
        created_at: detail.created_at,
        is_workspace: detail.is_workspace,
        messages: detail.messages.into_iter().map(message_to_response).collect(),
    }
}

/// Create a thread with its initial messages
#[utoipa::path(
    post,
    path = "/threads",
    request_body = CreateThreadRequest,
    responses(
        (status = 200, description = "Thread saved", body = CreateThreadResponse),
        (status = 401, description = "Missing or invalid access token"),
        (status = 422, description = "Invalid request")
    ),
    security(("bearer" = [])),
    tag = "threads"
)]
pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateThreadRequest>,
) -> ApiResult<Json<CreateThreadResponse>> {
    if let Some(owner_id) = req.owner_id.as_deref() {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(ApiError::Validation("owner_id: must not be empty".to_string()));
        }
        if owner_id != user.identity.id {
            return Err(ApiError::Validation(
                "owner_id: does not match the authenticated user".to_string(),
            ));
        }
    }

    let messages = req
        .messages
        .iter()
        .map(|m| NewMessage::parse(&m.role, &m.content))
        .collect::<Result<Vec<_>, _>>()?;
    let thread = NewThread::new(&req.title, messages)?;

    let thread_id = state
        .store
        .create_thread_with_messages(&user.identity.id, thread, &user.access_token)
        .await
        .map_err(ApiError::store("DB_INSERT_FAILED"))?;

    Ok(Json(CreateThreadResponse {
        thread_id,
        status: "saved".to_string(),
    }))
}

/// List threads visible to the caller
#[utoipa::path(
    get,
    path = "/threads",
    params(ListThreadsQuery),
    responses(
        (status = 200, description = "Threads owned by or shared with the caller", body = ThreadsListResponse),
        (status = 401, description = "Missing or invalid access token"),
        (status = 422, description = "Invalid paging parameters")
    ),
    security(("bearer" = [])),
    tag = "threads"
)]
pub async fn list_threads(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<ListThreadsQuery>,
) -> ApiResult<Json<ThreadsListResponse>> {
    let page = Page::parse(
        THREAD_PAGE,
        query.limit.as_deref(),
        query.offset.as_deref(),
        query.order.as_deref(),
    )?;

    let threads = state
        .store
        .list_threads_for_owner(&user.identity.id, &user.access_token, page)
        .await
        .map_err(ApiError::store("DB_QUERY_FAILED"))?;

    Ok(Json(ThreadsListResponse {
        threads: threads.into_iter().map(summary_to_response).collect(),
    }))
}

/// Get a thread with all of its messages
#[utoipa::path(
    get,
    path = "/threads/{thread_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 200, description = "Thread details", body = ThreadDetailResponse),
        (status = 404, description = "Thread not found")
    ),
    security(("bearer" = [])),
    tag = "threads"
)]
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ThreadDetailResponse>> {
    validate_thread_id(&thread_id)?;

    let detail = state
        .store
        .get_thread_detail(&user.identity.id, &thread_id, &user.access_token)
        .await
        .map_err(ApiError::store("DB_FETCH_FAILED"))?
        .ok_or_else(|| ApiError::ThreadNotFound(thread_id))?;

    Ok(Json(detail_to_response(detail)))
}

/// Delete an owned thread
#[utoipa::path(
    delete,
    path = "/threads/{thread_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 200, description = "Thread deleted", body = DeleteThreadResponse),
        (status = 404, description = "Thread not found")
    ),
    security(("bearer" = [])),
    tag = "threads"
)]
pub async fn delete_thread(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(thread_id): Path<String>,
) -> ApiResult<(StatusCode, Json<DeleteThreadResponse>)> {
    validate_thread_id(&thread_id)?;

    let deleted = state
        .store
        .delete_thread_by_id(&user.identity.id, &thread_id, &user.access_token)
        .await
        .map_err(ApiError::store("DB_DELETE_FAILED"))?;

    if deleted == 0 {
        return Err(ApiError::ThreadNotFound(thread_id));
    }

    tracing::info!(thread_id = %thread_id, "thread deleted");
    Ok((StatusCode::OK, Json(DeleteThreadResponse { ok: true })))
}
