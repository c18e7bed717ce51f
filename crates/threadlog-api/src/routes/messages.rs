use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use threadlog_store::{schema::validate_thread_id, MessageRow, NewMessage, Page, MESSAGE_PAGE};

use crate::{
    error::{ApiError, ApiResult},
    extract::{ApiJson, AuthUser},
    state::AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageIn {
    /// `user`, `assistant`, `system` or `tool` (the last two are stored as `assistant`)
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMessagesRequest {
    pub messages: Vec<MessageIn>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddMessagesResponse {
    pub thread_id: String,
    pub added_count: usize,
    pub status: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListMessagesQuery {
    /// 1..=200, default 50
    pub limit: Option<String>,
    /// >= 0, default 0
    pub offset: Option<String>,
    /// `asc` or `desc`, default `asc`
    pub order: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub index: i64,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessagesResponse {
    pub messages: Vec<MessageResponse>,
}

pub(crate) fn message_to_response(row: MessageRow) -> MessageResponse {
    MessageResponse {
        index: row.index,
        role: row.role.as_str().to_string(),
        content: row.content,
        created_at: row.created_at,
    }
}

/// List messages of a thread by index
#[utoipa::path(
    get,
    path = "/threads/{thread_id}/messages",
    params(
        ("thread_id" = String, Path, description = "Thread ID"),
        ListMessagesQuery
    ),
    responses(
        (status = 200, description = "Messages ordered by index", body = MessagesResponse),
        (status = 404, description = "Thread not found"),
        (status = 422, description = "Invalid paging parameters")
    ),
    security(("bearer" = [])),
    tag = "messages"
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(thread_id): Path<String>,
    Query(query): Query<ListMessagesQuery>,
) -> ApiResult<Json<MessagesResponse>> {
    validate_thread_id(&thread_id)?;
    let page = Page::parse(
        MESSAGE_PAGE,
        query.limit.as_deref(),
        query.offset.as_deref(),
        query.order.as_deref(),
    )?;

    let rows = state
        .store
        .list_thread_messages(&user.identity.id, &thread_id, &user.access_token, page)
        .await
        .map_err(ApiError::store("DB_QUERY_FAILED"))?
        .ok_or_else(|| ApiError::ThreadNotFound(thread_id))?;

    Ok(Json(MessagesResponse {
        messages: rows.into_iter().map(message_to_response).collect(),
    }))
}

/// Append messages to a thread
#[utoipa::path(
    post,
    path = "/threads/{thread_id}/messages",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    request_body = AddMessagesRequest,
    responses(
        (status = 200, description = "Messages saved", body = AddMessagesResponse),
        (status = 404, description = "Thread not found"),
        (status = 422, description = "Invalid request")
    ),
    security(("bearer" = [])),
    tag = "messages"
)]
pub async fn add_messages(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(thread_id): Path<String>,
    ApiJson(req): ApiJson<AddMessagesRequest>,
) -> ApiResult<Json<AddMessagesResponse>> {
    validate_thread_id(&thread_id)?;
    if req.messages.is_empty() {
        return Err(ApiError::Validation(
            "messages: must contain at least one message".to_string(),
        ));
    }
    let messages = req
        .messages
        .iter()
        .map(|m| NewMessage::parse(&m.role, &m.content))
        .collect::<Result<Vec<_>, _>>()?;

    let added_count = state
        .store
        .add_messages_to_thread(&user.identity.id, &thread_id, messages, &user.access_token)
        .await
        .map_err(ApiError::store("DB_INSERT_FAILED"))?
        .ok_or_else(|| ApiError::ThreadNotFound(thread_id.clone()))?;

    tracing::debug!(thread_id = %thread_id, added_count, "messages appended");
    Ok(Json(AddMessagesResponse {
        thread_id,
        added_count,
        status: "saved".to_string(),
    }))
}
