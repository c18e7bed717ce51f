use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use threadlog_store::ExtensionFile;

use crate::{
    error::{ApiError, ApiResult},
    extract::AuthUser,
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExtensionFileResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExtensionFilesResponse {
    pub items: Vec<ExtensionFileResponse>,
}

impl From<ExtensionFile> for ExtensionFileResponse {
    fn from(file: ExtensionFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
            description: file.description,
            created_at: file.created_at,
        }
    }
}

/// List the caller's extension files, newest first
#[utoipa::path(
    get,
    path = "/extension-files",
    responses(
        (status = 200, description = "Caller's files", body = ExtensionFilesResponse),
        (status = 401, description = "Missing or invalid access token")
    ),
    security(("bearer" = [])),
    tag = "files"
)]
pub async fn list_extension_files(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<ExtensionFilesResponse>> {
    let files = state
        .files
        .list_extension_files(&user.identity.id, &user.access_token)
        .await
        .map_err(ApiError::store("DB_QUERY_FAILED"))?;

    Ok(Json(ExtensionFilesResponse {
        items: files.into_iter().map(ExtensionFileResponse::from).collect(),
    }))
}
