use axum::Json;
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use crate::routes::{auth, files, health, messages, threads, workspace};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::exchange_id_token,
        auth::refresh,
        auth::logout,
        auth::login_password,
        auth::signup_password,
        auth::auth_me,
        auth::current_user,
        threads::create_thread,
        threads::list_threads,
        threads::get_thread,
        threads::delete_thread,
        messages::list_messages,
        messages::add_messages,
        workspace::convert_to_workspace,
        workspace::list_members,
        files::list_extension_files,
    ),
    components(schemas(
        health::HealthResponse,
        auth::ExchangeIdTokenRequest,
        auth::ExchangeIdTokenResponse,
        auth::SessionUser,
        auth::RefreshResponse,
        auth::OkResponse,
        auth::PasswordLoginRequest,
        auth::PasswordSignupRequest,
        auth::AuthMeResponse,
        auth::ProfileMetaResponse,
        auth::MeResponse,
        threads::CreateThreadRequest,
        threads::CreateThreadResponse,
        threads::ThreadSummaryResponse,
        threads::ThreadsListResponse,
        threads::ThreadDetailResponse,
        threads::DeleteThreadResponse,
        messages::MessageIn,
        messages::AddMessagesRequest,
        messages::AddMessagesResponse,
        messages::MessageResponse,
        messages::MessagesResponse,
        workspace::WorkspaceRequest,
        workspace::WorkspaceCreatedResponse,
        workspace::MemberResponse,
        files::ExtensionFileResponse,
        files::ExtensionFilesResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Service status"),
        (name = "auth", description = "Session exchange, refresh and logout"),
        (name = "threads", description = "Conversation threads"),
        (name = "messages", description = "Messages within a thread"),
        (name = "workspace", description = "Shared threads and their members"),
        (name = "files", description = "Files uploaded through the browser extension"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme("bearer", SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));
        }
    }
}

/// Generated OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
