use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;

use threadlog_auth::{extract_bearer, read_cookie, AuthError, Session, REFRESH_COOKIE};
use threadlog_store::schema::normalize_email;

use crate::{
    error::{ApiError, ApiResult},
    extract::{authorization_header, cookie_header, set_cookie_headers, ApiJson, AuthUser},
    state::AppState,
};

const MIN_ID_TOKEN_LEN: usize = 10;
const MIN_PASSWORD_LEN: usize = 6;
const MAX_NICKNAME_LEN: usize = 50;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExchangeIdTokenRequest {
    pub id_token: String,
    pub nonce: Option<String>,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordLoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordSignupRequest {
    pub email: String,
    pub password: String,
    pub nickname: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
    pub provider: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExchangeIdTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub issued_at: i64,
    pub user: SessionUser,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub issued_at: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileMetaResponse {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthMeResponse {
    pub id: String,
    pub email: Option<String>,
    pub meta: Option<ProfileMetaResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub id: String,
    pub email: Option<String>,
}

fn session_user(user: Option<&Value>) -> ApiResult<SessionUser> {
    let user = user.ok_or_else(|| AuthError::ExchangeFailed("grant carried no user".to_string()))?;
    let field = |key: &str| user.get(key).and_then(Value::as_str).map(str::to_string);

    let id = field("id").ok_or_else(|| AuthError::ExchangeFailed("grant user has no id".to_string()))?;
    let provider = user
        .get("app_metadata")
        .and_then(|meta| meta.get("provider"))
        .and_then(Value::as_str)
        .unwrap_or("google")
        .to_string();

    Ok(SessionUser {
        id,
        email: field("email"),
        provider,
        created_at: field("created_at"),
    })
}

/// Exchange a Google ID token for a session
///
/// Sets the `refresh_token` cookie and returns the access token.
#[utoipa::path(
    post,
    path = "/auth/google/exchange-id-token",
    request_body = ExchangeIdTokenRequest,
    responses(
        (status = 200, description = "Session issued", body = ExchangeIdTokenResponse),
        (status = 422, description = "Invalid request"),
        (status = 502, description = "Exchange returned no refresh token")
    ),
    tag = "auth"
)]
pub async fn exchange_id_token(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ExchangeIdTokenRequest>,
) -> ApiResult<(HeaderMap, Json<ExchangeIdTokenResponse>)> {
    if req.id_token.chars().count() < MIN_ID_TOKEN_LEN {
        return Err(ApiError::Validation(format!(
            "id_token: must be at least {MIN_ID_TOKEN_LEN} characters"
        )));
    }

    let session: Session = state
        .auth
        .exchange_id_token(&req.id_token, req.nonce.as_deref())
        .await?;
    let refresh_token = session
        .refresh_token
        .as_deref()
        .ok_or_else(|| AuthError::ExchangeFailed("no refresh_token in grant".to_string()))?;
    let user = session_user(session.user.as_ref())?;

    tracing::info!(user_id = %user.id, provider = %user.provider, "session exchanged");
    let headers = set_cookie_headers([state.cookies.set_refresh_cookie(refresh_token, req.remember)])?;

    Ok((
        headers,
        Json(ExchangeIdTokenResponse {
            access_token: session.access_token,
            token_type: session.token_type,
            expires_in: session.expires_in,
            issued_at: Utc::now().timestamp(),
            user,
        }),
    ))
}

/// Rotate the session using the `refresh_token` cookie
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "Refresh cookie missing or rejected")
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<(HeaderMap, Json<RefreshResponse>)> {
    let refresh_token =
        read_cookie(cookie_header(&headers), REFRESH_COOKIE).ok_or(AuthError::InvalidRefreshToken)?;

    let session = state.auth.refresh_session(&refresh_token).await?;

    let renewed = session
        .refresh_token
        .as_deref()
        .map(|token| state.cookies.set_refresh_cookie(token, false));
    let response_headers = set_cookie_headers(renewed)?;

    Ok((
        response_headers,
        Json(RefreshResponse {
            access_token: session.access_token,
            token_type: session.token_type,
            expires_in: session.expires_in,
            issued_at: Utc::now().timestamp(),
        }),
    ))
}

/// Log out and clear the refresh cookie
///
/// Upstream revocation is best-effort; the cookie is always cleared.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = OkResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<(HeaderMap, Json<OkResponse>)> {
    if let Ok(token) = extract_bearer(authorization_header(&headers)) {
        if let Err(e) = state.auth.logout(&token).await {
            tracing::warn!("Upstream logout failed: {}", e);
        }
    }

    let response_headers = set_cookie_headers([state.cookies.clear_refresh_cookie()])?;
    Ok((response_headers, Json(OkResponse { ok: true })))
}

/// Email/password login
///
/// The auth provider's reply is relayed verbatim, including its status on
/// failure.
#[utoipa::path(
    post,
    path = "/auth/login/password",
    request_body = PasswordLoginRequest,
    responses(
        (status = 200, description = "Provider session payload"),
        (status = 400, description = "Provider rejected the credentials")
    ),
    tag = "auth"
)]
pub async fn login_password(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<PasswordLoginRequest>,
) -> ApiResult<(HeaderMap, Json<Value>)> {
    let reply = state.auth.password_grant(req.email.trim(), &req.password).await?;
    if !reply.is_success() {
        return Err(AuthError::Upstream {
            status: reply.status,
            body: reply.body,
        }
        .into());
    }

    let cookie = reply
        .refresh_token()
        .map(|token| state.cookies.set_refresh_cookie(token, req.remember));
    let headers = set_cookie_headers(cookie)?;
    Ok((headers, Json(reply.body)))
}

/// Email/password signup
///
/// Stores the nickname as user metadata and, when a service key is
/// configured, in the `profiles` table.
#[utoipa::path(
    post,
    path = "/auth/signup/password",
    request_body = PasswordSignupRequest,
    responses(
        (status = 200, description = "Provider signup payload"),
        (status = 422, description = "Invalid request")
    ),
    tag = "auth"
)]
pub async fn signup_password(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<PasswordSignupRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let email = normalize_email(&req.email)?;
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "password: must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let nickname = req.nickname.trim();
    let nickname_len = nickname.chars().count();
    if nickname_len == 0 || nickname_len > MAX_NICKNAME_LEN {
        return Err(ApiError::Validation(format!(
            "nickname: must be between 1 and {MAX_NICKNAME_LEN} characters"
        )));
    }

    let reply = state.auth.signup(&email, &req.password, nickname).await?;
    if !reply.is_success() {
        return Err(AuthError::Upstream {
            status: reply.status,
            body: reply.body,
        }
        .into());
    }

    let user_id = reply
        .body
        .get("user")
        .and_then(|user| user.get("id"))
        .or_else(|| reply.body.get("id"))
        .and_then(Value::as_str);
    if let Some(user_id) = user_id {
        if let Err(e) = state.auth.save_profile(user_id, &email, nickname).await {
            tracing::warn!(user_id = %user_id, "Profile insert skipped: {}", e);
        }
    }

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::OK);
    Ok((status, Json(reply.body)))
}

/// Current user with profile metadata from the first linked identity
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Authenticated user", body = AuthMeResponse),
        (status = 401, description = "Missing or invalid access token")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn auth_me(user: AuthUser) -> ApiResult<Json<AuthMeResponse>> {
    let meta = user.identity.profile_meta().map(|meta| ProfileMetaResponse {
        name: meta.name,
        avatar_url: meta.avatar_url,
    });
    Ok(Json(AuthMeResponse {
        id: user.identity.id,
        email: user.identity.email,
        meta,
    }))
}

/// Current user id and email
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Authenticated user", body = MeResponse),
        (status = 401, description = "Missing or invalid access token")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn current_user(user: AuthUser) -> ApiResult<Json<MeResponse>> {
    Ok(Json(MeResponse {
        id: user.identity.id,
        email: user.identity.email,
    }))
}
