use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use threadlog_auth::{AuthError, AuthSettings, SupabaseAuth, TokenVerifier};

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn user(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let apikey = headers
        .get("apikey")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    match bearer(&headers).as_str() {
        "Bearer good" => (
            StatusCode::OK,
            Json(json!({"id": "u1", "email": "u1@example.com", "apikey_seen": apikey})),
        ),
        "Bearer no-id" => (StatusCode::OK, Json(json!({"email": "ghost@example.com"}))),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"msg": "bad jwt"}))),
    }
}

async fn token(
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    match params.get("grant_type").map(String::as_str) {
        Some("id_token") if body["id_token"] == "no-refresh-token" => (
            StatusCode::OK,
            Json(json!({"access_token": "a1", "user": {"id": "u1"}})),
        ),
        Some("id_token") if body["provider"] == "google" => (
            StatusCode::OK,
            Json(json!({
                "access_token": "a1",
                "refresh_token": "r1",
                "user": {"id": "u1", "nonce_seen": body["nonce"]}
            })),
        ),
        Some("refresh_token") if body["refresh_token"] == "garbled" => {
            (StatusCode::OK, Json(json!({"unexpected": true})))
        }
        Some("refresh_token") if body["refresh_token"] == "r1" => (
            StatusCode::OK,
            Json(json!({"access_token": "a2", "refresh_token": "r2", "expires_in": 1800})),
        ),
        Some("password") if body["password"] == "secret" => (
            StatusCode::OK,
            Json(json!({"access_token": "a3", "refresh_token": "r3"})),
        ),
        Some("password") => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": "Invalid login credentials"})),
        ),
        _ => (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_request"}))),
    }
}

async fn logout(headers: HeaderMap) -> StatusCode {
    if bearer(&headers) == "Bearer good" {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::UNAUTHORIZED
    }
}

async fn spawn_gotrue() -> Result<String> {
    let app = Router::new()
        .route("/auth/v1/user", get(user))
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/logout", post(logout));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

fn client(base_url: &str, service_key: Option<&str>) -> SupabaseAuth {
    SupabaseAuth::new(
        reqwest::Client::new(),
        AuthSettings {
            base_url: base_url.to_string(),
            anon_key: "anon".to_string(),
            service_key: service_key.map(str::to_string),
            timeout: Duration::from_secs(5),
            verify_timeout: Duration::from_secs(5),
        },
    )
}

#[tokio::test]
async fn test_verify_prefers_service_key() -> Result<()> {
    let base = spawn_gotrue().await?;

    let identity = client(&base, Some("service")).verify("good").await?;
    assert_eq!(identity.id, "u1");
    assert_eq!(identity.email.as_deref(), Some("u1@example.com"));
    assert_eq!(identity.raw["apikey_seen"], "service");

    let identity = client(&base, None).verify("good").await?;
    assert_eq!(identity.raw["apikey_seen"], "anon");
    Ok(())
}

#[tokio::test]
async fn test_verify_failures() -> Result<()> {
    let base = spawn_gotrue().await?;
    let auth = client(&base, None);

    assert!(matches!(auth.verify("expired").await, Err(AuthError::InvalidToken)));
    assert!(matches!(auth.verify("no-id").await, Err(AuthError::InvalidPayload)));

    let unreachable = client("http://127.0.0.1:9", None);
    assert!(matches!(unreachable.verify("good").await, Err(AuthError::InvalidToken)));
    Ok(())
}

#[tokio::test]
async fn test_exchange_id_token() -> Result<()> {
    let base = spawn_gotrue().await?;
    let auth = client(&base, None);

    let session = auth.exchange_id_token("google-id-token", Some("n-1")).await?;
    assert_eq!(session.refresh_token.as_deref(), Some("r1"));
    assert_eq!(session.token_type, "bearer");
    assert_eq!(session.expires_in, 3600);
    assert_eq!(session.user.unwrap()["nonce_seen"], "n-1");

    let err = auth.exchange_id_token("no-refresh-token", None).await.unwrap_err();
    assert!(matches!(err, AuthError::ExchangeFailed(_)));
    Ok(())
}

#[tokio::test]
async fn test_refresh_rotation() -> Result<()> {
    let base = spawn_gotrue().await?;
    let auth = client(&base, None);

    let session = auth.refresh_session("r1").await?;
    assert_eq!(session.access_token, "a2");
    assert_eq!(session.refresh_token.as_deref(), Some("r2"));
    assert_eq!(session.expires_in, 1800);

    assert!(matches!(
        auth.refresh_session("stale").await,
        Err(AuthError::InvalidRefreshToken)
    ));
    Ok(())
}

#[tokio::test]
async fn test_refresh_failures_read_as_invalid_refresh_token() -> Result<()> {
    let base = spawn_gotrue().await?;
    let auth = client(&base, None);
    assert!(matches!(
        auth.refresh_session("garbled").await,
        Err(AuthError::InvalidRefreshToken)
    ));

    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let closed = format!("http://{}", listener.local_addr()?);
    drop(listener);
    let unreachable = client(&closed, None);
    assert!(matches!(
        unreachable.refresh_session("r1").await,
        Err(AuthError::InvalidRefreshToken)
    ));
    Ok(())
}

#[tokio::test]
async fn test_password_grant_relays_upstream_reply() -> Result<()> {
    let base = spawn_gotrue().await?;
    let auth = client(&base, None);

    let ok = auth.password_grant("a@example.com", "secret").await?;
    assert!(ok.is_success());
    assert_eq!(ok.refresh_token(), Some("r3"));

    let rejected = auth.password_grant("a@example.com", "wrong").await?;
    assert_eq!(rejected.status, 400);
    assert_eq!(rejected.body["error"], "invalid_grant");
    assert_eq!(rejected.refresh_token(), None);
    Ok(())
}

#[tokio::test]
async fn test_logout_and_profile_without_service_key() -> Result<()> {
    let base = spawn_gotrue().await?;
    let auth = client(&base, None);

    auth.logout("good").await?;
    assert!(matches!(
        auth.logout("bad").await,
        Err(AuthError::Upstream { status: 401, .. })
    ));
    assert!(matches!(
        auth.save_profile("u1", "a@example.com", "ada").await,
        Err(AuthError::Config(_))
    ));
    Ok(())
}
