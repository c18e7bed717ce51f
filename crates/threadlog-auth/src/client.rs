use std::time::Duration;

use async_trait::async_trait;
use reqwest::Response;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{AuthError, Result};
use crate::identity::Identity;
use crate::types::{Session, UpstreamReply};

/// Resolves an access token to the identity that owns it.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, access_token: &str) -> Result<Identity>;
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub base_url: String,
    pub anon_key: String,
    pub service_key: Option<String>,
    /// Bound for token grants, signup and logout.
    pub timeout: Duration,
    /// Bound for verifying a caller's access token.
    pub verify_timeout: Duration,
}

/// Client for the Supabase auth (GoTrue) endpoints.
#[derive(Clone)]
pub struct SupabaseAuth {
    http: reqwest::Client,
    settings: AuthSettings,
}

impl SupabaseAuth {
    pub fn new(http: reqwest::Client, mut settings: AuthSettings) -> Self {
        settings.base_url = settings.base_url.trim_end_matches('/').to_string();
        settings.service_key = settings.service_key.filter(|key| !key.trim().is_empty());
        Self { http, settings }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.settings.base_url, path)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(self.url(path))
            .header("apikey", &self.settings.anon_key)
            .timeout(self.settings.timeout)
    }

    /// Trade a Google ID token for a session. A grant without a refresh
    /// token is treated as a failed exchange.
    pub async fn exchange_id_token(&self, id_token: &str, nonce: Option<&str>) -> Result<Session> {
        let mut payload = json!({ "provider": "google", "id_token": id_token });
        if let Some(nonce) = nonce.filter(|n| !n.is_empty()) {
            payload["nonce"] = Value::String(nonce.to_string());
        }

        let response = self
            .post("token")
            .query(&[("grant_type", "id_token")])
            .json(&payload)
            .send()
            .await?;
        let reply = read_reply(response).await;
        if !reply.is_success() {
            warn!(status = reply.status, "id token exchange rejected");
            return Err(AuthError::Upstream {
                status: reply.status,
                body: reply.body,
            });
        }

        let session: Session = serde_json::from_value(reply.body)
            .map_err(|err| AuthError::ExchangeFailed(format!("unexpected grant payload: {err}")))?;
        if session.refresh_token.as_deref().map_or(true, str::is_empty) {
            return Err(AuthError::ExchangeFailed("no refresh_token in grant".to_string()));
        }
        Ok(session)
    }

    /// Rotate a refresh token. Any upstream rejection is reported as an
    /// invalid refresh token.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        let response = self
            .post("token")
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|err| {
                debug!(error = %err, "refresh request failed");
                AuthError::InvalidRefreshToken
            })?;
        let reply = read_reply(response).await;
        if !reply.is_success() {
            debug!(status = reply.status, "refresh rejected");
            return Err(AuthError::InvalidRefreshToken);
        }
        serde_json::from_value(reply.body).map_err(|err| {
            debug!(error = %err, "refresh reply was not a session");
            AuthError::InvalidRefreshToken
        })
    }

    /// Email/password grant. The reply is returned whatever its status.
    pub async fn password_grant(&self, email: &str, password: &str) -> Result<UpstreamReply> {
        let response = self
            .post("token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Ok(read_reply(response).await)
    }

    pub async fn signup(&self, email: &str, password: &str, nickname: &str) -> Result<UpstreamReply> {
        let response = self
            .post("signup")
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "nickname": nickname },
            }))
            .send()
            .await?;
        Ok(read_reply(response).await)
    }

    /// Upsert a row in `profiles` with the service-role key.
    pub async fn save_profile(&self, user_id: &str, email: &str, nickname: &str) -> Result<()> {
        let key = self
            .settings
            .service_key
            .as_deref()
            .ok_or_else(|| AuthError::Config("service role key is not configured".to_string()))?;

        let response = self
            .http
            .post(format!("{}/rest/v1/profiles", self.settings.base_url))
            .header("apikey", key)
            .bearer_auth(key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&json!({ "id": user_id, "email": email, "nickname": nickname }))
            .timeout(self.settings.timeout)
            .send()
            .await?;
        let reply = read_reply(response).await;
        if !reply.is_success() {
            return Err(AuthError::Upstream {
                status: reply.status,
                body: reply.body,
            });
        }
        Ok(())
    }

    pub async fn logout(&self, access_token: &str) -> Result<()> {
        let response = self.post("logout").bearer_auth(access_token).send().await?;
        let reply = read_reply(response).await;
        if !reply.is_success() {
            return Err(AuthError::Upstream {
                status: reply.status,
                body: reply.body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TokenVerifier for SupabaseAuth {
    async fn verify(&self, access_token: &str) -> Result<Identity> {
        let apikey = self
            .settings
            .service_key
            .as_deref()
            .unwrap_or(&self.settings.anon_key);

        let response = self
            .http
            .get(self.url("user"))
            .header("apikey", apikey)
            .bearer_auth(access_token)
            .timeout(self.settings.verify_timeout)
            .send()
            .await
            .map_err(|err| {
                debug!(error = %err, "token verification request failed");
                AuthError::InvalidToken
            })?;

        if response.status() != reqwest::StatusCode::OK {
            debug!(status = response.status().as_u16(), "token rejected");
            return Err(AuthError::InvalidToken);
        }

        let payload: Value = response.json().await.map_err(|_| AuthError::InvalidToken)?;
        Identity::from_payload(payload)
    }
}

/// Status plus JSON body; non-JSON bodies are wrapped as `{"message": ...}`.
async fn read_reply(response: Response) -> UpstreamReply {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let body = if text.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(&text).unwrap_or_else(|_| json!({ "message": text }))
    };
    UpstreamReply { status, body }
}
