use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{PersistError, Result};
use crate::trait_client::UserDirectory;

#[derive(Debug, Deserialize)]
struct AdminUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdminUserList {
    #[serde(default)]
    users: Vec<AdminUser>,
}

/// Account lookups through the auth admin API. Needs the service-role key.
#[derive(Clone)]
pub struct SupabaseAdminDirectory {
    http: reqwest::Client,
    base_url: String,
    service_key: Option<String>,
    timeout: Duration,
}

impl SupabaseAdminDirectory {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        service_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.filter(|key| !key.trim().is_empty()),
            timeout,
        }
    }

    fn key(&self) -> Result<&str> {
        self.service_key.as_deref().ok_or_else(|| {
            PersistError::DirectoryUnavailable("service role key is not configured".to_string())
        })
    }

    fn get(&self, path: &str, key: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}/auth/v1/admin/{}", self.base_url, path))
            .header("apikey", key)
            .bearer_auth(key)
            .timeout(self.timeout)
    }
}

#[async_trait]
impl UserDirectory for SupabaseAdminDirectory {
    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<String>> {
        let key = self.key()?;
        let response = self.get("users", key).query(&[("email", email)]).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PersistError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        // The admin endpoint may return more than the requested user.
        let list: AdminUserList = response.json().await?;
        let found = list
            .users
            .into_iter()
            .find(|user| {
                user.email
                    .as_deref()
                    .is_some_and(|candidate| candidate.eq_ignore_ascii_case(email))
            })
            .map(|user| user.id);
        debug!(found = found.is_some(), "admin email lookup");
        Ok(found)
    }

    async fn find_email_by_user_id(&self, user_id: &str) -> Result<Option<String>> {
        let key = self.key()?;
        let response = self.get(&format!("users/{user_id}"), key).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PersistError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let user: AdminUser = response.json().await?;
        Ok(user.email)
    }
}
