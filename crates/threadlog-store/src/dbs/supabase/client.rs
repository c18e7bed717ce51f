use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::dbs::supabase::query::RestQuery;
use crate::error::{PersistError, Result};

/// Thin PostgREST client. Every call carries the project key as `apikey`
/// and the caller's access token as the bearer, so row-level security is
/// evaluated for that caller.
#[derive(Clone)]
pub struct SupabaseRest {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    timeout: Duration,
}

impl SupabaseRest {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        anon_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            timeout,
        }
    }

    fn request(&self, method: Method, table: &str, query: &RestQuery, token: &str) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        self.http
            .request(method, url)
            .query(query.pairs())
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .timeout(self.timeout)
    }

    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &RestQuery,
        token: &str,
    ) -> Result<Vec<T>> {
        debug!(table, "select");
        let response = self.request(Method::GET, table, query, token).send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// Insert rows, returning how many the backend echoed back.
    pub async fn insert<T: Serialize>(&self, table: &str, rows: &[T], token: &str) -> Result<usize> {
        debug!(table, rows = rows.len(), "insert");
        let response = self
            .request(Method::POST, table, &RestQuery::new(), token)
            .header("Prefer", "return=representation")
            .json(rows)
            .send()
            .await?;
        count_rows(check(response).await?).await
    }

    pub async fn update<T: Serialize>(
        &self,
        table: &str,
        query: &RestQuery,
        patch: &T,
        token: &str,
    ) -> Result<usize> {
        debug!(table, "update");
        let response = self
            .request(Method::PATCH, table, query, token)
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;
        count_rows(check(response).await?).await
    }

    /// Delete matching rows, returning the number removed.
    pub async fn delete(&self, table: &str, query: &RestQuery, token: &str) -> Result<usize> {
        debug!(table, "delete");
        let response = self
            .request(Method::DELETE, table, query, token)
            .header("Prefer", "return=representation")
            .send()
            .await?;
        count_rows(check(response).await?).await
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PersistError::Upstream {
        status: status.as_u16(),
        body,
    })
}

async fn count_rows(response: Response) -> Result<usize> {
    let body = response.text().await?;
    if body.trim().is_empty() {
        return Ok(0);
    }
    let rows: Vec<serde_json::Value> = serde_json::from_str(&body)?;
    Ok(rows.len())
}
