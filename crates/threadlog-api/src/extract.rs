use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{
        header::{AUTHORIZATION, COOKIE, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue,
    },
    Json,
};
use serde::de::DeserializeOwned;
use threadlog_auth::{resolve_access_token, Identity};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

fn header_str<'a>(headers: &'a HeaderMap, name: &axum::http::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Authenticated caller, resolved from the bearer token (or the access
/// cookie when that fallback is enabled) through the auth provider.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity: Identity,
    pub access_token: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let access_token = resolve_access_token(
            header_str(&parts.headers, &AUTHORIZATION),
            header_str(&parts.headers, &COOKIE),
            state.config.access_cookie(),
        )?;
        let identity = state.verifier.verify(&access_token).await?;
        tracing::debug!(user_id = %identity.id, "caller authenticated");

        Ok(Self {
            identity,
            access_token,
        })
    }
}

/// JSON body whose rejections surface as 422 validation errors.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Raw `Cookie` header value, if any.
pub fn cookie_header(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, &COOKIE)
}

pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, &AUTHORIZATION)
}

/// Header map carrying one `Set-Cookie` per entry.
pub fn set_cookie_headers<I>(cookies: I) -> ApiResult<HeaderMap>
where
    I: IntoIterator<Item = String>,
{
    let mut headers = HeaderMap::new();
    for cookie in cookies {
        let value = HeaderValue::from_str(&cookie)
            .map_err(|_| ApiError::Internal("refresh cookie is not a valid header value".to_string()))?;
        headers.append(SET_COOKIE, value);
    }
    Ok(headers)
}
