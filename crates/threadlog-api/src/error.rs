use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use threadlog_auth::AuthError;
use threadlog_store::{PersistError, ValidationError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Storage error ({code}): {source}")]
    Store {
        code: &'static str,
        source: PersistError,
    },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Map a store failure to the given error code, keeping validation
    /// failures as 422.
    pub fn store(code: &'static str) -> impl FnOnce(PersistError) -> ApiError {
        move |err| match err {
            PersistError::Validation(e) => ApiError::Validation(e.to_string()),
            source => ApiError::Store { code, source },
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

fn detail(code: &str, message: impl Into<String>) -> Value {
    json!({ "detail": { "code": code, "message": message.into() } })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Auth(AuthError::Upstream { status, body }) => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                (status, json!({ "detail": body }))
            }
            ApiError::Auth(ref err @ AuthError::ExchangeFailed(_)) => {
                tracing::warn!("Token exchange failed: {}", err);
                (StatusCode::BAD_GATEWAY, detail(err.code(), err.to_string()))
            }
            ApiError::Auth(ref err @ AuthError::Http(_)) => {
                tracing::error!("Auth provider unreachable: {}", err);
                (StatusCode::BAD_GATEWAY, detail(err.code(), "Auth provider unavailable"))
            }
            ApiError::Auth(ref err @ AuthError::Config(_)) => {
                tracing::error!("Auth config error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, detail(err.code(), "Configuration error"))
            }
            ApiError::Auth(ref err) => (StatusCode::UNAUTHORIZED, detail(err.code(), err.to_string())),
            ApiError::Validation(ref msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, detail("VALIDATION_ERROR", msg.clone()))
            }
            ApiError::ThreadNotFound(_) => {
                (StatusCode::NOT_FOUND, detail("NOT_FOUND", "Thread not found"))
            }
            ApiError::Store { code, ref source } => {
                tracing::error!(code, "Storage error: {}", source);
                (StatusCode::INTERNAL_SERVER_ERROR, detail(code, source.to_string()))
            }
            ApiError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, detail("INTERNAL_ERROR", "Internal server error"))
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Auth(AuthError::MissingToken), StatusCode::UNAUTHORIZED),
            (ApiError::Auth(AuthError::InvalidRefreshToken), StatusCode::UNAUTHORIZED),
            (ApiError::Auth(AuthError::ExchangeFailed("x".into())), StatusCode::BAD_GATEWAY),
            (
                ApiError::Auth(AuthError::Upstream { status: 400, body: json!({}) }),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::Validation("bad".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (ApiError::ThreadNotFound("t".into()), StatusCode::NOT_FOUND),
            (
                ApiError::store("DB_QUERY_FAILED")(PersistError::Internal("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::store("DB_INSERT_FAILED")(PersistError::Validation(ValidationError::new(
                    "messages", "empty",
                ))),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
