use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing or malformed Authorization header")]
    MissingToken,

    #[error("Empty bearer token")]
    EmptyToken,

    #[error("Invalid or expired access token")]
    InvalidToken,

    #[error("Token payload has no user id")]
    InvalidPayload,

    #[error("Refresh token missing or rejected")]
    InvalidRefreshToken,

    #[error("Token exchange failed: {0}")]
    ExchangeFailed(String),

    /// Non-success reply from the auth provider, relayed as-is.
    #[error("Auth provider returned {status}")]
    Upstream { status: u16, body: Value },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Auth configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Stable machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "MISSING_ACCESS_TOKEN",
            Self::EmptyToken => "EMPTY_ACCESS_TOKEN",
            Self::InvalidToken => "INVALID_ACCESS_TOKEN",
            Self::InvalidPayload => "INVALID_TOKEN_PAYLOAD",
            Self::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            Self::ExchangeFailed(_) => "SUPABASE_EXCHANGE_FAILED",
            Self::Upstream { .. } => "UPSTREAM_ERROR",
            Self::Http(_) => "UPSTREAM_UNAVAILABLE",
            Self::Config(_) => "AUTH_CONFIG_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
