use thiserror::Error;

use crate::schema::ValidationError;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Sequence conflict on thread {0}")]
    SequenceConflict(String),

    #[error("User directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PersistError {
    /// Upstream HTTP status, when the failure came back from the backend.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PersistError>;
