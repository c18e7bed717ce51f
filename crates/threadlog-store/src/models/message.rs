use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::{self, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Stored rows predating role validation fall back to `assistant`.
    pub fn from_stored(raw: Option<&str>) -> Self {
        match raw {
            Some(value) if value.eq_ignore_ascii_case("user") => Self::User,
            _ => Self::Assistant,
        }
    }
}

/// A validated message ready to be appended to a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub role: MessageRole,
    pub content: String,
}

impl NewMessage {
    pub fn parse(role: &str, content: &str) -> Result<Self, ValidationError> {
        let role = schema::parse_role(role)?;
        schema::require_text("content", content)?;
        Ok(Self {
            role,
            content: content.trim().to_string(),
        })
    }
}

/// A message as read back from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRow {
    pub index: i64,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
