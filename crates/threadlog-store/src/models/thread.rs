use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{MessageRow, NewMessage};
use crate::schema::{self, ValidationError};

/// A validated thread creation request: non-blank title plus zero or more
/// initial messages in the order they should be indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewThread {
    pub title: String,
    pub messages: Vec<NewMessage>,
}

impl NewThread {
    pub fn new(title: &str, messages: Vec<NewMessage>) -> Result<Self, ValidationError> {
        schema::require_text("title", title)?;
        Ok(Self {
            title: title.trim().to_string(),
            messages,
        })
    }
}

/// One entry of a thread listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub is_workspace: bool,
    pub message_count: u64,
    pub last_message_preview: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadDetail {
    pub id: String,
    pub title: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub is_workspace: bool,
    pub messages: Vec<MessageRow>,
}
