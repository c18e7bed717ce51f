//! Wire shapes of the `threads`, `messages`, `thread_members` and
//! `extension_files` tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ExtensionFile, MemberRole, MessageRole, MessageRow, ThreadSummary};
use crate::ordering::preview;
use crate::timestamp;
use crate::workspace::StoredMember;

#[derive(Debug, Serialize)]
pub struct ThreadInsert<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub owner_id: &'a str,
    pub created_at: DateTime<Utc>,
    pub is_workspace: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageInsert<'a> {
    pub thread_id: &'a str,
    pub index: i64,
    pub role: MessageRole,
    pub content: &'a str,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MemberInsert<'a> {
    pub thread_id: &'a str,
    pub user_id: &'a str,
    pub role: MemberRole,
}

#[derive(Debug, Serialize)]
pub struct WorkspacePatch {
    pub is_workspace: bool,
}

#[derive(Debug, Deserialize)]
pub struct CountRow {
    pub count: u64,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRow {
    #[serde(default)]
    pub content: Option<String>,
}

/// `threads` row with `messages(count)` and the aliased `last:messages(...)` embed.
#[derive(Debug, Deserialize)]
pub struct SummaryRow {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_workspace: Option<bool>,
    #[serde(default)]
    pub messages: Vec<CountRow>,
    #[serde(default)]
    pub last: Vec<PreviewRow>,
}

impl From<SummaryRow> for ThreadSummary {
    fn from(row: SummaryRow) -> Self {
        let last_message_preview = row
            .last
            .into_iter()
            .next()
            .and_then(|last| last.content)
            .and_then(|content| preview(&content));
        Self {
            id: row.id,
            title: row.title,
            created_at: row.created_at,
            is_workspace: row.is_workspace.unwrap_or(false),
            message_count: row.messages.first().map_or(0, |c| c.count),
            last_message_preview,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MemberRow {
    pub user_id: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<MemberRow> for StoredMember {
    fn from(row: MemberRow) -> Self {
        let role = match row.role.as_deref() {
            Some("owner") => MemberRole::Owner,
            _ => MemberRole::Member,
        };
        Self {
            user_id: row.user_id,
            role,
            created_at: row.created_at,
        }
    }
}

/// `threads` row returned by the authorized lookup.
#[derive(Debug, Deserialize)]
pub struct AccessRow {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub owner_id: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_workspace: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct StoredMessageRow {
    pub index: i64,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

impl From<StoredMessageRow> for MessageRow {
    fn from(row: StoredMessageRow) -> Self {
        Self {
            index: row.index,
            role: MessageRole::from_stored(row.role.as_deref()),
            content: row.content.unwrap_or_default(),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IndexRow {
    pub index: i64,
}

#[derive(Debug, Deserialize)]
pub struct MembershipRow {
    pub thread_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ExtensionFileRow {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

impl From<ExtensionFileRow> for ExtensionFile {
    fn from(row: ExtensionFileRow) -> Self {
        Self {
            id: row.id,
            name: row.name.unwrap_or_default(),
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_row_maps_count_and_preview() {
        let row: SummaryRow = serde_json::from_value(json!({
            "id": "t1",
            "title": "Hello",
            "created_at": "2024-05-01T10:00:00+00:00",
            "messages": [{"count": 3}],
            "last": [{"content": "latest message", "created_at": "2024-05-01T10:05:00+00:00"}]
        }))
        .unwrap();

        let summary = ThreadSummary::from(row);
        assert_eq!(summary.message_count, 3);
        assert_eq!(summary.last_message_preview.as_deref(), Some("latest message"));
        assert!(!summary.is_workspace);
    }

    #[test]
    fn test_summary_row_without_messages() {
        let row: SummaryRow = serde_json::from_value(json!({
            "id": "t1",
            "title": "Empty",
            "created_at": "2024-05-01T10:00:00",
            "is_workspace": null,
            "messages": [{"count": 0}],
            "last": []
        }))
        .unwrap();

        let summary = ThreadSummary::from(row);
        assert_eq!(summary.message_count, 0);
        assert_eq!(summary.last_message_preview, None);
    }

    #[test]
    fn test_message_insert_serializes_lowercase_role() {
        let now = Utc::now();
        let value = serde_json::to_value(MessageInsert {
            thread_id: "t1",
            index: 4,
            role: MessageRole::Assistant,
            content: "ok",
            created_at: now,
        })
        .unwrap();
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["index"], 4);
    }

    #[test]
    fn test_extension_file_row_defaults_missing_name() {
        let row: ExtensionFileRow = serde_json::from_value(json!({
            "id": 7,
            "name": null,
            "created_at": "2025-11-26T05:00:00"
        }))
        .unwrap();

        let file = ExtensionFile::from(row);
        assert_eq!(file.id, 7);
        assert_eq!(file.name, "");
        assert_eq!(file.description, None);
    }
}
