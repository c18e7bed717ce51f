use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Member,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Member => "member",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMember {
    pub user_id: String,
    pub email: Option<String>,
    pub role: MemberRole,
    pub created_at: Option<DateTime<Utc>>,
}

/// Result of promoting a thread to a shared workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceOutcome {
    pub thread_id: String,
    /// Emails that became members in this call.
    pub added_members: Vec<String>,
    /// Emails with no matching account.
    pub not_found: Vec<String>,
}
