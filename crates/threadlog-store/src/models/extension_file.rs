use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file record uploaded through the browser extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionFile {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
