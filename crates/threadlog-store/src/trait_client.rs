use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    ExtensionFile, MessageRow, NewMessage, NewThread, ThreadDetail, ThreadMember, ThreadSummary,
    WorkspaceOutcome,
};
use crate::ordering::Page;

/// Thread and message storage scoped to an authenticated caller.
///
/// Every operation receives the caller's access token so the backend can
/// enforce its own row-level policies. Operations returning `Option` use
/// `None` for both "does not exist" and "not visible to this caller".
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Create a thread owned by `owner_id` with its initial messages indexed from 0.
    async fn create_thread_with_messages(
        &self,
        owner_id: &str,
        thread: NewThread,
        token: &str,
    ) -> Result<String>;

    /// Threads the caller owns or is a member of.
    async fn list_threads_for_owner(
        &self,
        owner_id: &str,
        token: &str,
        page: Page,
    ) -> Result<Vec<ThreadSummary>>;

    async fn get_thread_detail(
        &self,
        caller_id: &str,
        thread_id: &str,
        token: &str,
    ) -> Result<Option<ThreadDetail>>;

    /// Delete an owned thread, returning how many rows were removed.
    async fn delete_thread_by_id(&self, owner_id: &str, thread_id: &str, token: &str) -> Result<u64>;

    async fn list_thread_messages(
        &self,
        caller_id: &str,
        thread_id: &str,
        token: &str,
        page: Page,
    ) -> Result<Option<Vec<MessageRow>>>;

    /// Append messages after the thread's current highest index.
    async fn add_messages_to_thread(
        &self,
        caller_id: &str,
        thread_id: &str,
        messages: Vec<NewMessage>,
        token: &str,
    ) -> Result<Option<usize>>;

    /// Mark an owned thread as a workspace and add members by email.
    async fn convert_to_workspace(
        &self,
        owner_id: &str,
        thread_id: &str,
        emails: &[String],
        token: &str,
    ) -> Result<Option<WorkspaceOutcome>>;

    /// Owner first, then members in join order.
    async fn list_thread_members(
        &self,
        caller_id: &str,
        thread_id: &str,
        token: &str,
    ) -> Result<Option<Vec<ThreadMember>>>;
}

/// Resolves accounts by email and back.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<String>>;

    async fn find_email_by_user_id(&self, user_id: &str) -> Result<Option<String>>;
}

/// Per-user file records uploaded outside this service.
#[async_trait]
pub trait FileCatalog: Send + Sync {
    /// The caller's files, newest first.
    async fn list_extension_files(&self, user_id: &str, token: &str) -> Result<Vec<ExtensionFile>>;
}
