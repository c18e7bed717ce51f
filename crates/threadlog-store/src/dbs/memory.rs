//! In-process `ThreadStore` for tests and local development.
//!
//! Tokens are ignored; access is decided from the caller id alone. Appends
//! are serialized by the state mutex, so indices never collide.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{PersistError, Result};
use crate::models::{
    ExtensionFile, MemberRole, MessageRow, NewMessage, NewThread, ThreadDetail, ThreadMember, ThreadSummary,
    WorkspaceOutcome,
};
use crate::ordering::{next_indices, preview, Page};
use crate::schema::ValidationError;
use crate::trait_client::{FileCatalog, ThreadStore, UserDirectory};
use crate::workspace::{assemble_members, plan_membership, StoredMember};

#[derive(Debug, Clone)]
struct StoredThread {
    id: String,
    title: String,
    owner_id: String,
    created_at: DateTime<Utc>,
    is_workspace: bool,
    seq: u64,
}

#[derive(Default)]
struct MemoryState {
    threads: Vec<StoredThread>,
    messages: HashMap<String, Vec<MessageRow>>,
    members: HashMap<String, Vec<StoredMember>>,
    next_seq: u64,
}

impl MemoryState {
    fn visible_to(&self, thread: &StoredThread, caller_id: &str) -> bool {
        thread.owner_id == caller_id
            || self
                .members
                .get(&thread.id)
                .is_some_and(|rows| rows.iter().any(|row| row.user_id == caller_id))
    }

    fn find(&self, thread_id: &str) -> Option<&StoredThread> {
        self.threads.iter().find(|thread| thread.id == thread_id)
    }

    fn find_visible(&self, caller_id: &str, thread_id: &str) -> Option<&StoredThread> {
        self.find(thread_id).filter(|thread| self.visible_to(thread, caller_id))
    }

    fn append(&mut self, thread_id: &str, messages: Vec<NewMessage>, now: DateTime<Utc>) -> usize {
        let rows = self.messages.entry(thread_id.to_string()).or_default();
        let current_max = rows.iter().map(|row| row.index).max();
        let count = messages.len();
        rows.extend(
            next_indices(current_max, count)
                .zip(messages)
                .map(|(index, message)| MessageRow {
                    index,
                    role: message.role,
                    content: message.content,
                    created_at: now,
                }),
        );
        count
    }
}

pub struct MemoryThreadStore {
    state: Mutex<MemoryState>,
    directory: Arc<dyn UserDirectory>,
}

impl MemoryThreadStore {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            directory,
        }
    }
}

#[async_trait]
impl ThreadStore for MemoryThreadStore {
    async fn create_thread_with_messages(
        &self,
        owner_id: &str,
        thread: NewThread,
        _token: &str,
    ) -> Result<String> {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        let mut state = self.state.lock().await;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.threads.push(StoredThread {
            id: id.clone(),
            title: thread.title,
            owner_id: owner_id.to_string(),
            created_at: now,
            is_workspace: false,
            seq,
        });
        state.append(&id, thread.messages, now);

        Ok(id)
    }

    async fn list_threads_for_owner(
        &self,
        owner_id: &str,
        _token: &str,
        page: Page,
    ) -> Result<Vec<ThreadSummary>> {
        let state = self.state.lock().await;

        let mut visible: Vec<&StoredThread> = state
            .threads
            .iter()
            .filter(|thread| state.visible_to(thread, owner_id))
            .collect();
        visible.sort_by_key(|thread| (thread.created_at, thread.seq));

        let summaries = visible
            .into_iter()
            .map(|thread| {
                let messages = state.messages.get(&thread.id);
                let last = messages.and_then(|rows| rows.iter().max_by_key(|row| row.index));
                ThreadSummary {
                    id: thread.id.clone(),
                    title: thread.title.clone(),
                    created_at: thread.created_at,
                    is_workspace: thread.is_workspace,
                    message_count: messages.map_or(0, |rows| rows.len() as u64),
                    last_message_preview: last.and_then(|row| preview(&row.content)),
                }
            })
            .collect();

        Ok(page.slice(summaries))
    }

    async fn get_thread_detail(
        &self,
        caller_id: &str,
        thread_id: &str,
        _token: &str,
    ) -> Result<Option<ThreadDetail>> {
        let state = self.state.lock().await;
        let Some(thread) = state.find_visible(caller_id, thread_id) else {
            return Ok(None);
        };

        let mut messages = state.messages.get(thread_id).cloned().unwrap_or_default();
        messages.sort_by_key(|row| row.index);

        Ok(Some(ThreadDetail {
            id: thread.id.clone(),
            title: thread.title.clone(),
            owner_id: thread.owner_id.clone(),
            created_at: thread.created_at,
            is_workspace: thread.is_workspace,
            messages,
        }))
    }

    async fn delete_thread_by_id(&self, owner_id: &str, thread_id: &str, _token: &str) -> Result<u64> {
        let mut state = self.state.lock().await;
        let before = state.threads.len();
        state
            .threads
            .retain(|thread| !(thread.id == thread_id && thread.owner_id == owner_id));
        let deleted = (before - state.threads.len()) as u64;

        if deleted > 0 {
            state.messages.remove(thread_id);
            state.members.remove(thread_id);
        }
        Ok(deleted)
    }

    async fn list_thread_messages(
        &self,
        caller_id: &str,
        thread_id: &str,
        _token: &str,
        page: Page,
    ) -> Result<Option<Vec<MessageRow>>> {
        let state = self.state.lock().await;
        if state.find_visible(caller_id, thread_id).is_none() {
            return Ok(None);
        }

        let mut messages = state.messages.get(thread_id).cloned().unwrap_or_default();
        messages.sort_by_key(|row| row.index);
        Ok(Some(page.slice(messages)))
    }

    async fn add_messages_to_thread(
        &self,
        caller_id: &str,
        thread_id: &str,
        messages: Vec<NewMessage>,
        _token: &str,
    ) -> Result<Option<usize>> {
        if messages.is_empty() {
            return Err(ValidationError::new("messages", "must contain at least one message").into());
        }

        let mut state = self.state.lock().await;
        if state.find_visible(caller_id, thread_id).is_none() {
            return Ok(None);
        }
        Ok(Some(state.append(thread_id, messages, Utc::now())))
    }

    async fn convert_to_workspace(
        &self,
        owner_id: &str,
        thread_id: &str,
        emails: &[String],
        _token: &str,
    ) -> Result<Option<WorkspaceOutcome>> {
        let existing: Vec<String> = {
            let state = self.state.lock().await;
            match state.find(thread_id) {
                Some(thread) if thread.owner_id == owner_id => state
                    .members
                    .get(thread_id)
                    .map(|rows| rows.iter().map(|row| row.user_id.clone()).collect())
                    .unwrap_or_default(),
                _ => return Ok(None),
            }
        };

        // Directory lookups happen outside the lock.
        let plan = plan_membership(self.directory.as_ref(), owner_id, &existing, emails).await?;

        let mut state = self.state.lock().await;
        let now = Utc::now();
        let thread = state
            .threads
            .iter_mut()
            .find(|thread| thread.id == thread_id && thread.owner_id == owner_id)
            .ok_or_else(|| PersistError::Internal(format!("thread {thread_id} vanished during conversion")))?;
        thread.is_workspace = true;

        let rows = state.members.entry(thread_id.to_string()).or_default();
        if plan.insert_owner && !rows.iter().any(|row| row.user_id == owner_id) {
            rows.push(StoredMember {
                user_id: owner_id.to_string(),
                role: MemberRole::Owner,
                created_at: Some(now),
            });
        }
        // A concurrent conversion may have added some of these already.
        let mut added_members = Vec::with_capacity(plan.new_members.len());
        for (user_id, email) in plan.new_members {
            if rows.iter().any(|row| row.user_id == user_id) {
                continue;
            }
            rows.push(StoredMember {
                user_id,
                role: MemberRole::Member,
                created_at: Some(now),
            });
            added_members.push(email);
        }

        Ok(Some(WorkspaceOutcome {
            thread_id: thread_id.to_string(),
            added_members,
            not_found: plan.not_found,
        }))
    }

    async fn list_thread_members(
        &self,
        caller_id: &str,
        thread_id: &str,
        _token: &str,
    ) -> Result<Option<Vec<ThreadMember>>> {
        let (owner_id, created_at, rows) = {
            let state = self.state.lock().await;
            let Some(thread) = state.find_visible(caller_id, thread_id) else {
                return Ok(None);
            };
            (
                thread.owner_id.clone(),
                thread.created_at,
                state.members.get(thread_id).cloned().unwrap_or_default(),
            )
        };

        let members = assemble_members(self.directory.as_ref(), &owner_id, created_at, rows).await;
        Ok(Some(members))
    }
}

/// Fixed email/user-id table standing in for the auth provider's admin API.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDirectory {
    users: Vec<(String, String)>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user_id: impl Into<String>, email: impl Into<String>) -> Self {
        self.users.push((user_id.into(), email.into().to_lowercase()));
        self
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<String>> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .iter()
            .find(|(_, known)| *known == email)
            .map(|(id, _)| id.clone()))
    }

    async fn find_email_by_user_id(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self
            .users
            .iter()
            .find(|(id, _)| id == user_id)
            .map(|(_, email)| email.clone()))
    }
}

/// Fixed per-user file lists.
#[derive(Debug, Default, Clone)]
pub struct InMemoryFileCatalog {
    files: Vec<(String, ExtensionFile)>,
}

impl InMemoryFileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, user_id: impl Into<String>, file: ExtensionFile) -> Self {
        self.files.push((user_id.into(), file));
        self
    }
}

#[async_trait]
impl FileCatalog for InMemoryFileCatalog {
    async fn list_extension_files(&self, user_id: &str, _token: &str) -> Result<Vec<ExtensionFile>> {
        let mut files: Vec<ExtensionFile> = self
            .files
            .iter()
            .filter(|(owner, _)| owner == user_id)
            .map(|(_, file)| file.clone())
            .collect();
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::{SortOrder, MESSAGE_PAGE, THREAD_PAGE};

    fn store() -> MemoryThreadStore {
        let directory = InMemoryDirectory::new()
            .with_user("alice", "alice@example.com")
            .with_user("bob", "bob@example.com");
        MemoryThreadStore::new(Arc::new(directory))
    }

    fn msg(role: &str, content: &str) -> NewMessage {
        NewMessage::parse(role, content).unwrap()
    }

    #[tokio::test]
    async fn test_initial_messages_are_indexed_from_zero() {
        let store = store();
        let thread = NewThread::new("T", vec![msg("user", "hi"), msg("assistant", "hello")]).unwrap();
        let id = store.create_thread_with_messages("alice", thread, "tok").await.unwrap();

        let messages = store
            .list_thread_messages("alice", &id, "tok", Page::first(MESSAGE_PAGE))
            .await
            .unwrap()
            .unwrap();
        let indices: Vec<i64> = messages.iter().map(|m| m.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(messages[0].content, "hi");
    }

    #[tokio::test]
    async fn test_listing_is_scoped_and_previewed() {
        let store = store();
        let thread = NewThread::new("Mine", vec![msg("user", "x".repeat(70).as_str())]).unwrap();
        store.create_thread_with_messages("alice", thread, "tok").await.unwrap();
        let other = NewThread::new("Theirs", vec![]).unwrap();
        store.create_thread_with_messages("bob", other, "tok").await.unwrap();

        let listed = store
            .list_threads_for_owner("alice", "tok", Page::first(THREAD_PAGE))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Mine");
        assert_eq!(listed[0].message_count, 1);
        assert_eq!(listed[0].last_message_preview.as_ref().unwrap().len(), 50);
    }

    #[tokio::test]
    async fn test_listing_order_follows_creation() {
        let store = store();
        for title in ["first", "second", "third"] {
            let thread = NewThread::new(title, vec![]).unwrap();
            store.create_thread_with_messages("alice", thread, "tok").await.unwrap();
        }

        let newest_first = store
            .list_threads_for_owner("alice", "tok", Page::first(THREAD_PAGE))
            .await
            .unwrap();
        let titles: Vec<&str> = newest_first.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["third", "second", "first"]);

        let page = Page { limit: 1, offset: 1, order: SortOrder::Asc };
        let second = store.list_threads_for_owner("alice", "tok", page).await.unwrap();
        assert_eq!(second[0].title, "second");
    }

    #[tokio::test]
    async fn test_empty_append_is_rejected() {
        let store = store();
        let id = store
            .create_thread_with_messages("alice", NewThread::new("T", vec![]).unwrap(), "tok")
            .await
            .unwrap();
        let err = store.add_messages_to_thread("alice", &id, vec![], "tok").await.unwrap_err();
        assert!(matches!(err, PersistError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_by_non_owner_removes_nothing() {
        let store = store();
        let id = store
            .create_thread_with_messages("alice", NewThread::new("T", vec![]).unwrap(), "tok")
            .await
            .unwrap();

        assert_eq!(store.delete_thread_by_id("bob", &id, "tok").await.unwrap(), 0);
        assert_eq!(store.delete_thread_by_id("alice", &id, "tok").await.unwrap(), 1);
        assert!(store.get_thread_detail("alice", &id, "tok").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_repeated_conversion_reports_only_new_members() {
        let store = store();
        let id = store
            .create_thread_with_messages("alice", NewThread::new("T", vec![]).unwrap(), "tok")
            .await
            .unwrap();
        let emails = vec!["bob@example.com".to_string()];

        let first = store.convert_to_workspace("alice", &id, &emails, "tok").await.unwrap().unwrap();
        assert_eq!(first.added_members, emails);

        let second = store.convert_to_workspace("alice", &id, &emails, "tok").await.unwrap().unwrap();
        assert!(second.added_members.is_empty());
        let members = store.list_thread_members("alice", &id, "tok").await.unwrap().unwrap();
        assert_eq!(members.len(), 2);
    }

    #[tokio::test]
    async fn test_file_catalog_is_per_user_newest_first() {
        let file = |id: i64, day: u32| ExtensionFile {
            id,
            name: format!("file-{id}"),
            description: None,
            created_at: chrono::TimeZone::with_ymd_and_hms(&Utc, 2025, 11, day, 5, 0, 0).unwrap(),
        };
        let catalog = InMemoryFileCatalog::new()
            .with_file("alice", file(1, 1))
            .with_file("bob", file(2, 2))
            .with_file("alice", file(3, 3));

        let files = catalog.list_extension_files("alice", "tok").await.unwrap();
        let ids: Vec<i64> = files.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert!(catalog.list_extension_files("carol", "tok").await.unwrap().is_empty());
    }
}
