use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::dbs::supabase::client::SupabaseRest;
use crate::dbs::supabase::query::{quoted, quoted_list, RestQuery};
use crate::dbs::supabase::rows::{
    AccessRow, IndexRow, MemberInsert, MemberRow, MembershipRow, MessageInsert, StoredMessageRow,
    SummaryRow, ThreadInsert, WorkspacePatch,
};
use crate::error::{PersistError, Result};
use crate::models::{
    MemberRole, MessageRow, NewMessage, NewThread, ThreadDetail, ThreadMember, ThreadSummary,
    WorkspaceOutcome,
};
use crate::ordering::{next_indices, Page, SortOrder};
use crate::schema::ValidationError;
use crate::trait_client::{ThreadStore, UserDirectory};
use crate::workspace::{assemble_members, plan_membership, StoredMember};

const THREADS: &str = "threads";
const MESSAGES: &str = "messages";
const MEMBERS: &str = "thread_members";

const SUMMARY_COLUMNS: &str =
    "id,title,created_at,is_workspace,messages(count),last:messages(content,created_at)";
const THREAD_COLUMNS: &str = "id,title,owner_id,created_at,is_workspace";
const MESSAGE_COLUMNS: &str = "index,role,content,created_at";

/// Attempts at appending a batch before giving up on index conflicts.
pub const APPEND_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Owner,
    Member,
}

/// `ThreadStore` backed by PostgREST tables.
///
/// The `messages` table is expected to hold a unique constraint on
/// `(thread_id, index)`; concurrent appends that race for the same indices
/// get a `409` and are retried from a fresh maximum.
pub struct SupabaseThreadStore {
    rest: SupabaseRest,
    directory: Arc<dyn UserDirectory>,
}

impl SupabaseThreadStore {
    pub fn new(rest: SupabaseRest, directory: Arc<dyn UserDirectory>) -> Self {
        Self { rest, directory }
    }

    /// Existence and visibility in one step: the owner-filtered lookup
    /// first, then (for member access) a membership check. A missing thread
    /// and a refused caller both come back as `None`.
    async fn authorize(
        &self,
        caller_id: &str,
        thread_id: &str,
        access: Access,
        token: &str,
    ) -> Result<Option<AccessRow>> {
        let owned = RestQuery::new()
            .select(THREAD_COLUMNS)
            .eq("id", thread_id)
            .eq("owner_id", caller_id)
            .limit(1);
        let rows: Vec<AccessRow> = self.rest.select(THREADS, &owned, token).await?;
        if let Some(row) = rows.into_iter().find(|row| row.owner_id == caller_id) {
            return Ok(Some(row));
        }
        if access == Access::Owner || !self.is_member(caller_id, thread_id, token).await? {
            return Ok(None);
        }

        let shared = RestQuery::new().select(THREAD_COLUMNS).eq("id", thread_id).limit(1);
        let rows: Vec<AccessRow> = self.rest.select(THREADS, &shared, token).await?;
        Ok(rows.into_iter().next())
    }

    /// Membership rows are optional; a missing or unexposed table means "no".
    async fn is_member(&self, user_id: &str, thread_id: &str, token: &str) -> Result<bool> {
        let query = RestQuery::new()
            .select("user_id")
            .eq("thread_id", thread_id)
            .eq("user_id", user_id)
            .limit(1);
        match self.rest.select::<MemberRow>(MEMBERS, &query, token).await {
            Ok(rows) => Ok(rows.iter().any(|row| row.user_id == user_id)),
            Err(err) if matches!(err.upstream_status(), Some(400 | 404)) => {
                debug!(status = ?err.upstream_status(), "membership table unavailable");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    async fn membership_thread_ids(&self, user_id: &str, token: &str) -> Result<Vec<String>> {
        let query = RestQuery::new().select("thread_id").eq("user_id", user_id);
        match self.rest.select::<MembershipRow>(MEMBERS, &query, token).await {
            Ok(rows) => Ok(rows.into_iter().map(|row| row.thread_id).collect()),
            Err(err) if err.upstream_status() == Some(404) => {
                debug!("membership table unavailable, listing owned threads only");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    async fn member_rows(&self, thread_id: &str, token: &str) -> Result<Vec<StoredMember>> {
        let query = RestQuery::new()
            .select("user_id,role,created_at")
            .eq("thread_id", thread_id)
            .order("created_at", SortOrder::Asc);
        match self.rest.select::<MemberRow>(MEMBERS, &query, token).await {
            Ok(rows) => Ok(rows.into_iter().map(StoredMember::from).collect()),
            Err(err) if matches!(err.upstream_status(), Some(400 | 404)) => {
                debug!(thread_id, "membership table unavailable, owner only");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    async fn max_index(&self, thread_id: &str, token: &str) -> Result<Option<i64>> {
        let query = RestQuery::new()
            .select("index")
            .eq("thread_id", thread_id)
            .order("index", SortOrder::Desc)
            .limit(1);
        let rows: Vec<IndexRow> = self.rest.select(MESSAGES, &query, token).await?;
        Ok(rows.first().map(|row| row.index))
    }

    async fn insert_batch(
        &self,
        thread_id: &str,
        current_max: Option<i64>,
        messages: &[NewMessage],
        token: &str,
    ) -> Result<usize> {
        let now = Utc::now();
        let rows: Vec<MessageInsert<'_>> = next_indices(current_max, messages.len())
            .zip(messages)
            .map(|(index, message)| MessageInsert {
                thread_id,
                index,
                role: message.role,
                content: &message.content,
                created_at: now,
            })
            .collect();
        self.rest.insert(MESSAGES, &rows, token).await
    }
}

#[async_trait]
impl ThreadStore for SupabaseThreadStore {
    async fn create_thread_with_messages(
        &self,
        owner_id: &str,
        thread: NewThread,
        token: &str,
    ) -> Result<String> {
        let thread_id = Uuid::new_v4().to_string();
        let row = ThreadInsert {
            id: &thread_id,
            title: &thread.title,
            owner_id,
            created_at: Utc::now(),
            is_workspace: false,
        };
        self.rest.insert(THREADS, &[row], token).await?;

        if !thread.messages.is_empty() {
            if let Err(err) = self.insert_batch(&thread_id, None, &thread.messages, token).await {
                warn!(thread_id = %thread_id, error = %err, "message insert failed, removing thread");
                let cleanup = RestQuery::new().eq("id", &thread_id).eq("owner_id", owner_id);
                if let Err(cleanup_err) = self.rest.delete(THREADS, &cleanup, token).await {
                    error!(thread_id = %thread_id, error = %cleanup_err, "failed to remove partial thread");
                }
                return Err(err);
            }
        }

        info!(thread_id = %thread_id, messages = thread.messages.len(), "thread created");
        Ok(thread_id)
    }

    async fn list_threads_for_owner(
        &self,
        owner_id: &str,
        token: &str,
        page: Page,
    ) -> Result<Vec<ThreadSummary>> {
        let member_of = self.membership_thread_ids(owner_id, token).await?;

        let query = RestQuery::new().select(SUMMARY_COLUMNS);
        let query = if member_of.is_empty() {
            query.eq("owner_id", owner_id)
        } else {
            query.or(&[
                format!("owner_id.eq.{}", quoted(owner_id)),
                format!("id.in.{}", quoted_list(&member_of)),
            ])
        };
        let query = query
            .order("created_at", page.order)
            .limit(page.limit)
            .offset(page.offset)
            .embedded_order("last", "index", SortOrder::Desc)
            .embedded_limit("last", 1);

        let rows: Vec<SummaryRow> = self.rest.select(THREADS, &query, token).await?;
        Ok(rows.into_iter().map(ThreadSummary::from).collect())
    }

    async fn get_thread_detail(
        &self,
        caller_id: &str,
        thread_id: &str,
        token: &str,
    ) -> Result<Option<ThreadDetail>> {
        let Some(thread) = self.authorize(caller_id, thread_id, Access::Member, token).await? else {
            return Ok(None);
        };

        let query = RestQuery::new()
            .select(MESSAGE_COLUMNS)
            .eq("thread_id", thread_id)
            .order("index", SortOrder::Asc);
        let rows: Vec<StoredMessageRow> = self.rest.select(MESSAGES, &query, token).await?;

        Ok(Some(ThreadDetail {
            id: thread.id,
            title: thread.title,
            owner_id: thread.owner_id,
            created_at: thread.created_at,
            is_workspace: thread.is_workspace.unwrap_or(false),
            messages: rows.into_iter().map(MessageRow::from).collect(),
        }))
    }

    async fn delete_thread_by_id(&self, owner_id: &str, thread_id: &str, token: &str) -> Result<u64> {
        let query = RestQuery::new().eq("id", thread_id).eq("owner_id", owner_id);
        let deleted = self.rest.delete(THREADS, &query, token).await?;
        debug!(thread_id, deleted, "delete thread");
        Ok(deleted as u64)
    }

    async fn list_thread_messages(
        &self,
        caller_id: &str,
        thread_id: &str,
        token: &str,
        page: Page,
    ) -> Result<Option<Vec<MessageRow>>> {
        if self.authorize(caller_id, thread_id, Access::Member, token).await?.is_none() {
            return Ok(None);
        }

        let query = RestQuery::new()
            .select(MESSAGE_COLUMNS)
            .eq("thread_id", thread_id)
            .order("index", page.order)
            .limit(page.limit)
            .offset(page.offset);
        let rows: Vec<StoredMessageRow> = self.rest.select(MESSAGES, &query, token).await?;
        Ok(Some(rows.into_iter().map(MessageRow::from).collect()))
    }

    async fn add_messages_to_thread(
        &self,
        caller_id: &str,
        thread_id: &str,
        messages: Vec<NewMessage>,
        token: &str,
    ) -> Result<Option<usize>> {
        if messages.is_empty() {
            return Err(ValidationError::new("messages", "must contain at least one message").into());
        }
        if self.authorize(caller_id, thread_id, Access::Member, token).await?.is_none() {
            return Ok(None);
        }

        for attempt in 1..=APPEND_ATTEMPTS {
            let current_max = self.max_index(thread_id, token).await?;
            match self.insert_batch(thread_id, current_max, &messages, token).await {
                Ok(_) => return Ok(Some(messages.len())),
                Err(err) if err.upstream_status() == Some(409) => {
                    warn!(thread_id, attempt, "index conflict while appending, retrying");
                }
                Err(err) => return Err(err),
            }
        }

        Err(PersistError::SequenceConflict(thread_id.to_string()))
    }

    async fn convert_to_workspace(
        &self,
        owner_id: &str,
        thread_id: &str,
        emails: &[String],
        token: &str,
    ) -> Result<Option<WorkspaceOutcome>> {
        if self.authorize(owner_id, thread_id, Access::Owner, token).await?.is_none() {
            return Ok(None);
        }

        let existing: Vec<String> = self
            .member_rows(thread_id, token)
            .await?
            .into_iter()
            .map(|row| row.user_id)
            .collect();
        let plan = plan_membership(self.directory.as_ref(), owner_id, &existing, emails).await?;

        let mut rows = Vec::with_capacity(plan.new_members.len() + 1);
        if plan.insert_owner {
            rows.push(MemberInsert {
                thread_id,
                user_id: owner_id,
                role: MemberRole::Owner,
            });
        }
        rows.extend(plan.new_members.iter().map(|(user_id, _)| MemberInsert {
            thread_id,
            user_id,
            role: MemberRole::Member,
        }));
        if !rows.is_empty() {
            self.rest.insert(MEMBERS, &rows, token).await?;
        }

        let query = RestQuery::new().eq("id", thread_id).eq("owner_id", owner_id);
        self.rest
            .update(THREADS, &query, &WorkspacePatch { is_workspace: true }, token)
            .await?;

        info!(
            thread_id,
            added = plan.new_members.len(),
            not_found = plan.not_found.len(),
            "thread converted to workspace"
        );
        Ok(Some(WorkspaceOutcome {
            thread_id: thread_id.to_string(),
            added_members: plan.added_emails(),
            not_found: plan.not_found,
        }))
    }

    async fn list_thread_members(
        &self,
        caller_id: &str,
        thread_id: &str,
        token: &str,
    ) -> Result<Option<Vec<ThreadMember>>> {
        let Some(thread) = self.authorize(caller_id, thread_id, Access::Member, token).await? else {
            return Ok(None);
        };
        let rows = self.member_rows(thread_id, token).await?;
        let members =
            assemble_members(self.directory.as_ref(), &thread.owner_id, thread.created_at, rows).await;
        Ok(Some(members))
    }
}
