//! Membership planning shared by every `ThreadStore` backend.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::debug;

use crate::error::Result;
use crate::models::{MemberRole, ThreadMember};
use crate::trait_client::UserDirectory;

/// Rows to write when promoting a thread to a workspace.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MembershipPlan {
    pub insert_owner: bool,
    /// `(user_id, email)` pairs to insert with the member role.
    pub new_members: Vec<(String, String)>,
    pub not_found: Vec<String>,
}

impl MembershipPlan {
    pub fn added_emails(&self) -> Vec<String> {
        self.new_members.iter().map(|(_, email)| email.clone()).collect()
    }
}

/// Resolve normalized `emails` and decide which rows are missing.
///
/// The owner and anyone already in `existing` are skipped silently. Emails
/// without an account end up in `not_found`.
pub async fn plan_membership(
    directory: &dyn UserDirectory,
    owner_id: &str,
    existing: &[String],
    emails: &[String],
) -> Result<MembershipPlan> {
    let mut plan = MembershipPlan {
        insert_owner: !existing.iter().any(|id| id == owner_id),
        ..MembershipPlan::default()
    };

    for email in emails {
        let Some(user_id) = directory.find_user_id_by_email(email).await? else {
            plan.not_found.push(email.clone());
            continue;
        };
        let already_member = user_id == owner_id
            || existing.contains(&user_id)
            || plan.new_members.iter().any(|(id, _)| *id == user_id);
        if already_member {
            debug!(user_id = %user_id, "skipping existing member");
            continue;
        }
        plan.new_members.push((user_id, email.clone()));
    }

    Ok(plan)
}

/// A membership row as stored, before email resolution.
#[derive(Debug, Clone)]
pub struct StoredMember {
    pub user_id: String,
    pub role: MemberRole,
    pub created_at: Option<DateTime<Utc>>,
}

/// Order members owner-first and attach emails where the directory knows them.
pub async fn assemble_members(
    directory: &dyn UserDirectory,
    owner_id: &str,
    thread_created_at: DateTime<Utc>,
    rows: Vec<StoredMember>,
) -> Vec<ThreadMember> {
    let owner_joined = rows
        .iter()
        .find(|row| row.user_id == owner_id)
        .and_then(|row| row.created_at)
        .unwrap_or(thread_created_at);

    let mut ordered = vec![StoredMember {
        user_id: owner_id.to_string(),
        role: MemberRole::Owner,
        created_at: Some(owner_joined),
    }];
    ordered.extend(rows.into_iter().filter(|row| row.user_id != owner_id).map(|row| StoredMember {
        role: MemberRole::Member,
        ..row
    }));

    let emails = join_all(ordered.iter().map(|member| async move {
        match directory.find_email_by_user_id(&member.user_id).await {
            Ok(email) => email,
            Err(err) => {
                debug!(user_id = %member.user_id, error = %err, "email lookup failed");
                None
            }
        }
    }))
    .await;

    ordered
        .into_iter()
        .zip(emails)
        .map(|(member, email)| ThreadMember {
            user_id: member.user_id,
            email,
            role: member.role,
            created_at: member.created_at,
        })
        .collect()
}
