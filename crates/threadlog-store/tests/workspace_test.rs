use std::sync::Arc;

use anyhow::Result;
use threadlog_store::{
    InMemoryDirectory, MemberRole, MemoryThreadStore, NewMessage, NewThread, Page, ThreadStore,
    MESSAGE_PAGE, THREAD_PAGE,
};

fn store() -> MemoryThreadStore {
    let directory = InMemoryDirectory::new()
        .with_user("alice", "alice@example.com")
        .with_user("bob", "bob@example.com")
        .with_user("carol", "carol@example.com");
    MemoryThreadStore::new(Arc::new(directory))
}

async fn seeded(store: &MemoryThreadStore) -> Result<String> {
    let thread = NewThread::new("Shared", vec![NewMessage::parse("user", "hi")?])?;
    Ok(store.create_thread_with_messages("alice", thread, "tok").await?)
}

#[tokio::test]
async fn test_convert_adds_members_and_reports_unknown() -> Result<()> {
    let store = store();
    let id = seeded(&store).await?;

    let emails = vec![
        "bob@example.com".to_string(),
        "alice@example.com".to_string(),
        "nobody@example.com".to_string(),
    ];
    let outcome = store
        .convert_to_workspace("alice", &id, &emails, "tok")
        .await?
        .expect("owner can convert");
    assert_eq!(outcome.added_members, vec!["bob@example.com"]);
    assert_eq!(outcome.not_found, vec!["nobody@example.com"]);

    // A second conversion with the same email adds nobody.
    let again = store
        .convert_to_workspace("alice", &id, &["bob@example.com".to_string()], "tok")
        .await?
        .unwrap();
    assert!(again.added_members.is_empty());

    let members = store.list_thread_members("bob", &id, "tok").await?.unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].user_id, "alice");
    assert_eq!(members[0].role, MemberRole::Owner);
    assert_eq!(members[0].email.as_deref(), Some("alice@example.com"));
    assert_eq!(members[1].user_id, "bob");
    assert_eq!(members[1].role, MemberRole::Member);
    Ok(())
}

#[tokio::test]
async fn test_members_can_read_and_append_but_not_delete() -> Result<()> {
    let store = store();
    let id = seeded(&store).await?;
    store
        .convert_to_workspace("alice", &id, &["bob@example.com".to_string()], "tok")
        .await?;

    let detail = store.get_thread_detail("bob", &id, "tok").await?.unwrap();
    assert!(detail.is_workspace);
    assert_eq!(detail.owner_id, "alice");

    let added = store
        .add_messages_to_thread("bob", &id, vec![NewMessage::parse("assistant", "from bob")?], "tok")
        .await?;
    assert_eq!(added, Some(1));

    let messages = store
        .list_thread_messages("alice", &id, "tok", Page::first(MESSAGE_PAGE))
        .await?
        .unwrap();
    let indices: Vec<i64> = messages.iter().map(|m| m.index).collect();
    assert_eq!(indices, vec![0, 1]);

    let listed = store.list_threads_for_owner("bob", "tok", Page::first(THREAD_PAGE)).await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].last_message_preview.as_deref(), Some("from bob"));

    assert_eq!(store.delete_thread_by_id("bob", &id, "tok").await?, 0);
    assert!(store
        .convert_to_workspace("bob", &id, &["carol@example.com".to_string()], "tok")
        .await?
        .is_none());
    Ok(())
}

#[tokio::test]
async fn test_outsiders_see_nothing() -> Result<()> {
    let store = store();
    let id = seeded(&store).await?;

    assert!(store.get_thread_detail("carol", &id, "tok").await?.is_none());
    assert!(store.list_thread_members("carol", &id, "tok").await?.is_none());
    assert!(store
        .list_threads_for_owner("carol", "tok", Page::first(THREAD_PAGE))
        .await?
        .is_empty());
    Ok(())
}
