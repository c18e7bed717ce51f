pub mod dbs;
pub mod error;
pub mod models;
pub mod ordering;
pub mod schema;
pub mod timestamp;
pub mod trait_client;
pub mod workspace;

pub use dbs::memory::{InMemoryDirectory, InMemoryFileCatalog, MemoryThreadStore};
pub use dbs::supabase::{
    SupabaseAdminDirectory, SupabaseFileCatalog, SupabaseRest, SupabaseThreadStore,
};
pub use error::{PersistError, Result};
pub use models::{
    ExtensionFile, MemberRole, MessageRole, MessageRow, NewMessage, NewThread, ThreadDetail, ThreadMember,
    ThreadSummary, WorkspaceOutcome,
};
pub use ordering::{next_indices, preview, Page, PageBounds, SortOrder, MESSAGE_PAGE, THREAD_PAGE};
pub use schema::ValidationError;
pub use trait_client::{FileCatalog, ThreadStore, UserDirectory};
