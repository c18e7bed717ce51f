pub mod admin;
pub mod client;
pub mod files;
pub mod query;
pub mod rows;
pub mod store;

pub use admin::SupabaseAdminDirectory;
pub use client::SupabaseRest;
pub use files::SupabaseFileCatalog;
pub use query::RestQuery;
pub use store::SupabaseThreadStore;
