use async_trait::async_trait;
use tracing::debug;

use crate::dbs::supabase::client::SupabaseRest;
use crate::dbs::supabase::query::RestQuery;
use crate::dbs::supabase::rows::ExtensionFileRow;
use crate::error::Result;
use crate::models::ExtensionFile;
use crate::ordering::SortOrder;
use crate::trait_client::FileCatalog;

const EXTENSION_FILES: &str = "extension_files";

/// `FileCatalog` over the `extension_files` table. A missing table reads as
/// an empty catalog.
#[derive(Clone)]
pub struct SupabaseFileCatalog {
    rest: SupabaseRest,
}

impl SupabaseFileCatalog {
    pub fn new(rest: SupabaseRest) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl FileCatalog for SupabaseFileCatalog {
    async fn list_extension_files(&self, user_id: &str, token: &str) -> Result<Vec<ExtensionFile>> {
        let query = RestQuery::new()
            .eq("user_id", user_id)
            .select("id,name,description,created_at")
            .order("created_at", SortOrder::Desc);

        match self.rest.select::<ExtensionFileRow>(EXTENSION_FILES, &query, token).await {
            Ok(rows) => Ok(rows.into_iter().map(ExtensionFile::from).collect()),
            Err(err) if err.upstream_status() == Some(404) => {
                debug!("extension_files table unavailable");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }
}
