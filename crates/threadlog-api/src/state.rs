use std::sync::Arc;

use threadlog_auth::{CookiePolicy, SupabaseAuth, TokenVerifier};
use threadlog_store::{FileCatalog, ThreadStore};

use crate::config::Config;

/// Shared application state passed to all handlers
///
/// Built once in `main`; the store and the auth client share one
/// `reqwest::Client`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn ThreadStore>,
    pub files: Arc<dyn FileCatalog>,
    pub auth: Arc<SupabaseAuth>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub cookies: CookiePolicy,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn ThreadStore>,
        files: Arc<dyn FileCatalog>,
        auth: Arc<SupabaseAuth>,
    ) -> Self {
        let cookies = CookiePolicy::from_env(config.app_env, config.cookie.domain.clone());
        Self {
            config: Arc::new(config),
            store,
            files,
            verifier: auth.clone(),
            auth,
            cookies,
        }
    }
}
