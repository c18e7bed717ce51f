use std::{sync::Arc, time::Duration};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use threadlog_api::{
    build_router,
    config::{Config, StoreBackend},
    state::AppState,
};
use threadlog_auth::{AuthSettings, SupabaseAuth};
use threadlog_store::{
    FileCatalog, InMemoryFileCatalog, MemoryThreadStore, SupabaseAdminDirectory,
    SupabaseFileCatalog, SupabaseRest, SupabaseThreadStore, ThreadStore, UserDirectory,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting threadlog API server ({})", config.app_env);
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    let http = reqwest::Client::builder()
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
    let upstream_timeout = Duration::from_secs(config.supabase.timeout_secs);

    let auth = Arc::new(SupabaseAuth::new(
        http.clone(),
        AuthSettings {
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
            service_key: config.supabase_service_role_key.clone(),
            timeout: upstream_timeout,
            verify_timeout: Duration::from_secs(config.supabase.verify_timeout_secs),
        },
    ));

    if config.supabase_service_role_key.is_none() {
        tracing::warn!("SUPABASE_SERVICE_ROLE_KEY not set; workspace invites and profile rows are disabled");
    }
    let directory: Arc<dyn UserDirectory> = Arc::new(SupabaseAdminDirectory::new(
        http.clone(),
        &config.supabase_url,
        config.supabase_service_role_key.clone(),
        upstream_timeout,
    ));

    let (store, files): (Arc<dyn ThreadStore>, Arc<dyn FileCatalog>) = match config.store.backend {
        StoreBackend::Supabase => {
            tracing::info!("Using Supabase thread store at {}", config.supabase_url);
            let rest = SupabaseRest::new(
                http.clone(),
                &config.supabase_url,
                config.supabase_anon_key.clone(),
                upstream_timeout,
            );
            (
                Arc::new(SupabaseThreadStore::new(rest.clone(), directory)),
                Arc::new(SupabaseFileCatalog::new(rest)),
            )
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory thread store; data is lost on restart");
            (
                Arc::new(MemoryThreadStore::new(directory)),
                Arc::new(InMemoryFileCatalog::new()),
            )
        }
    };

    let state = Arc::new(AppState::new(config.clone(), store, files, auth));
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("API docs: http://{}/api/docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
