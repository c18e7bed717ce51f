use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use threadlog_auth::AppEnv;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cookie: CookieConfig,
    #[serde(default)]
    pub supabase: SupabaseConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub app_env: AppEnv,

    // Secrets (from ENV only)
    #[serde(default)]
    pub supabase_url: String,
    #[serde(default)]
    pub supabase_anon_key: String,
    #[serde(default)]
    pub supabase_service_role_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    #[serde(default = "default_cookie_domain")]
    pub domain: String,
    /// Read the access token from a cookie when no Authorization header is sent.
    #[serde(default)]
    pub access_cookie_fallback: bool,
    #[serde(default = "default_access_cookie_name")]
    pub access_cookie_name: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            domain: default_cookie_domain(),
            access_cookie_fallback: false,
            access_cookie_name: default_access_cookie_name(),
        }
    }
}

fn default_cookie_domain() -> String {
    "localhost".to_string()
}

fn default_access_cookie_name() -> String {
    "sb-access".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_verify_timeout")]
    pub verify_timeout_secs: u64,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_upstream_timeout(),
            verify_timeout_secs: default_verify_timeout(),
        }
    }
}

fn default_upstream_timeout() -> u64 {
    15
}

fn default_verify_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Supabase,
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{APP_ENV}.toml
    /// 3. THREADLOG_<SECTION>__<KEY> environment variables
    /// 4. Named overrides (SERVER_PORT, STORE_BACKEND, COOKIE_DOMAIN, ...)
    pub fn load() -> Result<Self, ConfigError> {
        let app_env: AppEnv = match std::env::var("APP_ENV") {
            Ok(raw) => raw.parse().map_err(ConfigError::Message)?,
            Err(_) => AppEnv::default(),
        };

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{app_env}")).required(false))
            .add_source(
                Environment::with_prefix("THREADLOG")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("store.backend", std::env::var("STORE_BACKEND").ok())?;

        let config = builder.build()?;

        let mut cfg: Config = config.try_deserialize()?;
        cfg.app_env = app_env;

        // Load secrets from ENV (not in TOML)
        cfg.supabase_url = std::env::var("SUPABASE_URL")
            .map_err(|_| ConfigError::Message("SUPABASE_URL environment variable is required".to_string()))?
            .trim_end_matches('/')
            .to_string();
        cfg.supabase_anon_key = std::env::var("SUPABASE_ANON_KEY")
            .map_err(|_| ConfigError::Message("SUPABASE_ANON_KEY environment variable is required".to_string()))?;
        cfg.supabase_service_role_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        if let Ok(domain) = std::env::var("COOKIE_DOMAIN") {
            cfg.cookie.domain = domain;
        }
        if let Ok(fallback) = std::env::var("COOKIE_ACCESS_FALLBACK") {
            cfg.cookie.access_cookie_fallback = fallback.to_lowercase() == "true" || fallback == "1";
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            cfg.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            cfg.logging.format = format;
        }
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            cfg.cors.origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Ok(timeout) = std::env::var("SUPABASE_TIMEOUT_SECS") {
            cfg.supabase.timeout_secs = timeout
                .parse()
                .map_err(|_| ConfigError::Message("SUPABASE_TIMEOUT_SECS must be an integer".to_string()))?;
        }

        Ok(cfg)
    }

    /// Cookie name consulted for the access token, when the fallback is on.
    pub fn access_cookie(&self) -> Option<&str> {
        self.cookie
            .access_cookie_fallback
            .then_some(self.cookie.access_cookie_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_structure() {
        let toml_str = r#"
            [server]
            host = "0.0.0.0"
            port = 8000

            [cors]
            enabled = true
            origins = ["http://localhost:3000"]

            [logging]
            level = "info"
            format = "json"

            [store]
            backend = "memory"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.request_timeout_secs, 60);
        assert_eq!(config.cookie.domain, "localhost");
        assert_eq!(config.cookie.access_cookie_name, "sb-access");
        assert_eq!(config.supabase.timeout_secs, 15);
        assert_eq!(config.supabase.verify_timeout_secs, 10);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.app_env, AppEnv::Local);
        assert_eq!(config.access_cookie(), None);
    }
}
