use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub markets_path: PathBuf,
    pub cycle_secret: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub catalog_base_url: String,
    pub catalog_request_timeout_secs: u64,
    pub catalog_user_agent: String,
    pub catalog_max_retries: u32,
    pub catalog_retry_backoff_base_ms: u64,
    pub textgen_base_url: String,
    pub textgen_api_key: Option<String>,
    pub imagegen_base_url: String,
    pub imagegen_api_key: Option<String>,
    pub genai_request_timeout_secs: u64,
    pub cycle_ceiling_secs: u64,
    pub cycle_turbo_ceiling_secs: u64,
    pub enrich_batch_limit: usize,
    pub enrich_turbo_batch_limit: usize,
    pub enrich_concurrency: usize,
    pub turbo_segment_limit: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("markets_path", &self.markets_path)
            .field("database_url", &"[redacted]")
            .field("cycle_secret", &self.cycle_secret.as_ref().map(|_| "[redacted]"))
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("catalog_base_url", &self.catalog_base_url)
            .field(
                "catalog_request_timeout_secs",
                &self.catalog_request_timeout_secs,
            )
            .field("catalog_user_agent", &self.catalog_user_agent)
            .field("catalog_max_retries", &self.catalog_max_retries)
            .field(
                "catalog_retry_backoff_base_ms",
                &self.catalog_retry_backoff_base_ms,
            )
            .field("textgen_base_url", &self.textgen_base_url)
            .field(
                "textgen_api_key",
                &self.textgen_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("imagegen_base_url", &self.imagegen_base_url)
            .field(
                "imagegen_api_key",
                &self.imagegen_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("genai_request_timeout_secs", &self.genai_request_timeout_secs)
            .field("cycle_ceiling_secs", &self.cycle_ceiling_secs)
            .field("cycle_turbo_ceiling_secs", &self.cycle_turbo_ceiling_secs)
            .field("enrich_batch_limit", &self.enrich_batch_limit)
            .field("enrich_turbo_batch_limit", &self.enrich_turbo_batch_limit)
            .field("enrich_concurrency", &self.enrich_concurrency)
            .field("turbo_segment_limit", &self.turbo_segment_limit)
            .finish()
    }
}
