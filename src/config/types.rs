use serde::Deserialize;

/// Main configuration structure for lexloom
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub crawl: CrawlConfig,
    pub storage: StorageConfig,
    pub schema: SchemaConfig,
}

/// Remote document-repository API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the document-repository API
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// OAuth2 token endpoint
    #[serde(rename = "token-url")]
    pub token_url: String,

    /// OAuth2 client id for the client-credentials grant
    #[serde(rename = "client-id")]
    pub client_id: String,

    /// OAuth2 client secret for the client-credentials grant
    #[serde(rename = "client-secret")]
    pub client_secret: String,

    /// Path of the paginated search endpoint
    #[serde(rename = "search-path", default = "default_search_path")]
    pub search_path: String,

    /// Path of the single-document consult endpoint
    #[serde(rename = "consult-path", default = "default_consult_path")]
    pub consult_path: String,

    /// Maximum number of API calls per minute
    #[serde(rename = "requests-per-minute", default = "default_rpm")]
    pub requests_per_minute: u32,

    /// Per-request timeout in seconds
    #[serde(rename = "timeout-seconds", default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Crawl loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Number of identifiers requested per search page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Attempt ceiling for transient source failures
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff (milliseconds)
    #[serde(rename = "retry-base-delay-ms", default = "default_retry_delay")]
    pub retry_base_delay_ms: u64,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Document schema location
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaConfig {
    /// Path to the TOML schema description file
    pub path: String,
}

fn default_search_path() -> String {
    "/search".to_string()
}

fn default_consult_path() -> String {
    "/consult/jorf".to_string()
}

fn default_rpm() -> u32 {
    100
}

fn default_timeout() -> u64 {
    30
}

fn default_page_size() -> u32 {
    100
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    500
}
