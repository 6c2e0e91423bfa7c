//! Application configuration management.

use serde::Deserialize;

/// Placeholder secret shipped in the default configuration.
pub const PLACEHOLDER_SECRET: &str = "change-me-in-production";

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Object storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Vision model configuration.
    #[serde(default)]
    pub vision: VisionSettings,
    /// Upload handling configuration.
    #[serde(default)]
    pub upload: UploadSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key shared with the identity service.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

/// Object storage configuration.
///
/// `provider` selects which of the remaining fields are read:
/// `s3` (endpoint, bucket, region, access_key_id, secret_access_key),
/// `azure_blob` (account, access_key, container), `local_fs` (root) or
/// `memory`.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Provider name.
    #[serde(default = "default_storage_provider")]
    pub provider: String,
    /// Root directory for `local_fs`.
    #[serde(default)]
    pub root: Option<String>,
    /// S3 endpoint URL.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// S3 bucket name.
    #[serde(default)]
    pub bucket: Option<String>,
    /// S3 region.
    #[serde(default)]
    pub region: Option<String>,
    /// S3 access key ID.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// S3 secret access key.
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Azure storage account name.
    #[serde(default)]
    pub account: Option<String>,
    /// Azure storage access key.
    #[serde(default)]
    pub access_key: Option<String>,
    /// Azure container name.
    #[serde(default)]
    pub container: Option<String>,
    /// Signed download URL TTL in seconds.
    #[serde(default = "default_download_ttl")]
    pub download_ttl_secs: u64,
    /// HMAC secret for URLs signed by this server (providers without presigning).
    #[serde(default = "default_signing_secret")]
    pub signing_secret: String,
    /// Externally reachable base URL of this server, used in self-signed URLs.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: default_storage_provider(),
            root: None,
            endpoint: None,
            bucket: None,
            region: None,
            access_key_id: None,
            secret_access_key: None,
            account: None,
            access_key: None,
            container: None,
            download_ttl_secs: default_download_ttl(),
            signing_secret: default_signing_secret(),
            public_base_url: default_public_base_url(),
        }
    }
}

fn default_storage_provider() -> String {
    "local_fs".to_string()
}

fn default_download_ttl() -> u64 {
    3600 // 1 hour
}

fn default_signing_secret() -> String {
    PLACEHOLDER_SECRET.to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}

/// Vision model configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VisionSettings {
    /// Provider name: `openai` or `fake`.
    #[serde(default = "default_vision_provider")]
    pub provider: String,
    /// API key for the provider.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model identifier.
    #[serde(default = "default_vision_model")]
    pub model: String,
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_vision_base_url")]
    pub base_url: String,
    /// Completion token cap.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            provider: default_vision_provider(),
            api_key: None,
            model: default_vision_model(),
            base_url: default_vision_base_url(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_vision_provider() -> String {
    "fake".to_string()
}

fn default_vision_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_vision_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

/// Upload handling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    /// Maximum accepted image size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Delete the stored image when analysis or persistence fails.
    #[serde(default = "default_compensate_on_failure")]
    pub compensate_on_failure: bool,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            compensate_on_failure: default_compensate_on_failure(),
        }
    }
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10 MiB
}

fn default_compensate_on_failure() -> bool {
    true
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("NATURESCAN").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Names of secret settings still holding the shipped placeholder.
    #[must_use]
    pub fn placeholder_secrets(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.jwt.secret == PLACEHOLDER_SECRET {
            names.push("jwt.secret");
        }
        if self.storage.signing_secret == PLACEHOLDER_SECRET {
            names.push("storage.signing_secret");
        }
        names
    }
}
