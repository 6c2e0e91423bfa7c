//! Storage configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use naturescan_shared::config::StorageSettings;

use super::error::StorageError;

/// Storage provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// S3-compatible storage: Cloudflare R2, Supabase, AWS S3, DigitalOcean Spaces
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// S3 bucket name.
        bucket: String,
        /// AWS access key ID.
        access_key_id: String,
        /// AWS secret access key.
        secret_access_key: String,
        /// AWS region.
        region: String,
    },
    /// Azure Blob Storage
    AzureBlob {
        /// Azure storage account name.
        account: String,
        /// Azure storage access key.
        access_key: String,
        /// Azure container name.
        container: String,
    },
    /// Local filesystem (development only)
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
    /// In-process memory (tests only, contents vanish with the process)
    Memory,
}

impl StorageProvider {
    /// Create S3-compatible provider (Cloudflare R2, Supabase, AWS S3).
    #[must_use]
    pub fn s3(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self::S3 {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
        }
    }

    /// Create Azure Blob Storage provider.
    #[must_use]
    pub fn azure_blob(
        account: impl Into<String>,
        access_key: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self::AzureBlob {
            account: account.into(),
            access_key: access_key.into(),
            container: container.into(),
        }
    }

    /// Create local filesystem provider (development only).
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Build a provider from flat application settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the provider name is unknown or a
    /// field the provider needs is missing.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        fn required(value: Option<&String>, field: &str) -> Result<String, StorageError> {
            value
                .cloned()
                .ok_or_else(|| StorageError::configuration(format!("storage.{field} is required")))
        }

        match settings.provider.as_str() {
            "s3" => Ok(Self::s3(
                required(settings.endpoint.as_ref(), "endpoint")?,
                required(settings.bucket.as_ref(), "bucket")?,
                required(settings.access_key_id.as_ref(), "access_key_id")?,
                required(settings.secret_access_key.as_ref(), "secret_access_key")?,
                settings.region.clone().unwrap_or_else(|| "auto".to_string()),
            )),
            "azure_blob" => Ok(Self::azure_blob(
                required(settings.account.as_ref(), "account")?,
                required(settings.access_key.as_ref(), "access_key")?,
                required(settings.container.as_ref(), "container")?,
            )),
            "local_fs" => Ok(Self::local_fs(
                settings.root.clone().unwrap_or_else(|| "./storage".to_string()),
            )),
            "memory" => Ok(Self::Memory),
            other => Err(StorageError::configuration(format!(
                "unknown storage provider: {other}"
            ))),
        }
    }

    /// Get the provider name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "s3",
            Self::AzureBlob { .. } => "azure_blob",
            Self::LocalFs { .. } => "local",
            Self::Memory => "memory",
        }
    }

    /// Get the bucket/container name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        match self {
            Self::S3 { bucket, .. } => bucket,
            Self::AzureBlob { container, .. } => container,
            Self::LocalFs { root } => root.to_str().unwrap_or("local"),
            Self::Memory => "memory",
        }
    }
}

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Signed download URL TTL in seconds (default: 3600 = 1 hour).
    pub download_ttl_secs: u64,
    /// HMAC secret for URLs this server signs itself.
    pub signing_secret: String,
    /// Base URL used when this server signs URLs itself.
    pub public_base_url: String,
}

impl StorageConfig {
    /// Default download TTL: 1 hour.
    pub const DEFAULT_DOWNLOAD_TTL: u64 = 3600;

    /// Longest download TTL: 7 days, the S3 presign ceiling.
    pub const MAX_DOWNLOAD_TTL: u64 = 7 * 24 * 3600;

    /// Create a new storage config with default settings.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            download_ttl_secs: Self::DEFAULT_DOWNLOAD_TTL,
            signing_secret: "change-me-in-production".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
        }
    }

    /// Build the config from application settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the provider settings are incomplete
    /// or the download TTL is zero or above `MAX_DOWNLOAD_TTL`.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        if settings.download_ttl_secs == 0 || settings.download_ttl_secs > Self::MAX_DOWNLOAD_TTL {
            return Err(StorageError::configuration(format!(
                "storage.download_ttl_secs must be between 1 and {}",
                Self::MAX_DOWNLOAD_TTL
            )));
        }

        Ok(Self::new(StorageProvider::from_settings(settings)?)
            .with_download_ttl(settings.download_ttl_secs)
            .with_url_signing(&settings.signing_secret, &settings.public_base_url))
    }

    /// Set signed download URL TTL.
    #[must_use]
    pub fn with_download_ttl(mut self, secs: u64) -> Self {
        self.download_ttl_secs = secs;
        self
    }

    /// Set the secret and base URL for self-signed URLs.
    #[must_use]
    pub fn with_url_signing(mut self, secret: &str, public_base_url: &str) -> Self {
        self.signing_secret = secret.to_string();
        self.public_base_url = public_base_url.trim_end_matches('/').to_string();
        self
    }
}
