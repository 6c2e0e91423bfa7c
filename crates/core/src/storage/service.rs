//! Storage service implementation using Apache OpenDAL.

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use naturescan_shared::types::UserId;
use opendal::{ErrorKind, Operator, services};
use tracing::debug;
use uuid::Uuid;

use super::config::{StorageConfig, StorageProvider};
use super::error::StorageError;
use super::signer::UrlSigner;

/// Longest sanitized filename kept in a storage key.
pub const MAX_FILENAME_LEN: usize = 100;

/// Hex characters of random nonce in a storage key.
const KEY_NONCE_LEN: usize = 12;

/// Longest extension preserved when a filename is truncated.
const MAX_EXTENSION_LEN: usize = 16;

/// Time-limited retrieval URL for a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    /// The signed URL.
    pub url: String,
    /// When the URL expires.
    pub expires_at: DateTime<Utc>,
}

/// Object contents read back from storage.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Raw bytes.
    pub bytes: Bytes,
    /// Content type recorded at write time, or guessed from the key.
    pub content_type: String,
}

/// Storage service for scan images.
pub struct StorageService {
    operator: Operator,
    config: StorageConfig,
    signer: UrlSigner,
}

impl std::fmt::Debug for StorageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageService")
            .field("provider", &self.config.provider.name())
            .field("bucket", &self.config.provider.bucket())
            .finish_non_exhaustive()
    }
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        let signer = UrlSigner::new(&config.signing_secret, &config.public_base_url);
        Ok(Self {
            operator,
            config,
            signer,
        })
    }

    /// Create OpenDAL operator from provider config.
    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        let operator = match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);

                Operator::new(builder).map(|b| b.finish())
            }
            StorageProvider::AzureBlob {
                account,
                access_key,
                container,
            } => {
                let builder = services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);

                Operator::new(builder).map(|b| b.finish())
            }
            StorageProvider::LocalFs { root } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| StorageError::configuration("invalid path"))?,
                );

                Operator::new(builder).map(|b| b.finish())
            }
            StorageProvider::Memory => {
                Operator::new(services::Memory::default()).map(|b| b.finish())
            }
        };

        operator.map_err(|e| StorageError::configuration(e.to_string()))
    }

    /// Generate the storage key for a scan image.
    ///
    /// Format: `scans/{owner_id}/{unix_millis}-{nonce}-{sanitized_filename}`
    ///
    /// The nonce keeps same-name uploads within one millisecond apart, and
    /// the filename is cut to `MAX_FILENAME_LEN` so keys fit a 255 character
    /// column.
    #[must_use]
    pub fn scan_image_key(owner: UserId, uploaded_at: DateTime<Utc>, filename: &str) -> String {
        let mut sanitized = truncate_filename(&sanitize_filename(filename), MAX_FILENAME_LEN);
        if sanitized.is_empty() {
            sanitized.push_str("image");
        }

        let nonce = Uuid::now_v7().simple().to_string();

        format!(
            "scans/{}/{}-{}-{}",
            owner,
            uploaded_at.timestamp_millis(),
            &nonce[nonce.len() - KEY_NONCE_LEN..],
            sanitized
        )
    }

    /// Write an object and return its durable key.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError> {
        validate_key(key)?;

        if self.operator.info().full_capability().write_with_content_type {
            self.operator
                .write_with(key, bytes)
                .content_type(content_type)
                .await?;
        } else {
            self.operator.write(key, bytes).await?;
        }

        debug!(key, provider = self.provider_name(), "Object written");
        Ok(key.to_string())
    }

    /// Derive a time-limited retrieval URL for a key.
    ///
    /// Providers with native presigning sign the URL themselves; the others
    /// get a URL signed by this server and served from the image route.
    ///
    /// # Errors
    ///
    /// Returns an error if presigning fails.
    pub async fn sign(&self, key: &str) -> Result<SignedUrl, StorageError> {
        validate_key(key)?;

        let ttl_secs = self.config.download_ttl_secs;
        let expires_at = i64::try_from(ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                StorageError::configuration(format!("download TTL out of range: {ttl_secs}s"))
            })?;

        if !self.operator.info().full_capability().presign_read {
            return Ok(SignedUrl {
                url: self.signer.sign(key, expires_at),
                expires_at,
            });
        }

        let presigned = self
            .operator
            .presign_read(key, Duration::from_secs(ttl_secs))
            .await
            .map_err(StorageError::from)?;

        Ok(SignedUrl {
            url: presigned.uri().to_string(),
            expires_at,
        })
    }

    /// Check a URL this server signed.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is malformed, the signature does not
    /// match or the URL has expired.
    pub fn verify_signature(
        &self,
        key: &str,
        expires: i64,
        signature: &str,
    ) -> Result<(), StorageError> {
        validate_key(key)?;
        self.signer.verify(key, expires, signature, Utc::now())
    }

    /// Read an object back.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the key does not exist.
    pub async fn read(&self, key: &str) -> Result<StoredObject, StorageError> {
        validate_key(key)?;

        let meta = self.operator.stat(key).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::not_found(key),
            _ => StorageError::from(e),
        })?;
        let buffer = self.operator.read(key).await?;

        let content_type = meta
            .content_type()
            .map_or_else(|| guess_content_type(key).to_string(), String::from);

        Ok(StoredObject {
            bytes: buffer.to_bytes(),
            content_type,
        })
    }

    /// Delete an object from storage.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.operator.delete(key).await.map_err(StorageError::from)
    }

    /// Check if an object exists in storage.
    pub async fn exists(&self, key: &str) -> bool {
        self.operator.stat(key).await.is_ok()
    }

    /// List object keys under a directory prefix (must end with `/`).
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails.
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let entries = match self.operator.list_with(prefix).recursive(true).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(entries
            .into_iter()
            .filter(|entry| entry.metadata().mode().is_file())
            .map(|entry| entry.path().to_string())
            .collect())
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.config.provider.name()
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

/// Reject keys that could escape the storage root.
fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty()
        || key.starts_with('/')
        || key.ends_with('/')
        || key.split('/').any(|segment| segment.is_empty() || segment == "..")
    {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Guess an image content type from the key extension.
fn guess_content_type(key: &str) -> &'static str {
    let ext = key.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}

/// Sanitize filename for storage key.
///
/// Removes or replaces characters that could cause issues in storage paths.
/// Only allows ASCII alphanumeric characters, dots, hyphens, and underscores.
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Cut a sanitized (ASCII) filename to `max` bytes, keeping a short extension.
fn truncate_filename(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }

    match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_EXTENSION_LEN && name.len() - dot < max => {
            let ext = &name[dot..];
            format!("{}{}", &name[..max - ext.len()], ext)
        }
        _ => name[..max].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_service() -> StorageService {
        StorageService::from_config(StorageConfig::new(StorageProvider::Memory))
            .expect("memory storage")
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("leaf.jpg"), "leaf.jpg");
        assert_eq!(sanitize_filename("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_filename("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize_filename("日本語.png"), "___.png");
    }

    #[test]
    fn test_scan_image_key() {
        let owner = UserId::new();
        let uploaded_at = DateTime::from_timestamp_millis(1_760_000_000_123).expect("valid");

        let key = StorageService::scan_image_key(owner, uploaded_at, "mushroom.jpg");
        let prefix = format!("scans/{owner}/1760000000123-");
        assert!(key.starts_with(&prefix));
        assert!(key.ends_with("-mushroom.jpg"));

        let nonce = &key[prefix.len()..key.len() - "-mushroom.jpg".len()];
        assert_eq!(nonce.len(), KEY_NONCE_LEN);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_scan_image_key_same_name_same_millis_differs() {
        let owner = UserId::new();
        let uploaded_at = DateTime::from_timestamp_millis(1_760_000_000_123).expect("valid");

        let first = StorageService::scan_image_key(owner, uploaded_at, "photo.jpg");
        let second = StorageService::scan_image_key(owner, uploaded_at, "photo.jpg");
        assert_ne!(first, second);
    }

    #[test]
    fn test_scan_image_key_long_filename_fits_column() {
        let filename = format!("{}.jpeg", "a".repeat(250));
        let key = StorageService::scan_image_key(UserId::new(), Utc::now(), &filename);

        assert!(key.len() <= 255, "key is {} characters", key.len());
        assert!(key.ends_with(".jpeg"));
        assert!(validate_key(&key).is_ok());
    }

    #[test]
    fn test_truncate_filename() {
        assert_eq!(truncate_filename("leaf.jpg", 10), "leaf.jpg");
        assert_eq!(truncate_filename("abcdefghij.png", 10), "abcdef.png");
        assert_eq!(truncate_filename("abcdefghijkl", 10), "abcdefghij");
        assert_eq!(truncate_filename(".hiddenfile.", 5), ".hid.");
        assert_eq!(truncate_filename("x.averyveryverylongext", 10), "x.averyver");
    }

    #[test]
    fn test_scan_image_key_empty_filename() {
        let key = StorageService::scan_image_key(UserId::new(), Utc::now(), "");
        assert!(key.ends_with("-image"));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("scans/a/1-b.jpg").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/scans/a").is_err());
        assert!(validate_key("scans/../secrets").is_err());
        assert!(validate_key("scans//a").is_err());
        assert!(validate_key("scans/a/").is_err());
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("scans/a/1-leaf.JPG"), "image/jpeg");
        assert_eq!(guess_content_type("scans/a/1-leaf.webp"), "image/webp");
        assert_eq!(guess_content_type("scans/a/1-image"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_put_read_delete() {
        let storage = memory_service();
        let key = "scans/owner/1-leaf.png";

        let stored = storage
            .put(key, Bytes::from_static(b"png-bytes"), "image/png")
            .await
            .expect("write");
        assert_eq!(stored, key);
        assert!(storage.exists(key).await);

        let object = storage.read(key).await.expect("read");
        assert_eq!(object.bytes.as_ref(), b"png-bytes");
        assert_eq!(object.content_type, "image/png");

        storage.delete(key).await.expect("delete");
        assert!(!storage.exists(key).await);
    }

    #[tokio::test]
    async fn test_list_by_owner_prefix() {
        let storage = memory_service();
        for key in ["scans/a/1-x.jpg", "scans/a/2-y.jpg", "scans/b/1-z.jpg"] {
            storage
                .put(key, Bytes::from_static(b"img"), "image/jpeg")
                .await
                .expect("write");
        }

        let mut keys = storage.list("scans/a/").await.expect("list");
        keys.sort();
        assert_eq!(keys, vec!["scans/a/1-x.jpg", "scans/a/2-y.jpg"]);
        assert!(storage.list("scans/c/").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let storage = memory_service();
        let err = storage.read("scans/owner/missing.jpg").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_put_rejects_traversal_key() {
        let storage = memory_service();
        let err = storage
            .put("scans/../x", Bytes::new(), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_sign_falls_back_to_self_signed_url() {
        let config = StorageConfig::new(StorageProvider::Memory)
            .with_download_ttl(120)
            .with_url_signing("secret", "https://api.example.com");
        let storage = StorageService::from_config(config).expect("memory storage");

        let before = Utc::now();
        let signed = storage.sign("scans/owner/1-leaf.png").await.expect("sign");

        assert!(
            signed
                .url
                .starts_with("https://api.example.com/api/images/scans/owner/1-leaf.png?expires=")
        );
        let ttl = (signed.expires_at - before).num_seconds();
        assert!((115..=125).contains(&ttl), "ttl was {ttl}");
    }

    #[tokio::test]
    async fn test_sign_with_huge_ttl_errors_instead_of_panicking() {
        let config = StorageConfig::new(StorageProvider::Memory).with_download_ttl(u64::MAX / 2);
        let storage = StorageService::from_config(config).expect("memory storage");

        let err = storage.sign("scans/owner/1-leaf.png").await.unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_signed_url_round_trips_through_verification() {
        let storage = memory_service();
        let signed = storage.sign("scans/owner/1-leaf.png").await.expect("sign");

        let query = signed.url.split_once('?').expect("query").1;
        let mut expires = 0;
        let mut signature = "";
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("expires", v)) => expires = v.parse().expect("number"),
                Some(("signature", v)) => signature = v,
                _ => {}
            }
        }

        assert!(
            storage
                .verify_signature("scans/owner/1-leaf.png", expires, signature)
                .is_ok()
        );
        assert!(
            storage
                .verify_signature("scans/other/1-leaf.png", expires, signature)
                .is_err()
        );
    }
}
