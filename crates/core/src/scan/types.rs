//! Scan types and data structures.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use naturescan_shared::config::UploadSettings;
use naturescan_shared::types::{ScanId, UserId};

use crate::storage::SignedUrl;
use crate::vision::SpeciesAnalysis;

/// A persisted scan. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan {
    /// Server-assigned id.
    pub id: ScanId,
    /// Owner.
    pub user_id: UserId,
    /// Durable storage key of the image.
    pub image_key: String,
    /// Model analysis.
    pub analysis: SpeciesAnalysis,
    /// Server-assigned creation time.
    pub created_at: DateTime<Utc>,
}

/// Input for creating a scan record. Id and timestamp are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewScan {
    /// Owner.
    pub user_id: UserId,
    /// Durable storage key of the image.
    pub image_key: String,
    /// Model analysis.
    pub analysis: SpeciesAnalysis,
}

/// Input for an upload.
#[derive(Debug, Clone)]
pub struct UploadScanInput {
    /// Authenticated owner.
    pub owner: UserId,
    /// Client-supplied filename, possibly empty.
    pub filename: String,
    /// Client-declared MIME type, if any.
    pub content_type: Option<String>,
    /// Raw image bytes.
    pub bytes: Bytes,
}

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct ScanUploadResult {
    /// The persisted scan.
    pub scan: Scan,
    /// Signed URL issued at upload time.
    pub image_url: SignedUrl,
}

/// A scan with a freshly signed image URL.
#[derive(Debug, Clone)]
pub struct ScanView {
    /// The persisted scan.
    pub scan: Scan,
    /// Signed URL derived for this read.
    pub image_url: SignedUrl,
}

/// Scan service settings.
#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    /// Maximum image size in bytes.
    pub max_file_size: u64,
    /// Delete the stored image when analysis or persistence fails.
    pub compensate_on_failure: bool,
}

impl ScanConfig {
    /// Default cap: 10 MiB.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

    /// Fallback MIME type when the client declares none.
    pub const DEFAULT_CONTENT_TYPE: &'static str = "image/jpeg";
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
            compensate_on_failure: true,
        }
    }
}

impl From<&UploadSettings> for ScanConfig {
    fn from(settings: &UploadSettings) -> Self {
        Self {
            max_file_size: settings.max_file_size,
            compensate_on_failure: settings.compensate_on_failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_settings_default() {
        let from_settings = ScanConfig::from(&UploadSettings::default());
        let default = ScanConfig::default();
        assert_eq!(from_settings.max_file_size, default.max_file_size);
        assert_eq!(from_settings.max_file_size, 10_485_760);
        assert!(from_settings.compensate_on_failure);
    }
}
