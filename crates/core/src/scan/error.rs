//! Scan error types.

use naturescan_shared::AppError;
use naturescan_shared::types::ScanId;
use thiserror::Error;

use crate::storage::StorageError;
use crate::vision::VisionError;

/// Scan operation errors.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Uploaded image exceeds the size cap.
    #[error("image too large: {size} bytes exceeds maximum {max} bytes")]
    PayloadTooLarge {
        /// Actual size.
        size: u64,
        /// Maximum allowed size.
        max: u64,
    },

    /// Scan not found.
    #[error("scan not found: {0}")]
    NotFound(ScanId),

    /// Scan belongs to another user.
    #[error("scan {0} belongs to another user")]
    Forbidden(ScanId),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Vision model call failed.
    #[error("vision error: {0}")]
    Vision(#[from] VisionError),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl ScanError {
    /// Create a payload too large error.
    #[must_use]
    pub fn payload_too_large(size: u64, max: u64) -> Self {
        Self::PayloadTooLarge { size, max }
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<ScanError> for AppError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::PayloadTooLarge { max, .. } => {
                Self::PayloadTooLarge(format!("Image exceeds the {max} byte limit"))
            }
            ScanError::NotFound(_) => Self::NotFound("Scan not found".to_string()),
            ScanError::Forbidden(_) => {
                Self::Forbidden("You do not have access to this scan".to_string())
            }
            ScanError::Storage(e) => Self::ExternalService(e.to_string()),
            ScanError::Vision(e) => Self::ExternalService(e.to_string()),
            ScanError::Repository(msg) => Self::Database(msg),
        }
    }
}
