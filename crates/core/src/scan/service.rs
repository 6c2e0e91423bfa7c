//! Scan service implementation.

use std::sync::Arc;

use chrono::Utc;
use naturescan_shared::types::{ScanId, UserId};
use tracing::{debug, info, warn};

use super::error::ScanError;
use super::types::{NewScan, Scan, ScanConfig, ScanUploadResult, ScanView, UploadScanInput};
use crate::storage::StorageService;
use crate::vision::{ImageInput, VisionModel};

/// Repository trait for scan persistence.
///
/// This trait is implemented by the db crate to provide actual database operations.
pub trait ScanRepository: Send + Sync {
    /// Insert a scan; the store assigns id and creation time.
    fn create(
        &self,
        input: NewScan,
    ) -> impl std::future::Future<Output = Result<Scan, ScanError>> + Send;

    /// Find a scan by id regardless of owner.
    fn find_by_id(
        &self,
        id: ScanId,
    ) -> impl std::future::Future<Output = Result<Option<Scan>, ScanError>> + Send;

    /// List an owner's scans, newest first.
    fn list_by_owner(
        &self,
        owner: UserId,
    ) -> impl std::future::Future<Output = Result<Vec<Scan>, ScanError>> + Send;
}

/// Scan service coordinating storage, vision model and repository.
pub struct ScanService<R: ScanRepository> {
    storage: Arc<StorageService>,
    vision: Arc<dyn VisionModel>,
    repo: Arc<R>,
    config: ScanConfig,
}

impl<R: ScanRepository> ScanService<R> {
    /// Create a new scan service.
    #[must_use]
    pub fn new(
        storage: Arc<StorageService>,
        vision: Arc<dyn VisionModel>,
        repo: Arc<R>,
        config: ScanConfig,
    ) -> Self {
        Self {
            storage,
            vision,
            repo,
            config,
        }
    }

    /// Store, analyze and persist an uploaded image.
    ///
    /// The size cap is enforced before any external call. When analysis or
    /// persistence fails after the image was stored, the object is deleted
    /// on a best-effort basis if compensation is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The image is over the size cap
    /// - Storage write or signing fails
    /// - The vision model fails or returns an invalid analysis
    /// - The database insert fails
    pub async fn upload(&self, input: UploadScanInput) -> Result<ScanUploadResult, ScanError> {
        let size = u64::try_from(input.bytes.len()).unwrap_or(u64::MAX);
        if size > self.config.max_file_size {
            return Err(ScanError::payload_too_large(size, self.config.max_file_size));
        }

        let content_type = input
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| ScanConfig::DEFAULT_CONTENT_TYPE.to_string());

        let key = StorageService::scan_image_key(input.owner, Utc::now(), &input.filename);
        let key = self
            .storage
            .put(&key, input.bytes.clone(), &content_type)
            .await?;
        debug!(owner = %input.owner, key = %key, size, "Scan image stored");

        let image = ImageInput::new(input.bytes, content_type);
        match self.analyze_and_persist(input.owner, &key, &image).await {
            Ok(result) => {
                info!(
                    scan_id = %result.scan.id,
                    owner = %input.owner,
                    species = %result.scan.analysis.species,
                    confidence = %result.scan.analysis.confidence,
                    "Scan created"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(owner = %input.owner, key = %key, error = %e, "Scan upload failed after store");
                if self.config.compensate_on_failure {
                    self.discard(&key).await;
                }
                Err(e)
            }
        }
    }

    async fn analyze_and_persist(
        &self,
        owner: UserId,
        key: &str,
        image: &ImageInput,
    ) -> Result<ScanUploadResult, ScanError> {
        let image_url = self.storage.sign(key).await?;

        let analysis = self.vision.analyze(image).await?;
        debug!(
            provider = self.vision.provider_name(),
            model = self.vision.model_name(),
            species = %analysis.species,
            "Image analyzed"
        );

        let scan = self
            .repo
            .create(NewScan {
                user_id: owner,
                image_key: key.to_string(),
                analysis,
            })
            .await?;

        Ok(ScanUploadResult { scan, image_url })
    }

    /// Best-effort removal of an orphaned image.
    async fn discard(&self, key: &str) {
        match self.storage.delete(key).await {
            Ok(()) => info!(key = %key, "Orphaned scan image deleted"),
            Err(e) => warn!(key = %key, error = %e, "Failed to delete orphaned scan image"),
        }
    }

    /// List an owner's scans, newest first, each with a fresh signed URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the query or URL signing fails.
    pub async fn list_for_owner(&self, owner: UserId) -> Result<Vec<ScanView>, ScanError> {
        let scans = self.repo.list_by_owner(owner).await?;

        let mut views = Vec::with_capacity(scans.len());
        for scan in scans {
            views.push(self.view(scan).await?);
        }
        Ok(views)
    }

    /// Get one scan if it belongs to the owner.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the scan does not exist and `Forbidden` if it
    /// belongs to another user.
    pub async fn get_for_owner(&self, id: ScanId, owner: UserId) -> Result<ScanView, ScanError> {
        let scan = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(ScanError::NotFound(id))?;

        if scan.user_id != owner {
            warn!(scan_id = %id, requester = %owner, "Scan access denied");
            return Err(ScanError::Forbidden(id));
        }

        self.view(scan).await
    }

    async fn view(&self, scan: Scan) -> Result<ScanView, ScanError> {
        let image_url = self.storage.sign(&scan.image_key).await?;
        Ok(ScanView { scan, image_url })
    }
}
