//! Scan repository for database operations.
//!
//! Implements scan persistence using SeaORM.

use chrono::{SubsecRound, Utc};
use naturescan_core::scan::{NewScan, Scan, ScanError, ScanRepository as ScanRepoTrait};
use naturescan_core::vision::SpeciesAnalysis;
use naturescan_shared::types::{ScanId, UserId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::debug;

use crate::entities::scans;

/// Scan repository implementation.
#[derive(Debug, Clone)]
pub struct ScanRepository {
    db: DatabaseConnection,
}

impl ScanRepository {
    /// Create a new scan repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl ScanRepoTrait for ScanRepository {
    async fn create(&self, input: NewScan) -> Result<Scan, ScanError> {
        let analysis = input.analysis;
        let active_model = scans::ActiveModel {
            id: Set(ScanId::new().into_inner()),
            user_id: Set(input.user_id.into_inner()),
            image_key: Set(input.image_key),
            species: Set(analysis.species),
            common_name: Set(analysis.common_name),
            safe_to_eat: Set(analysis.safe_to_eat),
            safe_to_touch: Set(analysis.safe_to_touch),
            confidence: Set(analysis.confidence.into()),
            warnings: Set(analysis.warnings),
            description: Set(analysis.description),
            // Database timestamps keep microseconds
            created_at: Set(Utc::now().trunc_subsecs(6).into()),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(|e| ScanError::repository(e.to_string()))?;

        debug!(scan_id = %model.id, "Scan row inserted");
        Ok(to_domain(model))
    }

    async fn find_by_id(&self, id: ScanId) -> Result<Option<Scan>, ScanError> {
        let model = scans::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(|e| ScanError::repository(e.to_string()))?;

        Ok(model.map(to_domain))
    }

    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Scan>, ScanError> {
        let models = scans::Entity::find()
            .filter(scans::Column::UserId.eq(owner.into_inner()))
            .order_by_desc(scans::Column::CreatedAt)
            .order_by_desc(scans::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ScanError::repository(e.to_string()))?;

        Ok(models.into_iter().map(to_domain).collect())
    }
}

/// Convert database model to domain scan.
fn to_domain(model: scans::Model) -> Scan {
    Scan {
        id: ScanId::from_uuid(model.id),
        user_id: UserId::from_uuid(model.user_id),
        image_key: model.image_key,
        analysis: SpeciesAnalysis {
            species: model.species,
            common_name: model.common_name,
            safe_to_eat: model.safe_to_eat,
            safe_to_touch: model.safe_to_touch,
            confidence: model.confidence.into(),
            warnings: model.warnings,
            description: model.description,
        },
        created_at: model.created_at.with_timezone(&Utc),
    }
}
