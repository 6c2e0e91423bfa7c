//! `SeaORM` active enums.

use naturescan_core::vision::Confidence;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stored confidence level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
pub enum ConfidenceLevel {
    /// Confident identification.
    #[sea_orm(string_value = "high")]
    High,
    /// Plausible identification.
    #[sea_orm(string_value = "medium")]
    Medium,
    /// Best guess.
    #[sea_orm(string_value = "low")]
    Low,
}

impl From<Confidence> for ConfidenceLevel {
    fn from(confidence: Confidence) -> Self {
        match confidence {
            Confidence::High => Self::High,
            Confidence::Medium => Self::Medium,
            Confidence::Low => Self::Low,
        }
    }
}

impl From<ConfidenceLevel> for Confidence {
    fn from(level: ConfidenceLevel) -> Self {
        match level {
            ConfidenceLevel::High => Self::High,
            ConfidenceLevel::Medium => Self::Medium,
            ConfidenceLevel::Low => Self::Low,
        }
    }
}
