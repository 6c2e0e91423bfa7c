//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for scans and signed images
//! - Authentication middleware
//! - Request extractors
//! - Response types

pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::header::AUTHORIZATION;
use naturescan_core::scan::ScanConfig;
use naturescan_core::storage::StorageService;
use naturescan_core::vision::VisionModel;
use naturescan_shared::JwtService;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Object storage for scan images.
    pub storage: Arc<StorageService>,
    /// Vision model used to analyze uploads.
    pub vision: Arc<dyn VisionModel>,
    /// Upload limits and failure handling.
    pub scan_config: ScanConfig,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetSensitiveRequestHeadersLayer::new([AUTHORIZATION]))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
mod test_support;
