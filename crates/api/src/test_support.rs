//! Shared fixtures for route tests: in-memory SQLite, in-memory storage, fake vision.

use std::sync::Arc;

use axum::body::Body;
use axum::response::Response;
use http_body_util::BodyExt;
use naturescan_core::scan::ScanConfig;
use naturescan_core::storage::{StorageConfig, StorageProvider, StorageService};
use naturescan_core::vision::{FakeVisionModel, VisionModel};
use naturescan_db::migration::{Migrator, MigratorTrait};
use naturescan_shared::types::UserId;
use naturescan_shared::{JwtConfig, JwtService};
use sea_orm::{ConnectOptions, Database};

use crate::AppState;

pub(crate) const BOUNDARY: &str = "naturescan-test-boundary";

pub(crate) async fn test_state(vision: Arc<dyn VisionModel>, scan_config: ScanConfig) -> AppState {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to connect to sqlite");
    Migrator::up(&db, None).await.expect("Failed to run migrations");

    let storage_config = StorageConfig::new(StorageProvider::Memory)
        .with_url_signing("test-signing-secret", "http://localhost:8080");
    let storage = StorageService::from_config(storage_config).expect("memory storage");

    AppState {
        db: Arc::new(db),
        jwt_service: Arc::new(JwtService::new(JwtConfig::default())),
        storage: Arc::new(storage),
        vision,
        scan_config,
    }
}

pub(crate) async fn default_state() -> AppState {
    test_state(Arc::new(FakeVisionModel::new()), ScanConfig::default()).await
}

pub(crate) fn bearer(state: &AppState, user: UserId) -> String {
    let token = state
        .jwt_service
        .generate_access_token(user)
        .expect("should generate token");
    format!("Bearer {token}")
}

/// One-part multipart body.
pub(crate) fn multipart_body(
    field_name: &str,
    filename: Option<&str>,
    content_type: Option<&str>,
    data: &[u8],
) -> Vec<u8> {
    let mut disposition = format!("Content-Disposition: form-data; name=\"{field_name}\"");
    if let Some(filename) = filename {
        disposition.push_str(&format!("; filename=\"{filename}\""));
    }

    let mut body = format!("--{BOUNDARY}\r\n{disposition}\r\n").into_bytes();
    if let Some(content_type) = content_type {
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub(crate) fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

pub(crate) async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

pub(crate) async fn body_bytes(response: Response<Body>) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}
