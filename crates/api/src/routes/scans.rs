//! Scan routes: upload, history and detail.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, State,
        multipart::{Field, MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::{Bytes, BytesMut};
use naturescan_core::scan::{ScanError, ScanService, ScanView, UploadScanInput};
use naturescan_core::vision::SpeciesAnalysis;
use naturescan_db::ScanRepository;
use naturescan_shared::AppError;
use naturescan_shared::types::{ScanId, UserId};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::error_response;
use crate::{AppState, middleware::AuthUser};

/// Slack above the image cap for multipart boundaries and headers.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Form field read when no part carries a filename.
const FILE_FIELD: &str = "file";

/// Creates the scan routes.
pub fn routes(max_file_size: u64) -> Router<AppState> {
    let body_limit = usize::try_from(max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route(
            "/scans/upload",
            post(upload_scan).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/scans", get(list_scans))
        .route("/scans/{scan_id}", get(get_scan))
}

// ============================================================================
// Response Types
// ============================================================================

/// Response for a successful upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadScanResponse {
    /// Persisted scan id.
    pub scan_id: Uuid,
    /// Signed image URL.
    pub image_url: String,
    /// Model analysis.
    pub analysis: SpeciesAnalysis,
}

/// A scan record with a freshly signed image URL.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    /// Scan id.
    pub id: Uuid,
    /// Owner id.
    pub user_id: Uuid,
    /// Durable storage key.
    pub image_key: String,
    /// Signed image URL, derived for this response.
    pub image_url: String,
    /// Scientific name.
    pub species: String,
    /// Everyday name.
    pub common_name: String,
    /// Whether it is safe to eat.
    pub safe_to_eat: bool,
    /// Whether it is safe to touch.
    pub safe_to_touch: bool,
    /// `high`, `medium` or `low`.
    pub confidence: String,
    /// Safety warnings, possibly empty.
    pub warnings: String,
    /// Free-text description.
    pub description: String,
    /// Created at timestamp (ISO 8601).
    pub created_at: String,
}

impl From<ScanView> for ScanResponse {
    fn from(view: ScanView) -> Self {
        let scan = view.scan;
        Self {
            id: scan.id.into_inner(),
            user_id: scan.user_id.into_inner(),
            image_key: scan.image_key,
            image_url: view.image_url.url,
            species: scan.analysis.species,
            common_name: scan.analysis.common_name,
            safe_to_eat: scan.analysis.safe_to_eat,
            safe_to_touch: scan.analysis.safe_to_touch,
            confidence: scan.analysis.confidence.as_str().to_string(),
            warnings: scan.analysis.warnings,
            description: scan.analysis.description,
            created_at: scan.created_at.to_rfc3339(),
        }
    }
}

/// Response for the history list.
#[derive(Debug, Serialize)]
pub struct ListScansResponse {
    /// Scans, newest first.
    pub scans: Vec<ScanResponse>,
}

// ============================================================================
// Helper Functions
// ============================================================================

fn scan_service(state: &AppState) -> ScanService<ScanRepository> {
    let repo = ScanRepository::new((*state.db).clone());
    ScanService::new(
        state.storage.clone(),
        state.vision.clone(),
        Arc::new(repo),
        state.scan_config,
    )
}

/// Image part pulled out of a multipart body.
#[derive(Debug)]
struct ImageUpload {
    filename: String,
    content_type: Option<String>,
    bytes: Bytes,
}

/// Map a multipart read failure, keeping axum's own body-limit rejection as 413.
fn multipart_error(err: &MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the upload limit".to_string())
    } else {
        AppError::Validation(format!("Malformed multipart body: {}", err.body_text()))
    }
}

/// Find the image part: the first part with a filename, or the part named `file`.
async fn read_image(multipart: &mut Multipart, max: u64) -> Result<ImageUpload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        if field.file_name().is_none() && field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = read_capped(field, max).await?;

        return Ok(ImageUpload {
            filename,
            content_type,
            bytes,
        });
    }

    Err(AppError::Validation("No image file provided".to_string()))
}

/// Stream a field into memory, failing as soon as it passes `max` bytes.
async fn read_capped(mut field: Field<'_>, max: u64) -> Result<Bytes, AppError> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(&e))? {
        let size = u64::try_from(buffer.len() + chunk.len()).unwrap_or(u64::MAX);
        if size > max {
            return Err(AppError::PayloadTooLarge(format!(
                "Image exceeds the {max} byte limit"
            )));
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer.freeze())
}

/// Log a scan failure at a level matching its status and render it.
fn scan_error_response(err: ScanError, owner: UserId, action: &str) -> Response {
    let app_error = AppError::from(err);
    if app_error.is_server_error() {
        error!(owner = %owner, error = %app_error, action, "Scan request failed");
    } else {
        warn!(owner = %owner, error = %app_error, action, "Scan request rejected");
    }
    error_response(&app_error)
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/scans/upload`
/// Store, analyze and persist an uploaded photo.
async fn upload_scan(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let owner = auth.user_id();

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            warn!(owner = %owner, error = %rejection, "Upload is not multipart");
            return error_response(&AppError::Validation(
                "Expected a multipart/form-data body".to_string(),
            ));
        }
    };

    let image = match read_image(&mut multipart, state.scan_config.max_file_size).await {
        Ok(image) => image,
        Err(e) => {
            warn!(owner = %owner, error = %e, "Upload rejected");
            return error_response(&e);
        }
    };

    let input = UploadScanInput {
        owner,
        filename: image.filename,
        content_type: image.content_type,
        bytes: image.bytes,
    };

    match scan_service(&state).upload(input).await {
        Ok(result) => {
            info!(scan_id = %result.scan.id, owner = %owner, "Scan uploaded");

            let response = UploadScanResponse {
                scan_id: result.scan.id.into_inner(),
                image_url: result.image_url.url,
                analysis: result.scan.analysis,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => scan_error_response(e, owner, "upload"),
    }
}

/// GET `/scans`
/// List the caller's scans, newest first.
async fn list_scans(State(state): State<AppState>, auth: AuthUser) -> Response {
    let owner = auth.user_id();

    match scan_service(&state).list_for_owner(owner).await {
        Ok(views) => {
            let response = ListScansResponse {
                scans: views.into_iter().map(ScanResponse::from).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => scan_error_response(e, owner, "list"),
    }
}

/// GET `/scans/{scan_id}`
/// Get one of the caller's scans.
async fn get_scan(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(scan_id): Path<String>,
) -> Response {
    let owner = auth.user_id();

    let Ok(scan_id) = scan_id.parse::<ScanId>() else {
        return error_response(&AppError::Validation("Invalid scan id".to_string()));
    };

    match scan_service(&state).get_for_owner(scan_id, owner).await {
        Ok(view) => (StatusCode::OK, Json(ScanResponse::from(view))).into_response(),
        Err(e) => scan_error_response(e, owner, "get"),
    }
}
