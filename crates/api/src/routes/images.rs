//! Serves images behind URLs this server signed itself.
//!
//! Only used for storage providers without native presigning (local
//! filesystem, in-memory). Access is granted by the signature alone.

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{
        StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::get,
};
use naturescan_core::storage::StorageError;
use naturescan_shared::AppError;
use serde::Deserialize;
use tracing::{debug, error};

use super::error_response;
use crate::AppState;

/// Creates the signed image routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/images/{*key}", get(get_image))
}

/// Query string of a signed image URL.
#[derive(Debug, Deserialize)]
pub struct SignedImageQuery {
    /// Unix expiry timestamp.
    pub expires: Option<String>,
    /// Hex HMAC signature.
    pub signature: Option<String>,
}

fn invalid_link() -> Response {
    error_response(&AppError::Forbidden(
        "Invalid or expired image link".to_string(),
    ))
}

/// GET `/images/{*key}?expires=&signature=`
async fn get_image(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<SignedImageQuery>,
) -> Response {
    let (Some(expires), Some(signature)) = (query.expires, query.signature) else {
        return invalid_link();
    };
    let Ok(expires) = expires.parse::<i64>() else {
        return invalid_link();
    };

    if let Err(e) = state.storage.verify_signature(&key, expires, &signature) {
        debug!(key = %key, error = %e, "Signed image URL rejected");
        return invalid_link();
    }

    match state.storage.read(&key).await {
        Ok(object) => (
            StatusCode::OK,
            [
                (CONTENT_TYPE, object.content_type),
                (CACHE_CONTROL, "private, max-age=300".to_string()),
            ],
            object.bytes,
        )
            .into_response(),
        Err(StorageError::NotFound { .. }) => {
            error_response(&AppError::NotFound("Image not found".to_string()))
        }
        Err(e) => {
            error!(key = %key, error = %e, "Failed to read image");
            error_response(&AppError::ExternalService(e.to_string()))
        }
    }
}
