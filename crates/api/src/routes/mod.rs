//! API route definitions.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
};
use naturescan_shared::AppError;
use serde_json::json;

use crate::{AppState, middleware::auth::auth_middleware};

pub mod health;
pub mod images;
pub mod scans;

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Protected routes that require authentication
    let protected_routes = Router::new()
        .merge(scans::routes(state.scan_config.max_file_size))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Combine public and protected routes
    Router::new()
        .merge(health::routes())
        .merge(images::routes())
        .merge(protected_routes)
}

/// Render an application error as `{"error", "message"}`.
///
/// Server errors carry a generic message; callers log the detail.
pub(crate) fn error_response(err: &AppError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (
        status,
        Json(json!({
            "error": err.error_code(),
            "message": err.public_message()
        })),
    )
        .into_response()
}
