//! Vision model error types.

use thiserror::Error;

/// Error type for vision model calls.
///
/// Callers treat every variant the same way; the distinction exists for logs.
#[derive(Debug, Error)]
pub enum VisionError {
    /// Network or transport failure.
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Provider answered with a non-success status.
    #[error("API returned error: {status} - {message}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Provider error message.
        message: String,
    },

    /// Response body could not be decoded.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Decoded output does not satisfy the analysis schema.
    #[error("Output violates analysis schema: {0}")]
    SchemaViolation(String),

    /// Provider missing or misconfigured.
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}
