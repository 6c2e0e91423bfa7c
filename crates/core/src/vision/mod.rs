//! Vision-language model adapter for species identification.
//!
//! The model receives the raw image (base64 on the wire), a fixed
//! instruction and a fixed JSON schema, and must answer with an object
//! matching [`SpeciesAnalysis`]. Anything else is an error: there is no
//! retry, no repair and no partial result.

mod error;
mod fake;
mod openai;
mod schema;
mod types;

pub use error::VisionError;
pub use fake::FakeVisionModel;
pub use openai::OpenAiVisionModel;
pub use schema::{ANALYSIS_PROMPT, ANALYSIS_SCHEMA_NAME, analysis_schema, parse_analysis};
pub use types::{Confidence, ImageInput, SpeciesAnalysis};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use naturescan_shared::config::VisionSettings;

/// Trait for vision model providers.
///
/// Implementations must be stateless from the caller's point of view and
/// safe to share across requests.
#[async_trait]
pub trait VisionModel: Send + Sync + fmt::Debug {
    /// Analyze an image and return a schema-conforming result.
    async fn analyze(&self, image: &ImageInput) -> Result<SpeciesAnalysis, VisionError>;

    /// Get the provider name (e.g., "openai", "fake").
    fn provider_name(&self) -> &'static str;

    /// Get the model name.
    fn model_name(&self) -> &str;
}

/// Build the configured provider.
///
/// - `openai`: OpenAI-compatible chat completions API, requires `api_key`
/// - `fake`: deterministic offline model
///
/// # Errors
///
/// Returns `NotConfigured` for unknown providers or missing credentials.
pub fn create_model(settings: &VisionSettings) -> Result<Arc<dyn VisionModel>, VisionError> {
    match settings.provider.as_str() {
        "fake" => Ok(Arc::new(FakeVisionModel::new())),
        "openai" => {
            let api_key = settings
                .api_key
                .clone()
                .filter(|key| !key.is_empty())
                .ok_or_else(|| VisionError::NotConfigured("vision.api_key not set".to_string()))?;
            Ok(Arc::new(OpenAiVisionModel::new(
                api_key,
                settings.model.clone(),
                settings.base_url.clone(),
                settings.max_tokens,
            )))
        }
        other => Err(VisionError::NotConfigured(format!(
            "Unknown provider: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_fake_model() {
        let model = create_model(&VisionSettings::default()).expect("fake is the default");
        assert_eq!(model.provider_name(), "fake");
    }

    #[test]
    fn test_create_openai_requires_key() {
        let settings = VisionSettings {
            provider: "openai".to_string(),
            ..VisionSettings::default()
        };
        let err = create_model(&settings).unwrap_err();
        assert!(matches!(err, VisionError::NotConfigured(_)));
    }

    #[test]
    fn test_create_openai_model() {
        let settings = VisionSettings {
            provider: "openai".to_string(),
            api_key: Some("sk-test".to_string()),
            model: "gpt-4o".to_string(),
            ..VisionSettings::default()
        };
        let model = create_model(&settings).expect("configured");
        assert_eq!(model.provider_name(), "openai");
        assert_eq!(model.model_name(), "gpt-4o");
    }

    #[test]
    fn test_create_unknown_provider() {
        let settings = VisionSettings {
            provider: "llava".to_string(),
            ..VisionSettings::default()
        };
        assert!(create_model(&settings).is_err());
    }
}
