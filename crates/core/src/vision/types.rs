//! Analysis result and image input types.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Model's self-reported certainty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Confident identification.
    High,
    /// Plausible identification.
    Medium,
    /// Best guess.
    Low,
}

impl Confidence {
    /// All values, in schema order.
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    /// Convert to database string value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Parse from database string value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured identification returned by the vision model.
///
/// Every field is required; the JSON form uses camelCase keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SpeciesAnalysis {
    /// Scientific name.
    #[validate(length(min = 1, message = "species cannot be empty"))]
    pub species: String,
    /// Everyday name.
    #[validate(length(min = 1, message = "common name cannot be empty"))]
    pub common_name: String,
    /// Whether it is safe to eat.
    pub safe_to_eat: bool,
    /// Whether it is safe to touch.
    pub safe_to_touch: bool,
    /// Model certainty.
    pub confidence: Confidence,
    /// Safety warnings, possibly empty.
    pub warnings: String,
    /// Free-text description.
    #[validate(length(min = 1, message = "description cannot be empty"))]
    pub description: String,
}

impl SpeciesAnalysis {
    /// Trim surrounding whitespace from every text field.
    #[must_use]
    pub fn trimmed(self) -> Self {
        Self {
            species: self.species.trim().to_string(),
            common_name: self.common_name.trim().to_string(),
            warnings: self.warnings.trim().to_string(),
            description: self.description.trim().to_string(),
            ..self
        }
    }
}

/// Image handed to the model.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Raw image bytes.
    pub bytes: Bytes,
    /// Declared MIME type.
    pub mime_type: String,
}

impl ImageInput {
    /// Create an image input.
    #[must_use]
    pub fn new(bytes: Bytes, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Standard base64 encoding of the bytes.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// `data:` URL form accepted by chat-completions image parts.
    #[must_use]
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}
