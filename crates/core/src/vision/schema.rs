//! Fixed instruction, output schema and strict parsing of model output.

use serde_json::{Value, json};
use validator::Validate;

use super::error::VisionError;
use super::types::SpeciesAnalysis;

/// Name under which the schema is registered with the provider.
pub const ANALYSIS_SCHEMA_NAME: &str = "species_analysis";

/// Instruction sent with every image.
pub const ANALYSIS_PROMPT: &str = "Identify the plant, animal or fungus in this photo. \
Give its scientific name as species and its everyday common name. \
Say whether it is safe to eat and whether it is safe to touch; when unsure, answer false. \
Rate your confidence as high, medium or low. \
List any safety warnings (toxicity, allergens, stings, look-alike species), or an empty string if there are none. \
Finish with a short description of the organism and its notable features.";

/// JSON schema the model output must satisfy.
#[must_use]
pub fn analysis_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "species": {
                "type": "string",
                "description": "Scientific name of the organism"
            },
            "commonName": {
                "type": "string",
                "description": "Everyday name of the organism"
            },
            "safeToEat": {
                "type": "boolean",
                "description": "Whether it is safe to eat"
            },
            "safeToTouch": {
                "type": "boolean",
                "description": "Whether it is safe to touch"
            },
            "confidence": {
                "type": "string",
                "enum": ["high", "medium", "low"],
                "description": "Certainty of the identification"
            },
            "warnings": {
                "type": "string",
                "description": "Safety warnings, empty if none"
            },
            "description": {
                "type": "string",
                "description": "Short description of the organism"
            }
        },
        "required": [
            "species",
            "commonName",
            "safeToEat",
            "safeToTouch",
            "confidence",
            "warnings",
            "description"
        ],
        "additionalProperties": false
    })
}

/// Parse raw model output into a validated analysis.
///
/// Missing fields, unknown fields, wrong types, unknown confidence values
/// and blank required text all fail. A partially valid object is never
/// returned.
///
/// # Errors
///
/// `ParseError` if the text is not a matching JSON object,
/// `SchemaViolation` if the object fails field validation.
pub fn parse_analysis(raw: &str) -> Result<SpeciesAnalysis, VisionError> {
    let analysis: SpeciesAnalysis = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| VisionError::ParseError(e.to_string()))?;

    let analysis = analysis.trimmed();
    analysis
        .validate()
        .map_err(|e| VisionError::SchemaViolation(e.to_string()))?;

    Ok(analysis)
}

/// Some models wrap JSON in a markdown fence even in structured mode.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::Confidence;

    const VALID: &str = r#"{
        "species": "Urtica dioica",
        "commonName": "Stinging nettle",
        "safeToEat": true,
        "safeToTouch": false,
        "confidence": "medium",
        "warnings": "Hairs on leaves and stems sting on contact.",
        "description": "Perennial herb with serrated leaves."
    }"#;

    #[test]
    fn test_parse_valid() {
        let analysis = parse_analysis(VALID).expect("valid");
        assert_eq!(analysis.species, "Urtica dioica");
        assert_eq!(analysis.common_name, "Stinging nettle");
        assert!(analysis.safe_to_eat);
        assert!(!analysis.safe_to_touch);
        assert_eq!(analysis.confidence, Confidence::Medium);
    }

    #[test]
    fn test_parse_fenced() {
        let fenced = format!("```json\n{VALID}\n```");
        assert!(parse_analysis(&fenced).is_ok());
    }

    #[test]
    fn test_parse_empty_warnings_allowed() {
        let raw = VALID.replace(
            "\"Hairs on leaves and stems sting on contact.\"",
            "\"\"",
        );
        let analysis = parse_analysis(&raw).expect("empty warnings are valid");
        assert!(analysis.warnings.is_empty());
    }

    #[test]
    fn test_parse_missing_field() {
        let raw = r#"{"species":"Quercus robur","commonName":"Oak","safeToEat":false,
            "safeToTouch":true,"confidence":"high","description":"Tree."}"#;
        assert!(matches!(parse_analysis(raw), Err(VisionError::ParseError(_))));
    }

    #[test]
    fn test_parse_unknown_confidence() {
        let raw = VALID.replace("\"medium\"", "\"certain\"");
        assert!(matches!(parse_analysis(&raw), Err(VisionError::ParseError(_))));
    }

    #[test]
    fn test_parse_extra_field() {
        let raw = VALID.replace(
            "\"confidence\": \"medium\",",
            "\"confidence\": \"medium\", \"habitat\": \"woodland\",",
        );
        assert!(matches!(parse_analysis(&raw), Err(VisionError::ParseError(_))));
    }

    #[test]
    fn test_parse_wrong_type() {
        let raw = VALID.replace("\"safeToEat\": true", "\"safeToEat\": \"yes\"");
        assert!(matches!(parse_analysis(&raw), Err(VisionError::ParseError(_))));
    }

    #[test]
    fn test_parse_blank_species() {
        let raw = VALID.replace("\"Urtica dioica\"", "\"  \"");
        assert!(matches!(
            parse_analysis(&raw),
            Err(VisionError::SchemaViolation(_))
        ));
    }

    #[test]
    fn test_parse_accepts_long_text_fields() {
        let long_description = "d".repeat(4001);
        let long_warnings = "w".repeat(2001);
        let raw = VALID
            .replace("\"Perennial herb with serrated leaves.\"", &format!("\"{long_description}\""))
            .replace(
                "\"Hairs on leaves and stems sting on contact.\"",
                &format!("\"{long_warnings}\""),
            );

        let analysis = parse_analysis(&raw).expect("schema places no length limit");
        assert_eq!(analysis.description.len(), 4001);
        assert_eq!(analysis.warnings.len(), 2001);
        assert!(analysis_schema()["properties"]["description"].get("maxLength").is_none());
    }

    #[test]
    fn test_parse_not_json() {
        assert!(matches!(
            parse_analysis("I think this is a nettle."),
            Err(VisionError::ParseError(_))
        ));
    }

    #[test]
    fn test_schema_lists_every_field_as_required() {
        let schema = analysis_schema();
        let required = schema["required"].as_array().expect("required array");
        let properties = schema["properties"].as_object().expect("properties");

        assert_eq!(required.len(), 7);
        assert_eq!(properties.len(), 7);
        for field in required {
            assert!(properties.contains_key(field.as_str().expect("string")));
        }
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(
            schema["properties"]["confidence"]["enum"],
            serde_json::json!(["high", "medium", "low"])
        );
    }
}
