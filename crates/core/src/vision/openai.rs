//! OpenAI-compatible chat completions provider with structured output.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema::{ANALYSIS_PROMPT, ANALYSIS_SCHEMA_NAME, analysis_schema, parse_analysis};
use super::{ImageInput, SpeciesAnalysis, VisionError, VisionModel};

/// Vision model reached over the chat completions API.
///
/// Works with any endpoint that accepts `image_url` content parts and
/// `json_schema` response formats.
pub struct OpenAiVisionModel {
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiVisionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiVisionModel")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl OpenAiVisionModel {
    /// Create a provider for the given endpoint.
    pub fn new(api_key: String, model: String, base_url: String, max_tokens: u32) -> Self {
        Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tokens,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(&self, image: &ImageInput) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: ANALYSIS_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.data_url(),
                        },
                    },
                ],
            }],
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: ANALYSIS_SCHEMA_NAME,
                    strict: true,
                    schema: analysis_schema(),
                },
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: &'static str,
    strict: bool,
    schema: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

/// Pull the message content out of a successful response body.
fn extract_content(body: &str) -> Result<String, VisionError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| VisionError::ParseError(e.to_string()))?;

    let message = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| VisionError::ParseError("No choices in response".to_string()))?;

    if let Some(refusal) = message.refusal {
        return Err(VisionError::SchemaViolation(format!("model refused: {refusal}")));
    }

    message
        .content
        .ok_or_else(|| VisionError::ParseError("No content in response".to_string()))
}

fn api_error(status: u16, body: String) -> VisionError {
    match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(error_response) => VisionError::ApiError {
            status,
            message: error_response.error.message,
        },
        Err(_) => VisionError::ApiError {
            status,
            message: body,
        },
    }
}

#[async_trait]
impl VisionModel for OpenAiVisionModel {
    async fn analyze(&self, image: &ImageInput) -> Result<SpeciesAnalysis, VisionError> {
        let request = self.build_request(image);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| VisionError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VisionError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), body));
        }

        let content = extract_content(&body)?;
        parse_analysis(&content)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
