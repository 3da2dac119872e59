use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use log::{debug, error};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::file_utils::MediaInput;
use crate::providers::{Provider, TextExtractor, TranslationRequest};

/// Largest file sent inline; generateContent rejects bigger request bodies
pub const MAX_INLINE_BYTES: usize = 20 * 1024 * 1024;

const EXTRACTION_PROMPT: &str = "Extract all readable text from this file exactly as written, in its original \
language. Keep paragraph breaks as blank lines. Return only the extracted text, without comments.";

const EXTRACTION_MAX_OUTPUT_TOKENS: u32 = 8192;

/// Gemini client for the Generative Language `generateContent` API
#[derive(Debug)]
pub struct Gemini {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API base URL, e.g. `https://generativelanguage.googleapis.com/v1beta`
    endpoint: String,
    /// Model name without the `models/` prefix
    model: String,
    /// Client-side request timeout
    timeout: Duration,
}

/// generateContent request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Instructions kept apart from the translated content
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    /// Conversation turns
    contents: Vec<Content>,
    /// Sampling parameters
    generation_config: GenerationConfig,
}

/// A content turn made of text and inline-data parts
#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A single part: text, or base64 file bytes
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

/// File bytes embedded in the request
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Standard base64 of the file content
    pub data: String,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            inline_data: None,
        }
    }

    pub fn inline(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            text: String::new(),
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data: BASE64_STANDARD.encode(bytes),
            }),
        }
    }
}

/// Generation parameters
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
}

/// generateContent response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// One generated candidate
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Why a prompt was rejected, if it was
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentRequest {
    /// Build a request from a chunk translation request
    pub fn from_translation(request: &TranslationRequest) -> Self {
        let system_instruction = if request.system_prompt.trim().is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: vec![Part::text(request.system_prompt.clone())],
            })
        };

        Self {
            system_instruction,
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(request.text.clone())],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
                top_p: request.top_p,
            },
        }
    }

    /// Build a request asking for the text of an image or PDF
    pub fn from_media(input: &MediaInput) -> Result<Self, ProviderError> {
        if input.bytes.len() > MAX_INLINE_BYTES {
            return Err(ProviderError::RequestFailed(format!(
                "{} is {} bytes, above the {} byte inline limit",
                input.name,
                input.bytes.len(),
                MAX_INLINE_BYTES
            )));
        }

        Ok(Self {
            system_instruction: None,
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::inline(input.media_type.mime_type(), &input.bytes),
                    Part::text(EXTRACTION_PROMPT),
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                max_output_tokens: EXTRACTION_MAX_OUTPUT_TOKENS,
                top_p: 0.95,
            },
        })
    }
}

impl Gemini {
    /// Create a new Gemini client
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let model: String = model.into();
        Self {
            client: Client::builder().timeout(timeout).build().unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.trim_start_matches("models/").to_string(),
            timeout,
        }
    }

    /// Full URL of the generateContent method for the configured model
    pub fn api_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    /// Concatenated text of the first candidate
    pub fn response_text(response: &GenerateContentResponse) -> Result<String, ProviderError> {
        if let Some(reason) = response.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_ref()) {
            return Err(ProviderError::ApiError {
                status_code: 400,
                message: format!("Prompt blocked: {}", reason),
            });
        }

        let candidate = response
            .candidates
            .first()
            .ok_or_else(|| ProviderError::ParseError("Response contained no candidates".to_string()))?;

        let text: String = candidate
            .content
            .as_ref()
            .map(|content| content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
            return Err(ProviderError::ParseError(format!(
                "Candidate contained no text (finish reason: {})",
                reason
            )));
        }

        Ok(text)
    }

    /// Like [`response_text`](Self::response_text), but a candidate without text means an empty page
    pub fn extracted_text(response: &GenerateContentResponse) -> Result<String, ProviderError> {
        match Self::response_text(response) {
            Err(ProviderError::ParseError(_)) if !response.candidates.is_empty() => Ok(String::new()),
            other => other,
        }
    }

    /// POST a generateContent body and return the parsed response
    async fn generate(&self, body: &GenerateContentRequest) -> Result<GenerateContentResponse, ProviderError> {
        let response = self
            .client
            .post(self.api_url())
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            let error = classify_error(status, retry_after.as_deref(), &error_text);
            if !error.is_rate_limit() {
                error!("Gemini API error ({}): {}", status, error_text);
            }
            return Err(error);
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    fn map_transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else if e.is_connect() {
            ProviderError::ConnectionError(e.to_string())
        } else {
            ProviderError::RequestFailed(e.to_string())
        }
    }
}

/// Classify a non-success HTTP response
pub fn classify_error(status: StatusCode, retry_after_header: Option<&str>, body: &str) -> ProviderError {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));

    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string());

    let api_status = error.and_then(|e| e.get("status")).and_then(|s| s.as_str());

    if status == StatusCode::TOO_MANY_REQUESTS || api_status == Some("RESOURCE_EXHAUSTED") {
        let retry_after_secs = retry_after_header
            .and_then(|h| h.trim().parse::<u64>().ok())
            .or_else(|| error.and_then(retry_delay_from_details));
        return ProviderError::RateLimitExceeded { message, retry_after_secs };
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(message),
        _ => ProviderError::ApiError {
            status_code: status.as_u16(),
            message,
        },
    }
}

/// Read `RetryInfo.retryDelay` ("37s") from a Google API error payload
fn retry_delay_from_details(error: &serde_json::Value) -> Option<u64> {
    error
        .get("details")?
        .as_array()?
        .iter()
        .filter_map(|detail| detail.get("retryDelay").and_then(|d| d.as_str()))
        .find_map(|delay| {
            let secs = delay.trim_end_matches('s');
            secs.parse::<f64>().ok().map(|s| s.ceil() as u64)
        })
}

#[async_trait]
impl Provider for Gemini {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        let body = GenerateContentRequest::from_translation(request);
        debug!("Gemini request: {} chars to {}", request.text.chars().count(), self.model);

        let parsed = self.generate(&body).await?;
        Self::response_text(&parsed)
    }
}

#[async_trait]
impl TextExtractor for Gemini {
    async fn extract_text(&self, input: &MediaInput) -> Result<String, ProviderError> {
        let body = GenerateContentRequest::from_media(input)?;
        debug!(
            "Gemini extraction: {} ({}, {} bytes) with {}",
            input.name,
            input.media_type,
            input.bytes.len(),
            self.model
        );

        let parsed = self.generate(&body).await?;
        Self::extracted_text(&parsed)
    }
}
