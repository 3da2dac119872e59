/*!
 * Provider implementations for different translation backends.
 *
 * This module contains client implementations for the supported backends:
 * - Gemini: hosted LLM API
 * - Ollama: locally loaded model served over HTTP
 * - Mock: deterministic in-process backend used by tests
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::{ProviderError, TranslationError};
use crate::file_utils::MediaInput;

/// A single chunk translation request, as handed to a backend
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    /// Chunk text to translate
    pub text: String,
    /// System prompt with language placeholders already resolved
    pub system_prompt: String,
    /// Sampling temperature, forwarded without validation
    pub temperature: f32,
    /// Output length cap, forwarded without validation
    pub max_output_tokens: u32,
    /// Nucleus sampling parameter, forwarded without validation
    pub top_p: f32,
}

impl TranslationRequest {
    /// Create a request with the default generation parameters
    pub fn new(text: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            system_prompt: system_prompt.into(),
            temperature: 0.2,
            max_output_tokens: 2048,
            top_p: 0.95,
        }
    }
}

/// Common trait for all translation backends
///
/// A backend turns one chunk into its translation. It may fail with a
/// distinguishable rate-limit error (`ProviderError::RateLimitExceeded`) or
/// any other transport/server error.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Translate one request
    async fn complete(&self, request: &TranslationRequest) -> Result<String, ProviderError>;

    /// Test the connection to the backend
    async fn test_connection(&self) -> Result<(), ProviderError> {
        self.complete(&TranslationRequest::new("Hello", "Translate to Vietnamese."))
            .await
            .map(|_| ())
    }
}

/// Reads the text out of an image or document
///
/// The extracted text is handed to the chunked pipeline as is; an input
/// without readable text yields an empty string.
#[async_trait]
pub trait TextExtractor: Send + Sync + Debug {
    /// Extract the text of `input` in its original language
    async fn extract_text(&self, input: &MediaInput) -> Result<String, ProviderError>;
}

/// Build the configured backend
pub fn build_provider(config: &TranslationConfig) -> Result<Arc<dyn Provider>, TranslationError> {
    let endpoint = config.get_endpoint();
    let model = config.get_model();
    let timeout = config.get_timeout();

    match config.provider {
        TranslationProvider::Gemini => {
            let api_key = config.get_api_key();
            if api_key.is_empty() {
                return Err(TranslationError::Configuration(
                    "Gemini requires an API key".to_string(),
                ));
            }
            Ok(Arc::new(gemini::Gemini::new(api_key, endpoint, model, timeout)))
        }
        TranslationProvider::Ollama => Ok(Arc::new(ollama::Ollama::new(endpoint, model, timeout))),
    }
}

/// Build a text extractor for images and PDFs, if the configured backend can read them
pub fn build_extractor(config: &TranslationConfig) -> Result<Option<Arc<dyn TextExtractor>>, TranslationError> {
    match config.provider {
        TranslationProvider::Gemini => {
            let api_key = config.get_api_key();
            if api_key.is_empty() {
                return Err(TranslationError::Configuration(
                    "Gemini requires an API key".to_string(),
                ));
            }
            let client = gemini::Gemini::new(api_key, config.get_endpoint(), config.get_model(), config.get_timeout());
            Ok(Some(Arc::new(client)))
        }
        TranslationProvider::Ollama => Ok(None),
    }
}

pub mod gemini;
pub mod mock;
pub mod ollama;
