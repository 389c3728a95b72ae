//! VLM interaction: the request shape and the backend seam.
//!
//! [`VisionBackend`] is the only place network I/O happens. The production
//! implementation, [`EdgequakeBackend`], delegates to `edgequake-llm`, which
//! speaks OpenAI, Anthropic, Gemini, Azure and OpenAI-compatible APIs. Tests
//! substitute a scripted backend.
//!
//! Fallback across model identifiers and the per-attempt deadline live in
//! [`crate::extract`], not here: a backend performs exactly one call.

use crate::pipeline::encode::EncodedImage;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ProviderFactory};
use thiserror::Error;
use tracing::debug;

/// Decoding parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: usize,
}

/// One extraction call: instructions plus page images, in order.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub instructions: String,
    pub images: Vec<EncodedImage>,
    pub sampling: SamplingOptions,
}

impl ExtractionRequest {
    pub fn new(instructions: String, images: Vec<EncodedImage>, sampling: SamplingOptions) -> Self {
        Self {
            instructions,
            images,
            sampling,
        }
    }

    /// Chat transcript for the provider.
    ///
    /// 1. **System message**: extraction instructions and schema
    /// 2. **User message**: every page image, empty text
    ///
    /// The images carry all the content; the empty user text only satisfies
    /// APIs that require a user turn.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        let images = self.images.iter().map(EncodedImage::to_image_data).collect();
        vec![
            ChatMessage::system(self.instructions.as_str()),
            ChatMessage::user_with_images("", images),
        ]
    }

    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.sampling.temperature),
            top_p: Some(self.sampling.top_p),
            max_tokens: Some(self.sampling.max_tokens),
            ..Default::default()
        }
    }
}

/// Text returned by a model, with token accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReply {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Failure of a single backend call.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The provider could not be instantiated (missing key, unknown name).
    #[error("provider '{provider}' is not configured: {detail}")]
    NotConfigured { provider: String, detail: String },

    /// Transport or API failure.
    #[error("{0}")]
    Api(String),

    /// The call exceeded its deadline.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// A hosted multimodal model, addressed by model identifier.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Issue one request to `model` and return its raw text.
    async fn complete(
        &self,
        model: &str,
        request: &ExtractionRequest,
    ) -> Result<ModelReply, BackendError>;
}

/// [`VisionBackend`] over `edgequake-llm`.
///
/// The provider is created per call because the model identifier changes
/// between fallback attempts; API keys come from the provider's usual
/// environment variables (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, …).
#[derive(Debug, Clone)]
pub struct EdgequakeBackend {
    provider_name: String,
}

impl EdgequakeBackend {
    pub fn new(provider_name: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
        }
    }
}

#[async_trait]
impl VisionBackend for EdgequakeBackend {
    async fn complete(
        &self,
        model: &str,
        request: &ExtractionRequest,
    ) -> Result<ModelReply, BackendError> {
        let provider = ProviderFactory::create_llm_provider(&self.provider_name, model)
            .map_err(|e| BackendError::NotConfigured {
                provider: self.provider_name.clone(),
                detail: format!("{e}"),
            })?;

        let messages = request.to_messages();
        let options = request.completion_options();

        let response = provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| BackendError::Api(format!("{e}")))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            model, response.prompt_tokens, response.completion_tokens
        );

        Ok(ModelReply {
            content: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ExtractionRequest {
        ExtractionRequest::new(
            "extract".into(),
            vec![
                EncodedImage {
                    media_type: "image/png".into(),
                    data: "AQID".into(),
                },
                EncodedImage {
                    media_type: "image/jpeg".into(),
                    data: "BAUG".into(),
                },
            ],
            SamplingOptions {
                temperature: 0.0,
                top_p: 1.0,
                max_tokens: 8141,
            },
        )
    }

    #[test]
    fn options_are_deterministic() {
        let opts = request().completion_options();
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.top_p, Some(1.0));
        assert_eq!(opts.max_tokens, Some(8141));
    }

    #[test]
    fn transcript_is_system_then_images() {
        let messages = request().to_messages();
        assert_eq!(messages.len(), 2);
    }
}
