//! Configuration types for certificate extraction and the HTTP service.
//!
//! Extraction behaviour is controlled through [`ExtractionConfig`], built via
//! [`ExtractionConfigBuilder`]; the listener is described by
//! [`ServerConfig`]. Both are plain values: the binary fills them from CLI
//! flags and `CERTSCAN_*` environment variables, library users build them in
//! code.

use crate::error::CertScanError;
use crate::limits::{DEFAULT_MODELS, MAX_OUTPUT_TOKENS, MODEL_REQUEST_TIMEOUT};
use crate::pipeline::llm::{SamplingOptions, VisionBackend};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for one extraction pipeline.
///
/// # Example
/// ```rust
/// use certscan::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .models(["gpt-4.1-mini", "gpt-4.1"])
///     .provider_name("openai")
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.models.len(), 2);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Model identifiers, tried strictly in order. Default: [`DEFAULT_MODELS`].
    pub models: Vec<String>,

    /// Provider name handed to `edgequake-llm` (e.g. "openai", "anthropic",
    /// "gemini"). Default: "openai".
    pub provider_name: String,

    /// Pre-constructed backend. Takes precedence over `provider_name`.
    pub backend: Option<Arc<dyn VisionBackend>>,

    /// Sampling temperature. Default: 0.0 (deterministic).
    pub temperature: f32,

    /// Nucleus sampling mass. Default: 1.0.
    pub top_p: f32,

    /// Output token cap per call. Default: 8141.
    ///
    /// A fully populated certificate with six policies and all limits is
    /// well under 3 000 tokens; the cap leaves room for verbose models.
    pub max_tokens: usize,

    /// Deadline for one model attempt in seconds. Default: 60.
    ///
    /// A timed-out attempt counts as a failure and the next model is tried.
    pub api_timeout_secs: u64,

    /// Replacement for the built-in extraction prompt. The "not an ACORD 25"
    /// directive is always appended.
    pub system_prompt: Option<String>,

    /// Directory holding the pdfium shared library.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            provider_name: "openai".to_string(),
            backend: None,
            temperature: 0.0,
            top_p: 1.0,
            max_tokens: MAX_OUTPUT_TOKENS,
            api_timeout_secs: MODEL_REQUEST_TIMEOUT.as_secs(),
            system_prompt: None,
            pdfium_lib_path: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("models", &self.models)
            .field("provider_name", &self.provider_name)
            .field("backend", &self.backend.as_ref().map(|_| "<dyn VisionBackend>"))
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .finish()
    }
}

impl ExtractionConfig {
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn sampling(&self) -> SamplingOptions {
        SamplingOptions {
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
        }
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn backend(mut self, backend: Arc<dyn VisionBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.config.top_p = p.clamp(0.0, 1.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, CertScanError> {
        let c = &self.config;
        if c.models.is_empty() {
            return Err(CertScanError::InvalidConfig(
                "At least one model identifier is required".into(),
            ));
        }
        if c.models.iter().any(|m| m.trim().is_empty()) {
            return Err(CertScanError::InvalidConfig(
                "Model identifiers must not be blank".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(CertScanError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(CertScanError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Listener settings for `certscan serve`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Socket address to bind. Default: `127.0.0.1:8080`.
    pub listen_addr: String,

    /// Request body cap in bytes. Default: 16 MiB.
    ///
    /// Deliberately well above the 4 MiB upload limit so oversized uploads
    /// reach the validator and get a precise error code instead of a bare 413.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_deterministic() {
        let config = ExtractionConfig::default();
        let sampling = config.sampling();
        assert_eq!(sampling.temperature, 0.0);
        assert_eq!(sampling.top_p, 1.0);
        assert_eq!(sampling.max_tokens, 8141);
        assert_eq!(config.api_timeout(), Duration::from_secs(60));
        assert_eq!(config.models.len(), 2);
    }

    #[test]
    fn build_rejects_empty_model_list() {
        let err = ExtractionConfig::builder()
            .models(Vec::<String>::new())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("model"));
    }

    #[test]
    fn build_rejects_blank_model_and_zero_timeout() {
        assert!(ExtractionConfig::builder()
            .models(["gpt-4.1", "  "])
            .build()
            .is_err());
        assert!(ExtractionConfig::builder()
            .api_timeout_secs(0)
            .build()
            .is_err());
    }
}
