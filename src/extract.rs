//! Extraction orchestrator: images in, [`Extraction`] out.
//!
//! ## Model fallback
//!
//! Model identifiers are tried strictly in configured order, each at most
//! once. The first model that answers wins, whether or not its answer turns
//! out to be a certificate; only call failures (transport, API, timeout)
//! move on to the next identifier. There is no retry of the same model and
//! no backoff. When the list is exhausted the last failure is reported as
//! `AI_ANALYSIS_FAILED`.

use crate::config::ExtractionConfig;
use crate::error::CertScanError;
use crate::output::{Extraction, ExtractionOutcome};
use crate::pipeline::encode::{self, EncodedImage};
use crate::pipeline::llm::{
    BackendError, EdgequakeBackend, ExtractionRequest, SamplingOptions, VisionBackend,
};
use crate::pipeline::parse::interpret_response;
use crate::pipeline::render;
use crate::pipeline::validate::UploadValidator;
use crate::prompts::extraction_instructions;
use crate::upload::{UploadFile, UploadSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Runs extraction requests against an ordered list of models.
#[derive(Clone)]
pub struct Extractor {
    backend: Arc<dyn VisionBackend>,
    models: Vec<String>,
    instructions: String,
    sampling: SamplingOptions,
    timeout: Duration,
    pdfium_lib_path: Option<PathBuf>,
}

impl Extractor {
    /// Build an extractor, resolving the backend from the config.
    ///
    /// A pre-built `config.backend` is used as-is; otherwise an
    /// [`EdgequakeBackend`] for `config.provider_name` is created.
    pub fn new(config: &ExtractionConfig) -> Self {
        let backend: Arc<dyn VisionBackend> = match config.backend {
            Some(ref backend) => Arc::clone(backend),
            None => Arc::new(EdgequakeBackend::new(config.provider_name.clone())),
        };

        Self {
            backend,
            models: config.models.clone(),
            instructions: extraction_instructions(config.system_prompt.as_deref()),
            sampling: config.sampling(),
            timeout: config.api_timeout(),
            pdfium_lib_path: config.pdfium_lib_path.clone(),
        }
    }

    /// Override the per-attempt deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Send the images to the first model that answers.
    pub async fn extract(&self, images: Vec<EncodedImage>) -> Result<Extraction, CertScanError> {
        if images.is_empty() {
            return Err(CertScanError::NoFiles);
        }

        let files_processed = images.len();
        let request = ExtractionRequest::new(self.instructions.clone(), images, self.sampling);
        let total = self.models.len();
        let mut last_error: Option<BackendError> = None;

        for (attempt, model) in self.models.iter().enumerate() {
            info!(
                "Analysing {} image(s) with {} (model {}/{})",
                files_processed,
                model,
                attempt + 1,
                total
            );
            let start = Instant::now();

            let result = match tokio::time::timeout(
                self.timeout,
                self.backend.complete(model, &request),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout {
                    secs: self.timeout.as_secs(),
                }),
            };

            match result {
                Ok(reply) => {
                    let outcome = interpret_response(&reply.content);
                    match &outcome {
                        ExtractionOutcome::Recognized(_) => info!(
                            "{} recognised the certificate in {}ms ({} tokens out)",
                            model,
                            start.elapsed().as_millis(),
                            reply.output_tokens
                        ),
                        ExtractionOutcome::NotRecognized(reason) => {
                            info!("{}: document not recognised ({})", model, reason)
                        }
                    }
                    return Ok(Extraction {
                        outcome,
                        model: model.clone(),
                        files_processed,
                    });
                }
                Err(e) => {
                    warn!(
                        "Model {} failed (attempt {}/{}): {}",
                        model,
                        attempt + 1,
                        total,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(CertScanError::AnalysisFailed {
                attempts: total,
                last_error: e.to_string(),
            }),
            None => Err(CertScanError::NoModels),
        }
    }

    /// Rasterise (documents) or encode (images) a validated upload, then
    /// extract.
    pub async fn extract_upload(&self, upload: UploadSet) -> Result<Extraction, CertScanError> {
        let images = match upload {
            UploadSet::Document(doc) => {
                let start = Instant::now();
                let pages =
                    render::rasterize_pdf(&doc.name, doc.bytes, self.pdfium_lib_path.clone())
                        .await?;
                info!(
                    "Rasterised {} page(s) of '{}' in {}ms",
                    pages.len(),
                    doc.name,
                    start.elapsed().as_millis()
                );
                pages
                    .iter()
                    .map(encode::encode_page)
                    .collect::<Result<Vec<_>, _>>()?
            }
            UploadSet::Images(files) => encode::encode_all(&files)?,
        };

        self.extract(images).await
    }
}

/// Validate local files with the client rules and extract in-process.
///
/// This is the library equivalent of `certscan extract FILE…` without a
/// `--server`.
pub async fn extract_files(
    files: Vec<UploadFile>,
    config: &ExtractionConfig,
) -> Result<Extraction, CertScanError> {
    let upload = UploadValidator::client().validate(files)?;
    Extractor::new(config).extract_upload(upload).await
}

/// Validate uploads with the server rules, encode them and extract.
///
/// Documents are rejected here; rasterisation is the client's job.
pub async fn extract_untrusted(
    extractor: &Extractor,
    files: Vec<UploadFile>,
) -> Result<Extraction, CertScanError> {
    let upload = UploadValidator::server().validate(files)?;
    extractor.extract_upload(upload).await
}
