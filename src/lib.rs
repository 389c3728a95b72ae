//! # certscan
//!
//! Extract ACORD 25 certificate-of-insurance fields from a PDF or a handful
//! of page photos using Vision Language Models (VLMs).
//!
//! ## Why this crate?
//!
//! Certificates of insurance arrive as scanned PDFs, phone photos and
//! printed-to-PDF web forms. Text extraction breaks on all three; a VLM reads
//! the form the way a person does and returns the fields as JSON. This crate
//! is the glue around that: it validates uploads, rasterises documents,
//! talks to the model with a fixed fallback order, and turns the model's
//! free text into a typed result.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files
//!  │
//!  ├─ 1. Validate  client rules (lenient) or server rules (authoritative)
//!  ├─ 2. Render    first 5 PDF pages → JPEG via pdfium (spawn_blocking)
//!  ├─ 3. Encode    bytes → base64 data URI
//!  ├─ 4. VLM       one request, primary model then fallback model
//!  └─ 5. Parse     first `{` … last `}` → certificate, or "not recognized"
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use certscan::{extract_files, ExtractionConfig, UploadFile};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads OPENAI_API_KEY for the default "openai" provider.
//!     let config = ExtractionConfig::default();
//!     let file = UploadFile::from_path(Path::new("certificate.pdf")).await?;
//!     let extraction = extract_files(vec![file], &config).await?;
//!     println!("{} answered: {}", extraction.model, extraction.data());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `certscan` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod limits;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod server;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, ServerConfig};
pub use error::{CertScanError, ErrorCode};
pub use extract::{extract_files, extract_untrusted, Extractor};
pub use output::{Certificate, CertificateData, Extraction, ExtractionOutcome, NotRecognizedReason};
pub use pipeline::llm::{BackendError, EdgequakeBackend, ExtractionRequest, ModelReply, VisionBackend};
pub use pipeline::validate::UploadValidator;
pub use upload::{MediaKind, UploadFile, UploadSet};
