//! Error types for the certscan library.
//!
//! Every failure in the pipeline is a [`CertScanError`]. Each variant maps to
//! exactly one stable, machine-readable [`ErrorCode`] and one HTTP status, so
//! the boundary (HTTP handler or CLI) never has to interpret free-form text.
//!
//! Three families exist:
//!
//! * **Input errors** (400): the upload itself is unusable: empty, too many
//!   files, wrong type, too large, or unreadable.
//! * **Model errors** (500): every candidate model failed.
//! * **Internal errors** (500): configuration or runtime faults. Their detail
//!   is logged but never shown to HTTP callers.
//!
//! A document that is *not* an ACORD 25 is not an error at all; it is the
//! [`crate::output::ExtractionOutcome::NotRecognized`] outcome.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Stable error codes exposed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NoFiles,
    TooManyFiles,
    InvalidFileType,
    FileTooLarge,
    TotalSizeExceeded,
    FileProcessingError,
    FileConversionError,
    AiAnalysisFailed,
    AllModelsFailed,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NoFiles => "NO_FILES",
            ErrorCode::TooManyFiles => "TOO_MANY_FILES",
            ErrorCode::InvalidFileType => "INVALID_FILE_TYPE",
            ErrorCode::FileTooLarge => "FILE_TOO_LARGE",
            ErrorCode::TotalSizeExceeded => "TOTAL_SIZE_EXCEEDED",
            ErrorCode::FileProcessingError => "FILE_PROCESSING_ERROR",
            ErrorCode::FileConversionError => "FILE_CONVERSION_ERROR",
            ErrorCode::AiAnalysisFailed => "AI_ANALYSIS_FAILED",
            ErrorCode::AllModelsFailed => "ALL_MODELS_FAILED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    /// HTTP status the code is reported with.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorCode::NoFiles
            | ErrorCode::TooManyFiles
            | ErrorCode::InvalidFileType
            | ErrorCode::FileTooLarge
            | ErrorCode::TotalSizeExceeded
            | ErrorCode::FileProcessingError
            | ErrorCode::FileConversionError => 400,
            ErrorCode::AiAnalysisFailed | ErrorCode::AllModelsFailed | ErrorCode::InternalError => {
                500
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All errors returned by the certscan library.
#[derive(Debug, Error)]
pub enum CertScanError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The submission contained no files at all.
    #[error("No files were uploaded")]
    NoFiles,

    /// More images than the validator allows.
    #[error("Too many files: {count} uploaded, at most {max} allowed")]
    TooManyFiles { count: usize, max: usize },

    /// A file is neither an image nor (client side) a PDF.
    #[error("Unsupported file type '{media_type}' for '{name}'; upload images or a single PDF")]
    InvalidFileType { name: String, media_type: String },

    /// None of the submitted files could be used.
    #[error("None of the {count} uploaded files is an image or a PDF")]
    NoSupportedFiles { count: usize },

    /// A single image exceeds the per-file cap.
    #[error("File '{name}' is {size} bytes; the limit is {max} bytes")]
    FileTooLarge { name: String, size: usize, max: usize },

    /// The accepted images exceed the aggregate cap.
    #[error("Combined upload size {total} bytes exceeds the limit of {max} bytes")]
    TotalSizeExceeded { total: usize, max: usize },

    /// The request body hit the transport limit before it was fully read.
    #[error("Request body exceeds the limit of {max} bytes")]
    RequestTooLarge { max: usize },

    /// A file's bytes could not be read or encoded.
    #[error("Failed to process '{name}': {detail}")]
    FileProcessing { name: String, detail: String },

    /// A PDF could not be rasterised into page images.
    #[error("Failed to convert document '{name}': {detail}")]
    FileConversion { name: String, detail: String },

    // ── Model errors ──────────────────────────────────────────────────────
    /// Every candidate model failed; carries the last failure.
    #[error("AI analysis failed after {attempts} model attempt(s): {last_error}")]
    AnalysisFailed { attempts: usize, last_error: String },

    /// The candidate list was empty, so nothing was attempted.
    #[error("No model identifiers are configured")]
    NoModels,

    // ── Internal errors ───────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH (or --pdfium-lib-path) to the directory containing libpdfium."
    )]
    PdfiumBindingFailed(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CertScanError {
    /// Machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            CertScanError::NoFiles => ErrorCode::NoFiles,
            CertScanError::TooManyFiles { .. } => ErrorCode::TooManyFiles,
            CertScanError::InvalidFileType { .. } | CertScanError::NoSupportedFiles { .. } => {
                ErrorCode::InvalidFileType
            }
            CertScanError::FileTooLarge { .. } => ErrorCode::FileTooLarge,
            CertScanError::TotalSizeExceeded { .. } | CertScanError::RequestTooLarge { .. } => {
                ErrorCode::TotalSizeExceeded
            }
            CertScanError::FileProcessing { .. } => ErrorCode::FileProcessingError,
            CertScanError::FileConversion { .. } => ErrorCode::FileConversionError,
            CertScanError::AnalysisFailed { .. } => ErrorCode::AiAnalysisFailed,
            CertScanError::NoModels => ErrorCode::AllModelsFailed,
            CertScanError::InvalidConfig(_)
            | CertScanError::PdfiumBindingFailed(_)
            | CertScanError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// HTTP status for this error.
    pub fn http_status(&self) -> u16 {
        self.code().http_status()
    }

    /// Message safe to show to a remote caller.
    ///
    /// Internal errors collapse to a generic sentence; everything else is the
    /// `Display` text.
    pub fn public_message(&self) -> String {
        match self.code() {
            ErrorCode::InternalError => "An unexpected error occurred".to_string(),
            _ => self.to_string(),
        }
    }
}
