//! Upload, rendering and model limits shared by every stage.
//!
//! The client and the server validate uploads independently, against
//! overlapping but different limits. Both read them from here so the two
//! can never drift apart silently; see [`UploadLimits::client`] and
//! [`UploadLimits::server`].

use std::time::Duration;

const MIB: usize = 1024 * 1024;

/// Maximum number of page images in one submission.
pub const MAX_IMAGE_FILES: usize = 5;

/// Largest single image the server accepts.
pub const MAX_IMAGE_BYTES: usize = 2 * MIB;

/// Largest combined upload (client and server).
pub const MAX_TOTAL_BYTES: usize = 4 * MIB;

/// Only the first pages of a document are rasterised.
pub const MAX_PDF_PAGES: usize = 5;

/// Longest edge of a rasterised page, in pixels.
pub const MAX_RENDER_DIMENSION: u32 = 1600;

/// Small pages are enlarged, but never beyond this factor.
pub const MAX_RENDER_SCALE: f32 = 1.5;

/// JPEG quality for rasterised pages (0–100).
pub const JPEG_QUALITY: u8 = 80;

/// Output token cap for one extraction call.
pub const MAX_OUTPUT_TOKENS: usize = 8141;

/// Deadline for a single model attempt.
pub const MODEL_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Model identifiers tried in order: primary, then fallback.
pub const DEFAULT_MODELS: [&str; 2] = ["gpt-4.1-mini", "gpt-4.1"];

/// Limits applied by one validator instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    /// Maximum accepted image count.
    pub max_files: usize,
    /// Per-image cap; `None` when the validator does not check it.
    pub max_file_bytes: Option<usize>,
    /// Aggregate cap over all accepted images.
    pub max_total_bytes: usize,
}

impl UploadLimits {
    /// Advisory limits checked before anything leaves the client.
    pub const fn client() -> Self {
        Self {
            max_files: MAX_IMAGE_FILES,
            max_file_bytes: None,
            max_total_bytes: MAX_TOTAL_BYTES,
        }
    }

    /// Authoritative limits re-checked on every request the server receives.
    pub const fn server() -> Self {
        Self {
            max_files: MAX_IMAGE_FILES,
            max_file_bytes: Some(MAX_IMAGE_BYTES),
            max_total_bytes: MAX_TOTAL_BYTES,
        }
    }
}
