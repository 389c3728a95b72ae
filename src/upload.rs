//! Raw uploaded files and their classification.

use crate::error::CertScanError;
use std::path::Path;
use tracing::debug;

/// Media type of a paginated document.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// One raw file as received from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// What a media type says about a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// A paginated document that must be rasterised first.
    Document,
    /// A raster image that can be sent as-is.
    Image,
    /// Anything else.
    Other,
}

impl MediaKind {
    /// Classify a media type string (parameters and case are ignored).
    pub fn of(media_type: &str) -> Self {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if essence == PDF_MEDIA_TYPE {
            MediaKind::Document
        } else if essence.starts_with("image/") && essence.len() > "image/".len() {
            MediaKind::Image
        } else {
            MediaKind::Other
        }
    }
}

impl UploadFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Byte size of the file.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::of(&self.media_type)
    }

    /// Read a local file, guessing its media type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self, CertScanError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CertScanError::FileProcessing {
                name: name.clone(),
                detail: e.to_string(),
            })?;

        let media_type = guess_media_type(path).to_string();
        debug!("Loaded {} ({} bytes, {})", name, bytes.len(), media_type);

        Ok(Self {
            name,
            media_type,
            bytes,
        })
    }
}

/// Best-effort media type from a file extension.
pub fn guess_media_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => PDF_MEDIA_TYPE,
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// A validated upload: one document, or a bounded list of images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSet {
    Document(UploadFile),
    Images(Vec<UploadFile>),
}

impl UploadSet {
    /// Number of files that survived validation.
    pub fn len(&self) -> usize {
        match self {
            UploadSet::Document(_) => 1,
            UploadSet::Images(images) => images.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Combined byte size of the accepted files.
    pub fn total_bytes(&self) -> usize {
        match self {
            UploadSet::Document(doc) => doc.size(),
            UploadSet::Images(images) => images.iter().map(UploadFile::size).sum(),
        }
    }
}
