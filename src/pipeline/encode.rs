//! Image encoding: raw bytes → base64 payload for the vision request.
//!
//! Uploaded images are forwarded untouched (no re-encoding), rasterised
//! pages are already JPEG. Both end up as an [`EncodedImage`], which knows
//! how to present itself as a `data:` URI or as the provider crate's
//! `ImageData`.

use crate::error::CertScanError;
use crate::pipeline::render::RasterPage;
use crate::upload::UploadFile;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use tracing::debug;

/// A media type plus base64 payload, built once and consumed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub media_type: String,
    /// Standard (padded) base64 of the image bytes.
    pub data: String,
}

impl EncodedImage {
    /// `data:<mediaType>;base64,<payload>`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }

    /// Convert into the provider crate's image attachment.
    ///
    /// `detail: "high"` keeps fine print on certificate forms legible.
    pub fn to_image_data(&self) -> ImageData {
        ImageData::new(self.data.clone(), self.media_type.clone()).with_detail("high")
    }
}

fn encode_bytes(name: &str, media_type: &str, bytes: &[u8]) -> Result<EncodedImage, CertScanError> {
    if bytes.is_empty() {
        return Err(CertScanError::FileProcessing {
            name: name.to_string(),
            detail: "no image data".into(),
        });
    }
    let data = STANDARD.encode(bytes);
    debug!("Encoded {} → {} bytes base64", name, data.len());

    Ok(EncodedImage {
        media_type: media_type.to_string(),
        data,
    })
}

/// Encode a directly uploaded image.
pub fn encode_upload(file: &UploadFile) -> Result<EncodedImage, CertScanError> {
    encode_bytes(&file.name, &file.media_type, &file.bytes)
}

/// Encode a rasterised document page.
pub fn encode_page(page: &RasterPage) -> Result<EncodedImage, CertScanError> {
    encode_bytes(
        &format!("page {}", page.page_index + 1),
        page.media_type(),
        &page.bytes,
    )
}

/// Encode every upload, failing the whole batch on the first bad file.
pub fn encode_all(files: &[UploadFile]) -> Result<Vec<EncodedImage>, CertScanError> {
    files.iter().map(encode_upload).collect()
}
