//! PDF rasterisation: turn the first pages of a document into JPEG images.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and must not run on a Tokio worker. [`rasterize_pdf`] moves the
//! whole job onto the blocking pool.
//!
//! ## Sizing
//!
//! Each page is scaled so its longest edge is at most
//! [`MAX_RENDER_DIMENSION`] pixels, and small pages are enlarged by at most
//! [`MAX_RENDER_SCALE`]. Aspect ratio is preserved. Pages render one at a
//! time and each bitmap is dropped before the next page starts, so peak
//! memory is one page regardless of document length.

use crate::error::CertScanError;
use crate::limits::{JPEG_QUALITY, MAX_PDF_PAGES, MAX_RENDER_DIMENSION, MAX_RENDER_SCALE};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Media type of every rasterised page.
pub const RASTER_MEDIA_TYPE: &str = "image/jpeg";

/// One rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterPage {
    /// 0-based page index in the source document.
    pub page_index: usize,
    pub width: u32,
    pub height: u32,
    /// JPEG bytes.
    pub bytes: Vec<u8>,
}

impl RasterPage {
    pub fn media_type(&self) -> &'static str {
        RASTER_MEDIA_TYPE
    }
}

/// A paginated document the rasteriser can walk page by page.
///
/// Sizes are in the document's native units (PDF points); only their
/// ratio and magnitude matter.
pub trait PaginatedDocument {
    fn page_count(&self) -> usize;

    /// Natural `(width, height)` of a page, or `None` if it cannot be read.
    fn page_size(&self, index: usize) -> Option<(f32, f32)>;

    /// Render a page at exactly `width × height` pixels.
    fn render_page(&self, index: usize, width: u32, height: u32) -> Option<DynamicImage>;
}

/// Pixel size for a page of the given natural size.
///
/// Returns `None` for degenerate (zero, negative or non-finite) sizes.
pub fn target_size(width: f32, height: f32) -> Option<(u32, u32)> {
    if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
        return None;
    }
    let longest = width.max(height);
    let scale = (MAX_RENDER_DIMENSION as f32 / longest).min(MAX_RENDER_SCALE);

    let w = ((width * scale).round() as u32).clamp(1, MAX_RENDER_DIMENSION);
    let h = ((height * scale).round() as u32).clamp(1, MAX_RENDER_DIMENSION);
    Some((w, h))
}

/// Rasterise up to [`MAX_PDF_PAGES`] pages, in page order.
///
/// A page that cannot be measured, rendered or encoded is skipped with a
/// warning; the caller decides whether an empty result is fatal.
pub fn rasterize<D: PaginatedDocument + ?Sized>(doc: &D) -> Vec<RasterPage> {
    let total = doc.page_count();
    let selected = total.min(MAX_PDF_PAGES);
    if total > selected {
        info!("Document has {} pages; rasterising the first {}", total, selected);
    }

    let mut pages = Vec::with_capacity(selected);

    for index in 0..selected {
        let Some((natural_w, natural_h)) = doc.page_size(index) else {
            warn!("Skipping page {}: size unavailable", index + 1);
            continue;
        };
        let Some((width, height)) = target_size(natural_w, natural_h) else {
            warn!(
                "Skipping page {}: degenerate size {}x{}",
                index + 1,
                natural_w,
                natural_h
            );
            continue;
        };

        let Some(image) = doc.render_page(index, width, height) else {
            warn!("Skipping page {}: renderer returned no data", index + 1);
            continue;
        };

        let (rendered_w, rendered_h) = (image.width(), image.height());
        let encoded = encode_jpeg(&image);
        drop(image);

        match encoded {
            Ok(bytes) if !bytes.is_empty() => {
                debug!(
                    "Rendered page {} → {}x{} px, {} bytes",
                    index + 1,
                    rendered_w,
                    rendered_h,
                    bytes.len()
                );
                pages.push(RasterPage {
                    page_index: index,
                    width: rendered_w,
                    height: rendered_h,
                    bytes,
                });
            }
            Ok(_) => warn!("Skipping page {}: encoder produced no data", index + 1),
            Err(e) => warn!("Skipping page {}: JPEG encoding failed: {}", index + 1, e),
        }
    }

    pages
}

/// Encode an image as baseline JPEG at [`JPEG_QUALITY`].
pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let rgb = image.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY).encode_image(&rgb)?;
    Ok(buf)
}

/// [`PaginatedDocument`] over a pdfium document.
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumDocument<'a> {
    pub fn new(document: PdfDocument<'a>) -> Self {
        Self { document }
    }
}

impl PaginatedDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_size(&self, index: usize) -> Option<(f32, f32)> {
        let page = self.document.pages().get(index as u16).ok()?;
        Some((page.width().value, page.height().value))
    }

    fn render_page(&self, index: usize, width: u32, height: u32) -> Option<DynamicImage> {
        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| warn!("Page {}: load failed: {:?}", index + 1, e))
            .ok()?;

        let config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_target_height(height as i32);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| warn!("Page {}: render failed: {:?}", index + 1, e))
            .ok()?;

        Some(bitmap.as_image())
    }
}

/// Rasterise a PDF held in memory.
///
/// `pdfium_lib_dir` points at the directory holding the pdfium shared
/// library; when `None` the working directory and then the system library
/// path are tried.
pub async fn rasterize_pdf(
    name: &str,
    bytes: Vec<u8>,
    pdfium_lib_dir: Option<PathBuf>,
) -> Result<Vec<RasterPage>, CertScanError> {
    let name = name.to_string();

    tokio::task::spawn_blocking(move || {
        rasterize_pdf_blocking(&name, &bytes, pdfium_lib_dir.as_deref())
    })
    .await
    .map_err(|e| CertScanError::Internal(format!("Render task panicked: {}", e)))?
}

fn rasterize_pdf_blocking(
    name: &str,
    bytes: &[u8],
    pdfium_lib_dir: Option<&Path>,
) -> Result<Vec<RasterPage>, CertScanError> {
    let pdfium = bind_pdfium(pdfium_lib_dir)?;

    let document =
        pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| CertScanError::FileConversion {
                name: name.to_string(),
                detail: format!("{:?}", e),
            })?;

    let document = PdfiumDocument::new(document);
    info!("PDF '{}' loaded: {} pages", name, document.page_count());

    let pages = rasterize(&document);
    if pages.is_empty() {
        return Err(CertScanError::FileConversion {
            name: name.to_string(),
            detail: "no page could be rendered".into(),
        });
    }

    Ok(pages)
}

fn bind_pdfium(lib_dir: Option<&Path>) -> Result<Pdfium, CertScanError> {
    let bindings = match lib_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| CertScanError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_page_fits_max_dimension() {
        // US Letter in points.
        let (w, h) = target_size(612.0, 792.0).unwrap();
        assert!(w <= 1600 && h <= 1600);
        // 612 * 1.5 = 918, 792 * 1.5 = 1188: the upscale cap binds.
        assert_eq!((w, h), (918, 1188));
    }

    #[test]
    fn large_page_is_scaled_down() {
        let (w, h) = target_size(3000.0, 1500.0).unwrap();
        assert_eq!((w, h), (1600, 800));
    }

    #[test]
    fn degenerate_sizes_rejected() {
        assert!(target_size(0.0, 100.0).is_none());
        assert!(target_size(100.0, -1.0).is_none());
        assert!(target_size(f32::NAN, 100.0).is_none());
    }

    #[test]
    fn jpeg_encoding_produces_jfif() {
        let img = DynamicImage::new_rgba8(8, 8);
        let bytes = encode_jpeg(&img).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
