//! Upload validation, run once on the client and again on the server.
//!
//! The two validators share [`crate::limits`] but apply different policies:
//!
//! | check | client | server |
//! |-------|--------|--------|
//! | no files | `NO_FILES` | `NO_FILES` |
//! | a PDF present | keep the first PDF, drop everything else | `INVALID_FILE_TYPE` |
//! | non-image files | dropped; `INVALID_FILE_TYPE` if nothing remains | `INVALID_FILE_TYPE` |
//! | more than 5 images | truncated to the first 5 | `TOO_MANY_FILES` |
//! | one image over 2 MiB | not checked | `FILE_TOO_LARGE` |
//! | total over 4 MiB | `TOTAL_SIZE_EXCEEDED` | `TOTAL_SIZE_EXCEEDED` |
//!
//! The server never assumes the client validator ran: anything arriving
//! over HTTP is untrusted and goes through [`UploadValidator::server`].

use crate::error::CertScanError;
use crate::limits::UploadLimits;
use crate::upload::{MediaKind, UploadFile, UploadSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Client,
    Server,
}

/// One validator instance with its own policy and limits.
#[derive(Debug, Clone, Copy)]
pub struct UploadValidator {
    side: Side,
    limits: UploadLimits,
}

impl UploadValidator {
    /// Lenient pre-submission checks.
    pub const fn client() -> Self {
        Self {
            side: Side::Client,
            limits: UploadLimits::client(),
        }
    }

    /// Authoritative checks for untrusted input.
    pub const fn server() -> Self {
        Self {
            side: Side::Server,
            limits: UploadLimits::server(),
        }
    }

    pub fn limits(&self) -> UploadLimits {
        self.limits
    }

    /// Validate a raw file collection.
    ///
    /// The server validator only ever returns [`UploadSet::Images`].
    pub fn validate(&self, files: Vec<UploadFile>) -> Result<UploadSet, CertScanError> {
        if files.is_empty() {
            return Err(CertScanError::NoFiles);
        }
        match self.side {
            Side::Client => self.validate_client(files),
            Side::Server => self.validate_server(files),
        }
    }

    fn validate_client(&self, files: Vec<UploadFile>) -> Result<UploadSet, CertScanError> {
        let received = files.len();

        // Document mode: the first PDF wins, other files are ignored.
        if let Some(pos) = files.iter().position(|f| f.kind() == MediaKind::Document) {
            let doc = files
                .into_iter()
                .nth(pos)
                .ok_or_else(|| CertScanError::Internal("document index out of range".into()))?;
            if received > 1 {
                debug!(
                    "Document mode: using '{}', ignoring {} other file(s)",
                    doc.name,
                    received - 1
                );
            }
            ensure_not_empty(&doc)?;
            return Ok(UploadSet::Document(doc));
        }

        let mut images: Vec<UploadFile> = files
            .into_iter()
            .filter(|f| f.kind() == MediaKind::Image)
            .collect();

        if images.is_empty() {
            return Err(CertScanError::NoSupportedFiles { count: received });
        }

        if images.len() > self.limits.max_files {
            debug!(
                "Keeping the first {} of {} images",
                self.limits.max_files,
                images.len()
            );
            images.truncate(self.limits.max_files);
        }

        for image in &images {
            ensure_not_empty(image)?;
        }
        self.check_total(&images)?;

        Ok(UploadSet::Images(images))
    }

    fn validate_server(&self, files: Vec<UploadFile>) -> Result<UploadSet, CertScanError> {
        if let Some(bad) = files.iter().find(|f| f.kind() != MediaKind::Image) {
            return Err(CertScanError::InvalidFileType {
                name: bad.name.clone(),
                media_type: bad.media_type.clone(),
            });
        }

        if files.len() > self.limits.max_files {
            return Err(CertScanError::TooManyFiles {
                count: files.len(),
                max: self.limits.max_files,
            });
        }

        for file in &files {
            ensure_not_empty(file)?;
            if let Some(max) = self.limits.max_file_bytes {
                if file.size() > max {
                    return Err(CertScanError::FileTooLarge {
                        name: file.name.clone(),
                        size: file.size(),
                        max,
                    });
                }
            }
        }
        self.check_total(&files)?;

        Ok(UploadSet::Images(files))
    }

    fn check_total(&self, images: &[UploadFile]) -> Result<(), CertScanError> {
        let total: usize = images.iter().map(UploadFile::size).sum();
        if total > self.limits.max_total_bytes {
            return Err(CertScanError::TotalSizeExceeded {
                total,
                max: self.limits.max_total_bytes,
            });
        }
        Ok(())
    }
}

fn ensure_not_empty(file: &UploadFile) -> Result<(), CertScanError> {
    if file.bytes.is_empty() {
        return Err(CertScanError::FileProcessing {
            name: file.name.clone(),
            detail: "file is empty".into(),
        });
    }
    Ok(())
}
