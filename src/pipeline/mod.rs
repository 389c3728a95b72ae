//! Pipeline stages for certificate extraction.
//!
//! Each submodule implements exactly one step, so each can be tested on
//! its own and the rasteriser or model backend can be swapped without
//! touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! validate ──▶ render ──▶ encode ──▶ llm ──▶ parse
//! (limits)     (pdfium)   (base64)   (VLM)   (JSON span)
//! ```
//!
//! 1. [`validate`]: client or server upload rules
//! 2. [`render`]: rasterise up to five PDF pages; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`encode`]: base64-wrap each image for the request body
//! 4. [`llm`]: request shape and the [`llm::VisionBackend`] seam; the
//!    only stage with network I/O
//! 5. [`parse`]: interpret the model's free text

pub mod encode;
pub mod llm;
pub mod parse;
pub mod render;
pub mod validate;
