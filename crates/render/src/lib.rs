//! PDF Editor Render Library
//!
//! Rasterizes pages of an edited document through PDFium.

pub mod pdf;

pub use pdf::{target_size, PageRasterizer, PdfError, PdfResult, RenderedPage};
