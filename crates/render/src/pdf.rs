//! Page rasterization through PDFium.
//!
//! The editor mutates documents with lopdf, so PDFium only ever sees a
//! serialized snapshot. A snapshot is reloaded when the document handle or
//! its edit revision changes.

use pdf_engine::{DocumentHandle, PageGeometry};
use pdfium_render::prelude::*;
use std::sync::OnceLock;

static PDFIUM: OnceLock<Result<Pdfium, String>> = OnceLock::new();

/// Errors that can occur during PDF operations
#[derive(Debug)]
pub enum PdfError {
    /// Failed to initialize PDFium library
    InitializationError(String),

    /// Failed to load PDF document
    LoadError(String),

    /// Invalid page index
    InvalidPageIndex(u32),

    /// Rendering error
    RenderError(String),
}

impl std::fmt::Display for PdfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PdfError::InitializationError(msg) => write!(f, "PDFium initialization error: {}", msg),
            PdfError::LoadError(msg) => write!(f, "PDF load error: {}", msg),
            PdfError::InvalidPageIndex(idx) => write!(f, "Invalid page index: {}", idx),
            PdfError::RenderError(msg) => write!(f, "PDF render error: {}", msg),
        }
    }
}

impl std::error::Error for PdfError {}

/// Result type for PDF operations
pub type PdfResult<T> = Result<T, PdfError>;

/// RGBA pixels of one rendered page, 4 bytes per pixel, row-major.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl RenderedPage {
    /// RGBA value at `(x, y)`, if inside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let offset = ((y * self.width + x) * 4) as usize;
        let pixel = self.rgba.get(offset..offset + 4)?;
        Some([pixel[0], pixel[1], pixel[2], pixel[3]])
    }
}

/// Pixel size of a page rendered at `scale` on a display with
/// `pixels_per_point` physical pixels per logical point. Never zero.
pub fn target_size(geometry: &PageGeometry, scale: f32, pixels_per_point: f32) -> (u32, u32) {
    let (width, height) = geometry.display_size();
    let factor = scale * pixels_per_point;

    let dimension = |points: f32| -> u32 {
        let pixels = (points * factor).round();
        if pixels.is_finite() && pixels >= 1.0 {
            pixels as u32
        } else {
            1
        }
    };

    (dimension(width), dimension(height))
}

/// Shared PDFium binding.
///
/// Search order:
/// 1. Executable's directory (for app bundles: .app/Contents/MacOS/)
/// 2. Current working directory
/// 3. System library paths
///
/// PDFium may only be bound once per process, so the first outcome is kept.
fn shared_pdfium() -> PdfResult<&'static Pdfium> {
    PDFIUM
        .get_or_init(|| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));

            if let Some(ref dir) = exe_dir {
                if let Ok(bindings) =
                    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
                {
                    log::debug!("bound PDFium from {}", dir.display());
                    return Ok(Pdfium::new(bindings));
                }
            }

            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())
                .map(Pdfium::new)
                .map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|msg| PdfError::InitializationError(msg.clone()))
}

struct LoadedSnapshot {
    handle: DocumentHandle,
    revision: u64,
    document: PdfDocument<'static>,
}

/// Renders pages of a [`pdf_engine::PdfDocument`], caching the PDFium copy
/// of the most recent snapshot.
pub struct PageRasterizer {
    pdfium: &'static Pdfium,
    snapshot: Option<LoadedSnapshot>,
}

impl PageRasterizer {
    pub fn new() -> PdfResult<Self> {
        Ok(Self { pdfium: shared_pdfium()?, snapshot: None })
    }

    /// Drops the cached snapshot, e.g. after the document was closed.
    pub fn invalidate(&mut self) {
        self.snapshot = None;
    }

    pub fn render_page(
        &mut self,
        document: &mut pdf_engine::PdfDocument,
        page_index: u32,
        scale: f32,
        pixels_per_point: f32,
    ) -> PdfResult<RenderedPage> {
        let geometry = document
            .page_geometry(page_index)
            .map_err(|_| PdfError::InvalidPageIndex(page_index))?;
        let (width, height) = target_size(&geometry, scale, pixels_per_point);

        let snapshot = self.snapshot_for(document)?;
        let index = u16::try_from(page_index).map_err(|_| PdfError::InvalidPageIndex(page_index))?;
        let page = snapshot
            .document
            .pages()
            .get(index)
            .map_err(|_| PdfError::InvalidPageIndex(page_index))?;

        let config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_target_height(height as i32);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| PdfError::RenderError(e.to_string()))?;

        Ok(RenderedPage {
            width: bitmap.width() as u32,
            height: bitmap.height() as u32,
            rgba: bitmap.as_rgba_bytes().to_vec(),
        })
    }

    fn snapshot_for(
        &mut self,
        document: &mut pdf_engine::PdfDocument,
    ) -> PdfResult<&LoadedSnapshot> {
        let stale = self.snapshot.as_ref().map_or(true, |snapshot| {
            snapshot.handle != document.handle() || snapshot.revision != document.revision()
        });

        if stale {
            let bytes = document.to_bytes().map_err(|e| PdfError::LoadError(e.to_string()))?;
            let loaded = self
                .pdfium
                .load_pdf_from_byte_vec(bytes, None)
                .map_err(|e| PdfError::LoadError(e.to_string()))?;

            log::debug!(
                "loaded render snapshot for document {} revision {}",
                document.handle().raw(),
                document.revision()
            );
            self.snapshot = Some(LoadedSnapshot {
                handle: document.handle(),
                revision: document.revision(),
                document: loaded,
            });
        }

        self.snapshot
            .as_ref()
            .ok_or_else(|| PdfError::LoadError("render snapshot missing".to_string()))
    }
}
