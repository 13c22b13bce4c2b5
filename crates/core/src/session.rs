//! Editing session
//!
//! Owns the single open document together with its view state, the status
//! line, and the prompt flow awaiting input, if any. Every GUI action goes
//! through one of these methods.

use crate::edit::{apply_edit, EditRequest};
use crate::error::{EditorError, EditorResult};
use crate::prompt::{PromptFlow, PromptProgress};
use doc_model::{
    apply_view_action, InteractionMode, Preferences, ScreenPoint, ViewAction, ViewState,
};
use pdf_engine::{DocumentHandle, PdfDocument};
use std::path::Path;

pub const INITIAL_STATUS: &str = "Open a PDF to start editing.";

/// Identifies one rendered bitmap. Any field changing means the page must be
/// rasterized again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderKey {
    pub handle: DocumentHandle,
    pub revision: u64,
    pub page_index: u32,
    pub zoom_permille: u32,
}

/// What happened when the pending prompt was submitted.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptOutcome {
    /// The flow still waits for input (next step, or the same step after a
    /// rejected value).
    Pending,
    Aborted,
    Applied(EditRequest),
}

#[derive(Debug)]
pub struct EditorSession {
    document: Option<PdfDocument>,
    view: ViewState,
    status: String,
    pending: Option<PromptFlow>,
    preferences: Preferences,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(Preferences::default())
    }
}

impl EditorSession {
    pub fn new(preferences: Preferences) -> Self {
        let preferences = preferences.sanitized();

        Self {
            document: None,
            view: ViewState::with_scale(preferences.default_zoom),
            status: INITIAL_STATUS.to_string(),
            pending: None,
            preferences,
        }
    }

    pub fn document(&self) -> Option<&PdfDocument> {
        self.document.as_ref()
    }

    pub fn document_mut(&mut self) -> Option<&mut PdfDocument> {
        self.document.as_mut()
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn preferences_mut(&mut self) -> &mut Preferences {
        &mut self.preferences
    }

    pub fn page_label(&self) -> String {
        self.view.page_label()
    }

    /// Opens `path`, replacing the current document only once the new one parsed.
    pub fn open(&mut self, path: &Path) -> EditorResult<u32> {
        let document = PdfDocument::open(path).map_err(|source| {
            log::error!("failed to open {}: {source}", path.display());
            EditorError::Open { path: path.to_path_buf(), source }
        })?;

        let page_count = document.page_count();
        self.document = Some(document);
        self.pending = None;
        apply_view_action(&mut self.view, ViewAction::DocumentLoaded { page_count });
        self.status = format!("Opened: {}", path.display());

        log::info!("opened {} ({page_count} pages)", path.display());
        Ok(page_count)
    }

    pub fn prev_page(&mut self) -> bool {
        apply_view_action(&mut self.view, ViewAction::PreviousPage)
    }

    pub fn next_page(&mut self) -> bool {
        apply_view_action(&mut self.view, ViewAction::NextPage)
    }

    pub fn set_zoom(&mut self, scale: f32) -> bool {
        apply_view_action(&mut self.view, ViewAction::SetZoom(scale))
    }

    pub fn set_mode(&mut self, mode: InteractionMode) -> bool {
        apply_view_action(&mut self.view, ViewAction::SetMode(mode))
    }

    /// Handles a primary click at canvas-local coordinates. Returns whether a
    /// prompt flow was started.
    pub fn click(&mut self, point: ScreenPoint) -> bool {
        if self.document.is_none() || self.pending.is_some() {
            return false;
        }

        let page_index = self.view.page_index;
        let at = self.view.to_document(point);
        let prefs = &self.preferences;

        let flow = match self.view.mode {
            InteractionMode::View => return false,
            InteractionMode::InsertText => {
                PromptFlow::insert_text(page_index, at, prefs.default_font_size)
            }
            InteractionMode::Whiteout => PromptFlow::whiteout(
                page_index,
                at,
                prefs.default_whiteout_width,
                prefs.default_whiteout_height,
            ),
        };

        log::debug!("prompt started on page {} at ({:.1}, {:.1})", page_index + 1, at.x, at.y);
        self.pending = Some(flow);
        true
    }

    pub fn prompt(&self) -> Option<&PromptFlow> {
        self.pending.as_ref()
    }

    pub fn prompt_mut(&mut self) -> Option<&mut PromptFlow> {
        self.pending.as_mut()
    }

    /// Submits the current prompt step. A completed flow is applied right away;
    /// if the library rejects the edit the error is returned and the status
    /// line is left alone.
    pub fn submit_prompt(&mut self) -> EditorResult<PromptOutcome> {
        let Some(flow) = self.pending.as_mut() else {
            return Ok(PromptOutcome::Aborted);
        };

        match flow.submit() {
            PromptProgress::Next | PromptProgress::Invalid(_) => Ok(PromptOutcome::Pending),
            PromptProgress::Aborted => {
                self.pending = None;
                log::debug!("prompt aborted");
                Ok(PromptOutcome::Aborted)
            }
            PromptProgress::Complete(request) => {
                self.pending = None;
                self.apply(&request)?;
                Ok(PromptOutcome::Applied(request))
            }
        }
    }

    /// Drops the pending prompt. Returns whether there was one.
    pub fn cancel_prompt(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn apply(&mut self, request: &EditRequest) -> EditorResult<()> {
        let document = self.document.as_mut().ok_or(EditorError::NoDocument)?;

        apply_edit(document, request)?;
        log::debug!("edit applied on page {}", request.page_index() + 1);
        self.status = request.status_message();
        Ok(())
    }

    /// Writes the edited document to `path`. The document keeps its source path.
    pub fn save_as(&mut self, path: &Path) -> EditorResult<()> {
        let document = self.document.as_mut().ok_or(EditorError::NoDocument)?;

        document.save_as(path).map_err(|source| {
            log::error!("failed to save {}: {source}", path.display());
            EditorError::Save { path: path.to_path_buf(), source }
        })?;

        self.status = format!("Saved: {}", path.display());
        Ok(())
    }

    pub fn render_key(&self) -> Option<RenderKey> {
        let document = self.document.as_ref()?;

        Some(RenderKey {
            handle: document.handle(),
            revision: document.revision(),
            page_index: self.view.page_index,
            zoom_permille: self.view.zoom_permille(),
        })
    }
}
