//! Edit requests and the gateway that applies them to a document.

use crate::error::{EditorError, EditorResult};
use doc_model::{DocPoint, DocRect, FONT_SIZE_RANGE, WHITEOUT_SIZE_RANGE};
use pdf_engine::{PdfDocument, Rgb};

/// One mutation collected from a prompt flow or the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum EditRequest {
    /// Black Helvetica text with its baseline starting at `at`.
    InsertText {
        page_index: u32,
        at: DocPoint,
        text: String,
        font_size: u32,
    },

    /// Opaque white rectangle whose top-left corner is `at`.
    Whiteout {
        page_index: u32,
        at: DocPoint,
        width: u32,
        height: u32,
    },
}

impl EditRequest {
    pub fn page_index(&self) -> u32 {
        match self {
            EditRequest::InsertText { page_index, .. } | EditRequest::Whiteout { page_index, .. } => {
                *page_index
            }
        }
    }

    pub fn validate(&self) -> EditorResult<()> {
        let at = match self {
            EditRequest::InsertText { at, text, font_size, .. } => {
                if text.trim().is_empty() {
                    return Err(EditorError::InvalidEdit("text is empty".to_string()));
                }
                if !FONT_SIZE_RANGE.contains(font_size) {
                    return Err(EditorError::InvalidEdit(format!(
                        "font size {font_size} outside {}..={}",
                        FONT_SIZE_RANGE.start(),
                        FONT_SIZE_RANGE.end()
                    )));
                }
                at
            }
            EditRequest::Whiteout { at, width, height, .. } => {
                for (name, value) in [("width", width), ("height", height)] {
                    if !WHITEOUT_SIZE_RANGE.contains(value) {
                        return Err(EditorError::InvalidEdit(format!(
                            "{name} {value} outside {}..={}",
                            WHITEOUT_SIZE_RANGE.start(),
                            WHITEOUT_SIZE_RANGE.end()
                        )));
                    }
                }
                at
            }
        };

        if !(at.x.is_finite() && at.y.is_finite()) {
            return Err(EditorError::InvalidEdit("position is not a finite number".to_string()));
        }

        Ok(())
    }

    /// Status line shown after the edit was applied. Coordinates are rounded.
    pub fn status_message(&self) -> String {
        match self {
            EditRequest::InsertText { page_index, at, font_size, .. } => format!(
                "Inserted text on page {} at ({}, {}), size {}.",
                page_index + 1,
                round(at.x),
                round(at.y),
                font_size
            ),
            EditRequest::Whiteout { page_index, at, width, height } => format!(
                "Applied whiteout on page {}: ({}, {}) {}x{}.",
                page_index + 1,
                round(at.x),
                round(at.y),
                width,
                height
            ),
        }
    }
}

fn round(value: f32) -> i64 {
    value.round() as i64
}

/// Validates `request` and writes it into `document`. The document's revision
/// moves forward only when the edit was applied.
pub fn apply_edit(document: &mut PdfDocument, request: &EditRequest) -> EditorResult<()> {
    request.validate()?;

    match request {
        EditRequest::InsertText { page_index, at, text, font_size } => {
            document.insert_text(*page_index, *at, text, *font_size as f32, Rgb::BLACK)?
        }
        EditRequest::Whiteout { page_index, at, width, height } => {
            let rect = DocRect::new(*at, *width as f32, *height as f32);
            document.fill_rect(*page_index, rect, Rgb::WHITE)?
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_engine::fixtures::sample_pdf;
    use pdf_engine::PdfEngineError;

    fn insert(text: &str, font_size: u32) -> EditRequest {
        EditRequest::InsertText {
            page_index: 0,
            at: DocPoint::new(100.0, 50.0),
            text: text.to_string(),
            font_size,
        }
    }

    #[test]
    fn status_messages_round_coordinates() {
        let text = EditRequest::InsertText {
            page_index: 2,
            at: DocPoint::new(99.99999, 50.4),
            text: "Hi".into(),
            font_size: 14,
        };
        assert_eq!(text.status_message(), "Inserted text on page 3 at (100, 50), size 14.");

        let whiteout = EditRequest::Whiteout {
            page_index: 0,
            at: DocPoint::new(10.6, 20.2),
            width: 140,
            height: 30,
        };
        assert_eq!(whiteout.status_message(), "Applied whiteout on page 1: (11, 20) 140x30.");
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        assert!(insert("Hello", 12).validate().is_ok());
        assert!(matches!(insert("   ", 12).validate(), Err(EditorError::InvalidEdit(_))));
        assert!(matches!(insert("Hello", 5).validate(), Err(EditorError::InvalidEdit(_))));
        assert!(matches!(insert("Hello", 129).validate(), Err(EditorError::InvalidEdit(_))));

        let whiteout = |width, height| EditRequest::Whiteout {
            page_index: 0,
            at: DocPoint::new(0.0, 0.0),
            width,
            height,
        };
        assert!(whiteout(10, 2000).validate().is_ok());
        assert!(whiteout(9, 30).validate().is_err());
        assert!(whiteout(140, 2001).validate().is_err());
    }

    #[test]
    fn applied_edit_bumps_revision() {
        let mut document = PdfDocument::open(sample_pdf(1)).expect("open");

        apply_edit(&mut document, &insert("Hello", 14)).expect("apply");
        assert_eq!(document.revision(), 1);
    }

    #[test]
    fn rejected_edit_leaves_document_untouched() {
        let mut document = PdfDocument::open(sample_pdf(1)).expect("open");

        assert!(apply_edit(&mut document, &insert("", 14)).is_err());

        let off_page = EditRequest::Whiteout {
            page_index: 4,
            at: DocPoint::new(0.0, 0.0),
            width: 20,
            height: 20,
        };
        let err = apply_edit(&mut document, &off_page).expect_err("page out of range");
        assert!(matches!(err, EditorError::Edit(PdfEngineError::PageOutOfRange { .. })));
        assert_eq!(document.revision(), 0);
    }
}
