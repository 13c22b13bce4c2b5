//! Session-level errors

use pdf_engine::PdfEngineError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("{}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: PdfEngineError,
    },

    #[error("{}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: PdfEngineError,
    },

    #[error("{0}")]
    Edit(#[from] PdfEngineError),

    #[error("no document is open")]
    NoDocument,

    #[error("invalid edit: {0}")]
    InvalidEdit(String),
}

pub type EditorResult<T> = Result<T, EditorError>;
