//! PDF Editor Core Library
//!
//! Editing session state: the open document, the view, pending prompts, and
//! the gateway that turns edit requests into page content.

pub mod edit;
pub mod error;
pub mod prompt;
pub mod session;

pub use edit::{apply_edit, EditRequest};
pub use error::{EditorError, EditorResult};
pub use prompt::{PromptFlow, PromptProgress, PromptStep};
pub use session::{EditorSession, PromptOutcome, RenderKey, INITIAL_STATUS};
