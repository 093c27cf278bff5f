//! Scene model: annotations, tool settings and the text being edited.

mod element;
mod scene;
mod text;
pub mod tools;

use std::path::PathBuf;

use crate::clipboard::{ClipboardBackend, ClipboardError};
use crate::storage::{CaptureStorage, StorageError};
use thiserror::Error;

pub use element::{DrawingElement, ElementShape, ElementStyle, FontSpec};
pub use scene::Scene;
pub use text::{ActiveTextEdit, ReplacedText, TextBuffer, TextEditOutcome};
pub use tools::{ColorTarget, ToolKind, ToolOptionVisibility, ToolState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    Save,
    Copy,
}

impl EditorAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::Copy => "copy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    Saved { path: PathBuf },
    Copied,
}

#[derive(Debug, Error)]
pub enum EditorActionError {
    #[error("storage error while saving {name}: {source}")]
    Storage {
        name: String,
        #[source]
        source: StorageError,
    },

    #[error("clipboard error while copying {name}: {source}")]
    Clipboard {
        name: String,
        #[source]
        source: ClipboardError,
    },
}

/// Hands an encoded image to the OS-facing collaborator for `action`.
pub fn execute_editor_action<S: CaptureStorage, C: ClipboardBackend>(
    name: &str,
    png: &[u8],
    action: EditorAction,
    storage: &S,
    clipboard: &C,
) -> Result<EditorEvent, EditorActionError> {
    match action {
        EditorAction::Save => {
            let path =
                storage
                    .save_png(name, png)
                    .map_err(|source| EditorActionError::Storage {
                        name: name.to_string(),
                        source,
                    })?;
            Ok(EditorEvent::Saved { path })
        }
        EditorAction::Copy => {
            clipboard
                .copy_png(png)
                .map_err(|source| EditorActionError::Clipboard {
                    name: name.to_string(),
                    source,
                })?;
            Ok(EditorEvent::Copied)
        }
    }
}
