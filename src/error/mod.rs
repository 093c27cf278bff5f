use crate::ai::AiEditError;
use crate::clipboard::ClipboardError;
use crate::editor::EditorActionError;
use crate::render::ExportError;
use crate::state::StateError;
use crate::storage::StorageError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    AiEdit(#[from] AiEditError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
    #[error(transparent)]
    EditorAction(#[from] EditorActionError),
}
