use thiserror::Error;

pub type StateResult<T> = std::result::Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid capture for display {display_id}: {reason}")]
    InvalidCapture {
        display_id: u32,
        reason: &'static str,
    },
}
