pub mod error;
pub mod event;
pub mod handles;
pub mod machine;
pub mod model;

pub use error::{StateError, StateResult};
pub use event::{OverlayCommand, OverlayEffect, PointerEvent};
pub use handles::Handle;
pub use machine::OverlaySession;
pub use model::{
    CaptureFrame, CreateDrag, CursorHint, InteractionMode, MoveTarget, ResizeTarget, ShapeDraft,
};
