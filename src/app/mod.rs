//! Host layer: one overlay session per display, effect execution, and the AI worker.

mod coordinator;
mod host;
mod worker;

pub use coordinator::SessionCoordinator;
pub use host::OverlayHost;

use crate::ai::OpenAiImageEditClient;
use crate::clipboard::CommandClipboardBackend;
use crate::notification::DesktopNotifier;
use crate::storage::StorageService;

/// Host wired to the desktop notifier, clipboard command, `~/Pictures` and the OpenAI client.
pub type DesktopOverlayHost =
    OverlayHost<DesktopNotifier, CommandClipboardBackend, StorageService, OpenAiImageEditClient>;
