pub mod ai;
pub mod app;
pub mod clipboard;
pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod input;
pub mod logging;
pub mod notification;
pub mod render;
pub mod state;
pub mod storage;
pub mod toolbar;

use std::sync::Arc;

pub use app::{DesktopOverlayHost, OverlayHost, SessionCoordinator};
pub use error::{AppError, AppResult};

/// Entrypoint used by the platform shell: installs logging, loads settings and builds the host
/// that captured frames are handed to.
pub fn run() -> AppResult<DesktopOverlayHost> {
    logging::init();
    let settings = Arc::new(config::load_settings());
    tracing::info!(ai_enabled = settings.ai_enabled(), "starting cropmark");

    let storage = storage::StorageService::with_default_paths()?;
    let ai_client = Arc::new(ai::OpenAiImageEditClient::new()?);
    Ok(OverlayHost::new(
        settings,
        notification::DesktopNotifier,
        clipboard::CommandClipboardBackend::default(),
        storage,
        ai_client,
    ))
}
