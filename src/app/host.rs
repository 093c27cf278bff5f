use std::collections::BTreeSet;
use std::sync::{mpsc, Arc};
use std::time::SystemTime;

use image::RgbaImage;

use crate::ai::{run_job, AiEditCompletion, AiEditJob, ImageEditClient};
use crate::clipboard::ClipboardBackend;
use crate::config::OverlaySettings;
use crate::editor::{execute_editor_action, EditorAction, EditorEvent};
use crate::error::{AppError, AppResult};
use crate::geometry::Point;
use crate::input::{ShortcutKey, ShortcutModifiers};
use crate::notification::Notifier;
use crate::render::{compose_frame, rasterize, ExportResult, FontBook};
use crate::state::{
    CaptureFrame, CursorHint, OverlayCommand, OverlayEffect, OverlaySession, PointerEvent,
};
use crate::storage::{default_image_name, CaptureStorage};

use super::coordinator::SessionCoordinator;
use super::worker::spawn_worker_action;

const COPIED_MESSAGE: &str = "Copied to clipboard";

/// Event-thread side of the overlay: routes input to sessions and performs their effects.
pub struct OverlayHost<N, C, S, A>
where
    N: Notifier,
    C: ClipboardBackend,
    S: CaptureStorage,
    A: ImageEditClient + 'static,
{
    coordinator: SessionCoordinator,
    notifier: N,
    clipboard: C,
    storage: S,
    ai_client: Arc<A>,
    ai_tx: mpsc::Sender<AiEditCompletion>,
    ai_rx: mpsc::Receiver<AiEditCompletion>,
    redraw: BTreeSet<u32>,
}

impl<N, C, S, A> OverlayHost<N, C, S, A>
where
    N: Notifier,
    C: ClipboardBackend,
    S: CaptureStorage,
    A: ImageEditClient + 'static,
{
    pub fn new(
        settings: Arc<OverlaySettings>,
        notifier: N,
        clipboard: C,
        storage: S,
        ai_client: Arc<A>,
    ) -> Self {
        let (ai_tx, ai_rx) = mpsc::channel();
        Self {
            coordinator: SessionCoordinator::new(settings),
            notifier,
            clipboard,
            storage,
            ai_client,
            ai_tx,
            ai_rx,
            redraw: BTreeSet::new(),
        }
    }

    pub fn coordinator(&self) -> &SessionCoordinator {
        &self.coordinator
    }

    pub fn session(&self, display_id: u32) -> Option<&OverlaySession> {
        self.coordinator.session(display_id)
    }

    pub fn is_open(&self) -> bool {
        !self.coordinator.is_empty()
    }

    /// Opens one overlay per frame; a bad frame only skips its own display.
    pub fn open_overlays(&mut self, frames: impl IntoIterator<Item = CaptureFrame>) -> usize {
        let mut opened = 0;
        for frame in frames {
            let display_id = frame.display_id;
            match self.coordinator.open(frame) {
                Ok(()) => {
                    self.redraw.insert(display_id);
                    opened += 1;
                }
                Err(err) => tracing::warn!(display_id, %err, "skipping overlay for display"),
            }
        }
        opened
    }

    pub fn close_all(&mut self) {
        self.coordinator.close_all();
        self.redraw.clear();
    }

    pub fn pointer_down(&mut self, display_id: u32, event: PointerEvent) {
        self.with_session(display_id, |session| session.pointer_down(event));
    }

    pub fn pointer_drag(&mut self, display_id: u32, event: PointerEvent) {
        self.with_session(display_id, |session| session.pointer_drag(event));
    }

    pub fn pointer_up(&mut self, display_id: u32, event: PointerEvent) {
        self.with_session(display_id, |session| session.pointer_up(event));
    }

    pub fn pointer_move(&mut self, display_id: u32, location: Point) -> CursorHint {
        let mut hint = CursorHint::default();
        self.with_session(display_id, |session| {
            let (cursor, effects) = session.pointer_move(location);
            hint = cursor;
            effects
        });
        hint
    }

    pub fn key(&mut self, display_id: u32, key: ShortcutKey, modifiers: ShortcutModifiers) {
        self.with_session(display_id, |session| session.handle_key(key, modifiers));
    }

    pub fn command(&mut self, display_id: u32, command: OverlayCommand) {
        self.with_session(display_id, |session| session.handle_command(command));
    }

    /// Displays whose overlay changed since the last call.
    pub fn take_redraws(&mut self) -> Vec<u32> {
        std::mem::take(&mut self.redraw).into_iter().collect()
    }

    /// Rasterizes the current overlay for `display_id` at source-pixel size.
    pub fn render(&self, display_id: u32, dash_phase: f32) -> Option<ExportResult<RgbaImage>> {
        let session = self.coordinator.session(display_id)?;
        Some(rasterize(
            &compose_frame(session, dash_phase),
            FontBook::shared(),
        ))
    }

    /// Applies finished AI requests. Returns how many reached a live session.
    pub fn pump_ai_results(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.ai_rx.try_recv() {
            let display_id = completion.ticket.display_id;
            let Some(session) = self.coordinator.session_mut(display_id) else {
                tracing::debug!(display_id, "dropping AI result for closed overlay");
                continue;
            };
            let effects = session.apply_ai_result(completion);
            if !effects.is_empty() {
                applied += 1;
            }
            self.dispatch(display_id, effects);
        }
        applied
    }

    fn with_session<F>(&mut self, display_id: u32, handler: F)
    where
        F: FnOnce(&mut OverlaySession) -> Vec<OverlayEffect>,
    {
        let Some(session) = self.coordinator.session_mut(display_id) else {
            tracing::debug!(display_id, "input for unknown overlay ignored");
            return;
        };
        let effects = handler(session);
        self.dispatch(display_id, effects);
    }

    fn dispatch(&mut self, display_id: u32, effects: Vec<OverlayEffect>) {
        for effect in effects {
            match effect {
                OverlayEffect::Redraw => {
                    if self.coordinator.session(display_id).is_some() {
                        self.redraw.insert(display_id);
                    }
                }
                OverlayEffect::SelectionStarted => {
                    for (other, effects) in self.coordinator.clear_others(display_id) {
                        if effects.contains(&OverlayEffect::Redraw) {
                            self.redraw.insert(other);
                        }
                    }
                }
                OverlayEffect::Notify(message) => self.notifier.notify(&message),
                OverlayEffect::CopyImage => self.deliver(display_id, EditorAction::Copy),
                OverlayEffect::SaveImage => self.deliver(display_id, EditorAction::Save),
                OverlayEffect::SendAiRequest(job) => self.spawn_ai_job(job),
                OverlayEffect::CloseOverlay => self.close_all(),
            }
        }
    }

    /// Exports the selection for copy or save, reports the outcome and closes every overlay.
    fn deliver(&mut self, display_id: u32, action: EditorAction) {
        let Some(session) = self.coordinator.session(display_id) else {
            return;
        };
        let name = default_image_name(SystemTime::now());
        let outcome: AppResult<EditorEvent> = session
            .export_png()
            .map_err(AppError::from)
            .and_then(|png| {
                execute_editor_action(&name, &png, action, &self.storage, &self.clipboard)
                    .map_err(AppError::from)
            });
        match outcome {
            Ok(EditorEvent::Saved { path }) => {
                tracing::info!(display_id, path = %path.display(), "selection saved");
                self.notifier
                    .notify(&format!("Saved to {}", path.display()));
            }
            Ok(EditorEvent::Copied) => {
                tracing::info!(display_id, "selection copied");
                self.notifier.notify(COPIED_MESSAGE);
            }
            Err(err) => {
                tracing::warn!(display_id, action = action.label(), %err, "export failed");
                self.notifier
                    .notify(&format!("Failed to {} image: {err}", action.label()));
            }
        }
        self.close_all();
    }

    fn spawn_ai_job(&self, job: AiEditJob) {
        tracing::debug!(ticket = ?job.ticket, "spawning AI edit worker");
        let client = Arc::clone(&self.ai_client);
        spawn_worker_action(move || run_job(client.as_ref(), &job), self.ai_tx.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiEditError, AiEditResult};
    use crate::clipboard::{ClipboardError, ClipboardResult};
    use crate::editor::ToolKind;
    use crate::geometry::Rect;
    use crate::render::encode_png;
    use crate::storage::StorageResult;
    use image::Rgba;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        messages: Rc<RefCell<Vec<String>>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, body: &str) {
            self.messages.borrow_mut().push(body.to_string());
        }
    }

    #[derive(Clone, Default)]
    struct MockClipboard {
        copied: Rc<RefCell<Vec<usize>>>,
        fail: bool,
    }

    impl ClipboardBackend for MockClipboard {
        fn copy_png(&self, png: &[u8]) -> ClipboardResult<()> {
            if self.fail {
                return Err(ClipboardError::CommandFailed {
                    status: "exit status: 1".to_string(),
                });
            }
            self.copied.borrow_mut().push(png.len());
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct MockStorage {
        saved: Rc<RefCell<Vec<String>>>,
    }

    impl CaptureStorage for MockStorage {
        fn save_png(&self, name: &str, _png: &[u8]) -> StorageResult<PathBuf> {
            self.saved.borrow_mut().push(name.to_string());
            Ok(PathBuf::from(format!("/tmp/{name}.png")))
        }
    }

    struct SolidClient {
        png: Vec<u8>,
    }

    impl SolidClient {
        fn green() -> Self {
            let image = RgbaImage::from_pixel(16, 16, Rgba([0, 255, 0, 255]));
            Self {
                png: encode_png(&image).expect("encode"),
            }
        }
    }

    impl ImageEditClient for SolidClient {
        fn edit_image(&self, _job: &AiEditJob) -> AiEditResult<Vec<u8>> {
            if self.png.is_empty() {
                return Err(AiEditError::MissingImage);
            }
            Ok(self.png.clone())
        }
    }

    type TestHost = OverlayHost<RecordingNotifier, MockClipboard, MockStorage, SolidClient>;

    struct Harness {
        host: TestHost,
        notifier: RecordingNotifier,
        clipboard: MockClipboard,
        storage: MockStorage,
    }

    fn harness_with(
        settings: OverlaySettings,
        clipboard: MockClipboard,
        client: SolidClient,
    ) -> Harness {
        let notifier = RecordingNotifier::default();
        let storage = MockStorage::default();
        let mut host = OverlayHost::new(
            Arc::new(settings),
            notifier.clone(),
            clipboard.clone(),
            storage.clone(),
            Arc::new(client),
        );
        host.open_overlays([frame(1), frame(2)]);
        Harness {
            host,
            notifier,
            clipboard,
            storage,
        }
    }

    fn harness() -> Harness {
        harness_with(
            OverlaySettings::default(),
            MockClipboard::default(),
            SolidClient::green(),
        )
    }

    fn ai_settings() -> OverlaySettings {
        OverlaySettings {
            api_key: "sk-test".to_string(),
            ..OverlaySettings::default()
        }
    }

    fn frame(display_id: u32) -> CaptureFrame {
        CaptureFrame {
            display_id,
            bitmap: Arc::new(RgbaImage::from_pixel(800, 600, Rgba([40, 40, 40, 255]))),
            view_bounds: Rect::new(0.0, 0.0, 400.0, 300.0),
        }
    }

    fn select(host: &mut TestHost, display_id: u32) {
        host.pointer_down(display_id, PointerEvent::at(100.0, 100.0));
        host.pointer_drag(display_id, PointerEvent::at(200.0, 180.0));
        host.pointer_up(display_id, PointerEvent::at(200.0, 180.0));
    }

    fn wait_for_ai(host: &mut TestHost) -> usize {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let applied = host.pump_ai_results();
            if applied > 0 || Instant::now() >= deadline {
                return applied;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn selection_on_one_display_clears_the_other() {
        let mut h = harness();
        select(&mut h.host, 1);
        h.host.take_redraws();
        select(&mut h.host, 2);

        assert!(h.host.session(1).expect("1").selection().is_none());
        assert!(h.host.session(2).expect("2").selection().is_some());
        assert_eq!(h.host.take_redraws(), vec![1, 2]);
    }

    #[test]
    fn copy_exports_notifies_and_closes_every_overlay() {
        let mut h = harness();
        select(&mut h.host, 1);
        h.host.command(1, OverlayCommand::Copy);

        assert_eq!(h.clipboard.copied.borrow().len(), 1);
        assert_eq!(h.notifier.messages.borrow().as_slice(), [COPIED_MESSAGE]);
        assert!(!h.host.is_open());
    }

    #[test]
    fn save_reports_path_and_closes() {
        let mut h = harness();
        select(&mut h.host, 2);
        h.host.key(
            2,
            ShortcutKey::Character('s'),
            ShortcutModifiers::command(),
        );

        assert_eq!(h.storage.saved.borrow().len(), 1);
        let messages = h.notifier.messages.borrow();
        assert!(messages[0].starts_with("Saved to /tmp/"));
        assert!(!h.host.is_open());
    }

    #[test]
    fn failed_copy_still_closes_with_failure_message() {
        let mut h = harness_with(
            OverlaySettings::default(),
            MockClipboard {
                fail: true,
                ..MockClipboard::default()
            },
            SolidClient::green(),
        );
        select(&mut h.host, 1);
        h.host.command(1, OverlayCommand::Copy);

        let messages = h.notifier.messages.borrow();
        assert!(messages[0].starts_with("Failed to copy image"));
        assert!(!h.host.is_open());
    }

    #[test]
    fn escape_closes_all_overlays() {
        let mut h = harness();
        h.host
            .key(1, ShortcutKey::Escape, ShortcutModifiers::default());
        assert!(!h.host.is_open());
        assert!(h.host.take_redraws().is_empty());
    }

    #[test]
    fn ai_round_trip_applies_resized_result() {
        let mut h = harness_with(ai_settings(), MockClipboard::default(), SolidClient::green());
        select(&mut h.host, 1);
        h.host.command(1, OverlayCommand::SelectTool(ToolKind::Ai));
        h.host
            .command(1, OverlayCommand::SetAiPrompt("make it green".to_string()));
        h.host.command(1, OverlayCommand::SendAi);
        assert!(h.host.session(1).expect("session").ai().is_sending());

        assert_eq!(wait_for_ai(&mut h.host), 1);
        let session = h.host.session(1).expect("session");
        assert!(!session.ai().is_sending());
        let result = session.ai().result().expect("AI result stored");
        assert_eq!(result.dimensions(), (200, 160));
        assert_eq!(result.get_pixel(3, 3), &Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn ai_failure_notifies_and_keeps_previous_state() {
        let mut h = harness_with(
            ai_settings(),
            MockClipboard::default(),
            SolidClient { png: Vec::new() },
        );
        select(&mut h.host, 1);
        h.host.command(1, OverlayCommand::SelectTool(ToolKind::Ai));
        h.host
            .command(1, OverlayCommand::SetAiPrompt("remove text".to_string()));
        h.host.command(1, OverlayCommand::SendAi);

        assert_eq!(wait_for_ai(&mut h.host), 1);
        let session = h.host.session(1).expect("session");
        assert!(!session.ai().is_sending());
        assert!(session.ai().result().is_none());
        assert!(h.notifier.messages.borrow()[0].starts_with("AI: processing failed"));
    }

    #[test]
    fn ai_result_for_replaced_selection_is_dropped() {
        let mut h = harness_with(ai_settings(), MockClipboard::default(), SolidClient::green());
        select(&mut h.host, 1);
        h.host.command(1, OverlayCommand::SelectTool(ToolKind::Ai));
        h.host
            .command(1, OverlayCommand::SetAiPrompt("brighter".to_string()));
        h.host.command(1, OverlayCommand::SendAi);
        h.host.command(1, OverlayCommand::SelectTool(ToolKind::Move));
        // Starting a new selection bumps the generation.
        h.host.pointer_down(1, PointerEvent::at(10.0, 290.0));

        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(h.host.pump_ai_results(), 0);
        assert!(h.host.session(1).expect("session").ai().result().is_none());
    }

    #[test]
    fn ai_result_from_closed_overlay_skips_reopened_display() {
        let mut h = harness_with(ai_settings(), MockClipboard::default(), SolidClient::green());
        select(&mut h.host, 1);
        h.host.command(1, OverlayCommand::SelectTool(ToolKind::Ai));
        h.host
            .command(1, OverlayCommand::SetAiPrompt("green".to_string()));
        h.host.command(1, OverlayCommand::SendAi);
        h.host.command(1, OverlayCommand::Close);
        assert!(!h.host.is_open());

        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(h.host.open_overlays([frame(1)]), 1);
        select(&mut h.host, 1);
        // Same display and the same first-selection generation as the closed overlay.
        assert_eq!(h.host.session(1).expect("session").ticket().generation, 1);

        assert_eq!(h.host.pump_ai_results(), 0);
        let session = h.host.session(1).expect("session");
        assert!(session.ai().result().is_none());
        assert!(!session.ai().is_sending());
    }

    #[test]
    fn render_produces_source_sized_frame() {
        let mut h = harness();
        select(&mut h.host, 1);
        let image = h
            .host
            .render(1, 0.0)
            .expect("session exists")
            .expect("rasterize");
        assert_eq!(image.dimensions(), (800, 600));
        assert!(h.host.render(9, 0.0).is_none());
    }
}
