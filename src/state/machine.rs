use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::RgbaImage;

use crate::ai::{build_mask_png, build_prompt, AiEditCompletion, AiEditJob, AiEditState, AiTicket};
use crate::config::OverlaySettings;
use crate::editor::{ActiveTextEdit, Scene, TextBuffer, TextEditOutcome, ToolKind, ToolState};
use crate::error::AppResult;
use crate::geometry::{
    clamp_point, normalize, view_point_to_pixel, view_rect_to_image_rect, Color, PixelRect,
    Point, Rect, Size,
};
use crate::input::{resolve_shortcut, InputContext, ShortcutAction, ShortcutKey, ShortcutModifiers};
use crate::render::{encode_png, render_final_image, ExportResult};
use crate::toolbar::{ChromeHit, PickerKind, ToolbarInput, ToolbarLayout};

use super::error::{StateError, StateResult};
use super::event::{OverlayCommand, OverlayEffect, PointerEvent};
use super::handles::{handle_at, resize_from_handle, HANDLE_HIT_RADIUS};
use super::model::{
    CaptureFrame, CreateDrag, CursorHint, InteractionMode, MoveTarget, ResizeTarget, ShapeDraft,
};

/// A new selection needs both sides strictly larger than this.
pub const MIN_SELECTION_EXTENT: f64 = 10.0;
pub const MIN_SELECTION_SIZE: Size = Size::new(50.0, 50.0);
pub const TEXT_AREA_DEFAULT_SIZE: Size = Size::new(200.0, 40.0);
pub const TEXT_AREA_MIN_SIZE: Size = Size::new(40.0, 24.0);
/// Text-area drags shorter than this count as a click.
pub const TEXT_DRAG_THRESHOLD: f64 = 4.0;
/// Extra reach for eraser and select hit tests, on top of half the stroke width.
pub const HIT_TOLERANCE: f64 = 6.0;

pub const ENTER_PROMPT_MESSAGE: &str = "AI: enter a prompt first";
pub const AI_DISABLED_MESSAGE: &str = "AI: add an API key in settings to enable AI edits";

static NEXT_SESSION_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Interaction state machine for one display's overlay.
///
/// Every handler returns the side effects the host has to perform; the session itself never
/// touches the clipboard, the file system or the network.
#[derive(Debug)]
pub struct OverlaySession {
    display_id: u32,
    serial: u64,
    view_bounds: Rect,
    source: Arc<RgbaImage>,
    settings: Arc<OverlaySettings>,
    scene: Scene,
    tools: ToolState,
    mode: InteractionMode,
    active_text: Option<ActiveTextEdit>,
    selected_element: Option<usize>,
    hover_element: Option<usize>,
    ai: AiEditState,
    open_picker: Option<PickerKind>,
    generation: u64,
}

impl OverlaySession {
    pub fn new(frame: CaptureFrame, settings: Arc<OverlaySettings>) -> StateResult<Self> {
        let CaptureFrame {
            display_id,
            bitmap,
            view_bounds,
        } = frame;
        if bitmap.width() == 0 || bitmap.height() == 0 {
            return Err(StateError::InvalidCapture {
                display_id,
                reason: "captured bitmap is empty",
            });
        }
        let finite = [view_bounds.x, view_bounds.y, view_bounds.width, view_bounds.height]
            .iter()
            .all(|value| value.is_finite());
        if !finite || view_bounds.is_empty() {
            return Err(StateError::InvalidCapture {
                display_id,
                reason: "view bounds are empty",
            });
        }

        let serial = NEXT_SESSION_SERIAL.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            display_id,
            serial,
            width = bitmap.width(),
            height = bitmap.height(),
            "overlay session opened"
        );
        Ok(Self {
            display_id,
            serial,
            view_bounds,
            source: bitmap,
            settings,
            scene: Scene::new(),
            tools: ToolState::new(),
            mode: InteractionMode::default(),
            active_text: None,
            selected_element: None,
            hover_element: None,
            ai: AiEditState::default(),
            open_picker: None,
            generation: 0,
        })
    }

    pub fn display_id(&self) -> u32 {
        self.display_id
    }

    pub fn view_bounds(&self) -> Rect {
        self.view_bounds
    }

    pub fn source(&self) -> &Arc<RgbaImage> {
        &self.source
    }

    pub fn settings(&self) -> &OverlaySettings {
        &self.settings
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn selection(&self) -> Option<Rect> {
        self.scene.selection()
    }

    pub fn tools(&self) -> &ToolState {
        &self.tools
    }

    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    pub fn active_text(&self) -> Option<&ActiveTextEdit> {
        self.active_text.as_ref()
    }

    pub fn selected_element(&self) -> Option<usize> {
        self.selected_element
    }

    pub fn hover_element(&self) -> Option<usize> {
        self.hover_element
    }

    pub fn ai(&self) -> &AiEditState {
        &self.ai
    }

    pub fn open_picker(&self) -> Option<PickerKind> {
        self.open_picker
    }

    pub fn ticket(&self) -> AiTicket {
        AiTicket {
            display_id: self.display_id,
            session: self.serial,
            generation: self.generation,
        }
    }

    pub fn toolbar_layout(&self) -> Option<ToolbarLayout> {
        ToolbarLayout::compute(ToolbarInput {
            selection: self.scene.selection(),
            view_bounds: self.view_bounds,
            tools: &self.tools,
            open_picker: self.open_picker,
            dragging: self.mode.is_dragging(),
            ai: &self.ai,
        })
    }

    /// Selection mapped onto source pixels.
    pub fn selection_pixel_rect(&self) -> Option<PixelRect> {
        let selection = self.scene.selection()?;
        Some(self.view_rect_to_pixels(&selection))
    }

    pub fn view_rect_to_pixels(&self, rect: &Rect) -> PixelRect {
        view_rect_to_image_rect(
            rect,
            &self.view_bounds,
            self.source.width(),
            self.source.height(),
        )
    }

    pub fn input_context(&self) -> InputContext {
        let text_input_active = self.active_text.is_some();
        InputContext {
            text_input_active,
            prompt_active: !text_input_active
                && self.tools.tool() == ToolKind::Ai
                && self.scene.selection().is_some(),
        }
    }

    pub fn pointer_down(&mut self, event: PointerEvent) -> Vec<OverlayEffect> {
        let point = clamp_point(event.location, &self.view_bounds);

        if let Some(layout) = self.toolbar_layout() {
            match layout.hit_test(point) {
                ChromeHit::Command(command) => return self.handle_command(command),
                ChromeHit::Absorbed => return Vec::new(),
                ChromeHit::Miss => {}
            }
        }

        let selection = self.scene.selection();
        let inside = selection.is_some_and(|rect| rect.contains(point));
        let tool = self.tools.tool();

        if tool == ToolKind::Ai && self.ai.accepts_rect_drag() && inside {
            self.set_mode(InteractionMode::Creating {
                drag: Some(CreateDrag::AiRect {
                    anchor: point,
                    current: point,
                }),
            });
            return vec![OverlayEffect::Redraw];
        }

        if let Some(edit) = &self.active_text {
            let origin = edit.rect();
            if let Some(handle) = handle_at(&origin, point, HANDLE_HIT_RADIUS) {
                self.set_mode(InteractionMode::Resizing(ResizeTarget::TextArea {
                    handle,
                    origin,
                }));
                return vec![OverlayEffect::Redraw];
            }
        }

        if tool == ToolKind::Text && inside {
            if event.is_double_click() && self.begin_text_edit_at(point) {
                return vec![OverlayEffect::Redraw];
            }
            if self
                .active_text
                .as_ref()
                .is_some_and(|edit| edit.rect().contains(point))
            {
                return Vec::new();
            }
            self.commit_text_edit();
            self.set_mode(InteractionMode::Creating {
                drag: Some(CreateDrag::TextArea {
                    anchor: point,
                    current: point,
                }),
            });
            return vec![OverlayEffect::Redraw];
        }

        if let Some(selection) = selection {
            if tool == ToolKind::Move && self.active_text.is_none() {
                if let Some(handle) = handle_at(&selection, point, HANDLE_HIT_RADIUS) {
                    self.set_mode(InteractionMode::Resizing(ResizeTarget::Selection {
                        handle,
                        origin: selection,
                    }));
                    return vec![OverlayEffect::Redraw];
                }
            }

            if inside {
                return self.pointer_down_inside(point, &selection, event.is_double_click());
            }
        }

        self.start_new_selection(point)
    }

    fn pointer_down_inside(
        &mut self,
        point: Point,
        selection: &Rect,
        double_click: bool,
    ) -> Vec<OverlayEffect> {
        if double_click && self.scene.topmost_text_at(point).is_some() {
            let mut effects = self.switch_tool(ToolKind::Text);
            if self.begin_text_edit_at(point) {
                effects.push(OverlayEffect::Redraw);
            }
            return effects;
        }

        match self.tools.tool() {
            ToolKind::Eraser => {
                let Some(index) = self.scene.topmost_at(point, HIT_TOLERANCE) else {
                    return Vec::new();
                };
                self.remove_element(index);
                vec![OverlayEffect::Redraw]
            }
            ToolKind::Eyedropper => {
                let Some(color) = self.sample_color(point) else {
                    return Vec::new();
                };
                tracing::debug!(?color, target = ?self.tools.color_target(), "picked color");
                self.tools.apply_picked_color(color);
                let mut effects = self.switch_tool(ToolKind::Move);
                effects.push(OverlayEffect::Redraw);
                effects
            }
            ToolKind::Select => {
                match self.scene.topmost_at(point, HIT_TOLERANCE) {
                    Some(index) => {
                        self.selected_element = Some(index);
                        self.set_mode(InteractionMode::Moving(MoveTarget::Element {
                            index,
                            last: point,
                        }));
                    }
                    None => self.selected_element = None,
                }
                vec![OverlayEffect::Redraw]
            }
            tool if tool.is_drawing() => {
                self.set_mode(InteractionMode::Creating {
                    drag: Some(CreateDrag::Shape(ShapeDraft::new(tool, point))),
                });
                vec![OverlayEffect::Redraw]
            }
            ToolKind::Move => {
                self.set_mode(InteractionMode::Moving(MoveTarget::Selection {
                    grab: selection.origin().offset_to(point),
                }));
                vec![OverlayEffect::Redraw]
            }
            _ => Vec::new(),
        }
    }

    fn start_new_selection(&mut self, point: Point) -> Vec<OverlayEffect> {
        self.commit_text_edit();
        self.reset_selection_state();
        self.set_mode(InteractionMode::Creating {
            drag: Some(CreateDrag::Selection {
                anchor: point,
                current: point,
            }),
        });
        vec![OverlayEffect::SelectionStarted, OverlayEffect::Redraw]
    }

    pub fn pointer_drag(&mut self, event: PointerEvent) -> Vec<OverlayEffect> {
        let point = clamp_point(event.location, &self.view_bounds);
        let selection = self.scene.selection();
        let inside_selection = |point: Point| match &selection {
            Some(rect) => clamp_point(point, rect),
            None => point,
        };

        match &mut self.mode {
            InteractionMode::Creating { drag: Some(drag) } => match drag {
                CreateDrag::Selection { current, .. } => *current = point,
                CreateDrag::Shape(draft) => draft.update(inside_selection(point)),
                CreateDrag::TextArea { current, .. } | CreateDrag::AiRect { current, .. } => {
                    *current = inside_selection(point)
                }
            },
            InteractionMode::Moving(MoveTarget::Selection { grab }) => {
                let Some(selection) = selection else {
                    return Vec::new();
                };
                let target = Rect::from_origin_size(point.offset(grab.inverted()), selection.size())
                    .clamped_within(&self.view_bounds);
                let delta = selection.origin().offset_to(target.origin());
                if delta.is_zero() {
                    return Vec::new();
                }
                self.scene.translate_all(delta);
                if let Some(edit) = self.active_text.as_mut() {
                    edit.translate(delta);
                }
                self.ai.translate_rect(delta);
            }
            InteractionMode::Moving(MoveTarget::Element { index, last }) => {
                let delta = last.offset_to(point);
                if delta.is_zero() || !self.scene.translate_element(*index, delta) {
                    return Vec::new();
                }
                *last = point;
            }
            InteractionMode::Resizing(ResizeTarget::Selection { handle, origin }) => {
                let Some(resized) = resize_from_handle(
                    origin,
                    *handle,
                    point,
                    MIN_SELECTION_SIZE,
                    &self.view_bounds,
                ) else {
                    return Vec::new();
                };
                self.scene.set_selection(Some(resized));
                self.ai.clip_rect_to(&resized);
            }
            InteractionMode::Resizing(ResizeTarget::TextArea { handle, origin }) => {
                let bounds = selection.unwrap_or(self.view_bounds);
                let Some(edit) = self.active_text.as_mut() else {
                    return Vec::new();
                };
                let Some(resized) =
                    resize_from_handle(origin, *handle, point, TEXT_AREA_MIN_SIZE, &bounds)
                else {
                    return Vec::new();
                };
                edit.set_rect(resized);
            }
            InteractionMode::Creating { drag: None } | InteractionMode::Active => {
                return Vec::new();
            }
        }
        vec![OverlayEffect::Redraw]
    }

    pub fn pointer_up(&mut self, event: PointerEvent) -> Vec<OverlayEffect> {
        if !self.mode.is_dragging() {
            return Vec::new();
        }
        self.pointer_drag(event);

        let mode = std::mem::replace(&mut self.mode, InteractionMode::Active);
        tracing::debug!(
            display_id = self.display_id,
            from = mode.label(),
            "pointer released"
        );
        let InteractionMode::Creating { drag: Some(drag) } = mode else {
            return vec![OverlayEffect::Redraw];
        };

        match drag {
            CreateDrag::Selection { anchor, current } => {
                let rect = normalize(anchor, current);
                if rect.width > MIN_SELECTION_EXTENT && rect.height > MIN_SELECTION_EXTENT {
                    self.scene.set_selection(Some(rect));
                    tracing::info!(
                        display_id = self.display_id,
                        width = rect.width,
                        height = rect.height,
                        "selection committed"
                    );
                    return vec![OverlayEffect::Redraw];
                }
                self.mode = InteractionMode::default();
                if rect.width * rect.height <= f64::EPSILON {
                    tracing::info!(
                        display_id = self.display_id,
                        "click outside selection closes overlay"
                    );
                    return vec![OverlayEffect::CloseOverlay];
                }
            }
            CreateDrag::Shape(draft) => {
                if let Some(element) = draft.to_element(self.tools.style()) {
                    tracing::debug!(kind = element.shape.kind_label(), "element added");
                    self.scene.push(element);
                }
            }
            CreateDrag::TextArea { anchor, current } => {
                let bounds = self.scene.selection().unwrap_or(self.view_bounds);
                let rect = text_area_rect(anchor, current, &bounds);
                self.active_text = Some(ActiveTextEdit::new(rect, self.tools.style()));
            }
            CreateDrag::AiRect { anchor, current } => {
                if let Some(selection) = self.scene.selection() {
                    self.ai.set_rect(normalize(anchor, current), &selection);
                }
            }
        }
        vec![OverlayEffect::Redraw]
    }

    /// Hover without a pressed button: cursor hint plus eraser highlight.
    pub fn pointer_move(&mut self, location: Point) -> (CursorHint, Vec<OverlayEffect>) {
        let point = clamp_point(location, &self.view_bounds);
        let (cursor, hover) = self.hover_at(point);
        let effects = if hover != self.hover_element {
            self.hover_element = hover;
            vec![OverlayEffect::Redraw]
        } else {
            Vec::new()
        };
        (cursor, effects)
    }

    fn hover_at(&self, point: Point) -> (CursorHint, Option<usize>) {
        if let Some(layout) = self.toolbar_layout() {
            if layout.hit_test(point) != ChromeHit::Miss {
                return (CursorHint::Arrow, None);
            }
        }
        if let Some(edit) = &self.active_text {
            if let Some(handle) = handle_at(&edit.rect(), point, HANDLE_HIT_RADIUS) {
                return (CursorHint::for_handle(handle), None);
            }
            if edit.rect().contains(point) {
                return (CursorHint::Text, None);
            }
        }
        let Some(selection) = self.scene.selection() else {
            return (CursorHint::Crosshair, None);
        };
        let tool = self.tools.tool();
        if tool == ToolKind::Move && self.active_text.is_none() {
            if let Some(handle) = handle_at(&selection, point, HANDLE_HIT_RADIUS) {
                return (CursorHint::for_handle(handle), None);
            }
        }
        if !selection.contains(point) {
            return (CursorHint::Crosshair, None);
        }
        match tool {
            ToolKind::Eraser => (
                CursorHint::Eraser,
                self.scene.topmost_at(point, HIT_TOLERANCE),
            ),
            ToolKind::Ai if self.ai.is_sending() => (CursorHint::Arrow, None),
            tool => (CursorHint::for_tool(tool), None),
        }
    }

    pub fn handle_key(
        &mut self,
        key: ShortcutKey,
        modifiers: ShortcutModifiers,
    ) -> Vec<OverlayEffect> {
        let Some(action) = resolve_shortcut(key, modifiers, self.input_context()) else {
            return Vec::new();
        };
        tracing::debug!(?action, display_id = self.display_id, "shortcut");

        if self.active_text.is_some() {
            let changed = match action {
                ShortcutAction::TextCommit => self.commit_text_edit(),
                ShortcutAction::TextCancel => self.cancel_text_edit(),
                other => self
                    .active_text
                    .as_mut()
                    .is_some_and(|edit| apply_text_action(edit.buffer_mut(), other)),
            };
            return redraw_if(changed);
        }

        match action {
            ShortcutAction::PromptInsertChar(c) => {
                self.ai.push_prompt_char(c);
                vec![OverlayEffect::Redraw]
            }
            ShortcutAction::PromptDeleteBackward => redraw_if(self.ai.pop_prompt_char()),
            ShortcutAction::PromptSend => self.send_ai(),
            ShortcutAction::PromptCancel => self.handle_command(OverlayCommand::CancelAi),
            ShortcutAction::Undo => self.handle_command(OverlayCommand::Undo),
            ShortcutAction::DeleteSelection => self.handle_command(OverlayCommand::DeleteSelected),
            ShortcutAction::CopyImage => self.handle_command(OverlayCommand::Copy),
            ShortcutAction::SaveImage => self.handle_command(OverlayCommand::Save),
            ShortcutAction::SelectTool(tool) => {
                self.handle_command(OverlayCommand::SelectTool(tool))
            }
            ShortcutAction::CloseRequested => self.handle_command(OverlayCommand::Close),
            _ => Vec::new(),
        }
    }

    pub fn handle_command(&mut self, command: OverlayCommand) -> Vec<OverlayEffect> {
        tracing::debug!(?command, display_id = self.display_id, "overlay command");
        let mut effects = match command {
            OverlayCommand::SelectTool(tool) => self.switch_tool(tool),
            OverlayCommand::SetStrokeColor(color) => {
                self.tools.set_stroke_color(color);
                Vec::new()
            }
            OverlayCommand::SetFillColor(color) => {
                self.tools.set_fill_color(color);
                Vec::new()
            }
            OverlayCommand::ApplyColor(color) => {
                self.tools.apply_picked_color(color);
                Vec::new()
            }
            OverlayCommand::SetColorTarget(target) => {
                self.tools.set_color_target(target);
                Vec::new()
            }
            OverlayCommand::SetLineWidth(width) => {
                self.tools.set_line_width(width);
                Vec::new()
            }
            OverlayCommand::SetFontName(name) => {
                self.tools.set_font_name(name);
                Vec::new()
            }
            OverlayCommand::SetFontSize(size) => {
                self.tools.set_font_size(size);
                Vec::new()
            }
            OverlayCommand::TogglePicker(kind) => {
                self.open_picker = if self.open_picker == Some(kind) {
                    None
                } else {
                    Some(kind)
                };
                Vec::new()
            }
            OverlayCommand::Undo => {
                if !self.cancel_text_edit() {
                    self.undo();
                }
                Vec::new()
            }
            OverlayCommand::DeleteSelected => {
                if let Some(index) = self.selected_element {
                    self.remove_element(index);
                }
                Vec::new()
            }
            OverlayCommand::Copy => return self.export_request(OverlayEffect::CopyImage),
            OverlayCommand::Save => return self.export_request(OverlayEffect::SaveImage),
            OverlayCommand::Close => return vec![OverlayEffect::CloseOverlay],
            OverlayCommand::SetAiPrompt(prompt) => {
                self.ai.set_prompt(prompt);
                Vec::new()
            }
            OverlayCommand::SendAi => return self.send_ai(),
            OverlayCommand::CancelAi => self.switch_tool(ToolKind::Move),
        };
        effects.push(OverlayEffect::Redraw);
        effects
    }

    fn export_request(&mut self, effect: OverlayEffect) -> Vec<OverlayEffect> {
        if self.scene.selection().is_none() {
            return Vec::new();
        }
        self.commit_text_edit();
        vec![effect]
    }

    /// Applies the side effects of leaving the current tool and entering `tool`.
    pub fn switch_tool(&mut self, tool: ToolKind) -> Vec<OverlayEffect> {
        let mut effects = Vec::new();
        let tool = if tool == ToolKind::Ai && !self.settings.ai_enabled() {
            effects.push(OverlayEffect::Notify(AI_DISABLED_MESSAGE.to_string()));
            ToolKind::Move
        } else {
            tool
        };

        let previous = self.tools.tool();
        if previous == tool {
            return effects;
        }
        match previous {
            ToolKind::Text => {
                self.commit_text_edit();
            }
            ToolKind::Eraser => self.hover_element = None,
            ToolKind::Ai => self.ai.leave_tool(),
            ToolKind::Select => self.selected_element = None,
            _ => {}
        }
        if tool == ToolKind::Ai {
            self.ai.enter_tool();
        }
        self.tools.set_tool(tool);
        self.open_picker = None;
        tracing::debug!(display_id = self.display_id, ?previous, ?tool, "tool switched");
        effects.push(OverlayEffect::Redraw);
        effects
    }

    /// Drops selection-scoped state on behalf of another overlay that started a selection.
    pub fn clear_selection(&mut self) -> Vec<OverlayEffect> {
        if self.scene.selection().is_none()
            && self.active_text.is_none()
            && !self.mode.is_dragging()
        {
            return Vec::new();
        }
        self.active_text = None;
        self.reset_selection_state();
        self.set_mode(InteractionMode::default());
        vec![OverlayEffect::Redraw]
    }

    /// Flattened PNG of the selection with every annotation.
    pub fn export_png(&self) -> ExportResult<Vec<u8>> {
        let image = render_final_image(self)?;
        encode_png(&image)
    }

    fn send_ai(&mut self) -> Vec<OverlayEffect> {
        if self.ai.is_sending() {
            tracing::debug!(display_id = self.display_id, "AI request already in flight");
            return Vec::new();
        }
        if self.ai.prompt().trim().is_empty() {
            return vec![OverlayEffect::Notify(ENTER_PROMPT_MESSAGE.to_string())];
        }
        if !self.settings.ai_enabled() {
            return vec![OverlayEffect::Notify(AI_DISABLED_MESSAGE.to_string())];
        }
        match self.build_ai_job() {
            Ok(job) => {
                tracing::info!(
                    display_id = self.display_id,
                    generation = self.generation,
                    width = job.target_width,
                    height = job.target_height,
                    "dispatching AI edit"
                );
                self.ai.begin_sending();
                vec![OverlayEffect::SendAiRequest(job), OverlayEffect::Redraw]
            }
            Err(err) => {
                tracing::warn!(%err, "failed to prepare AI edit request");
                vec![OverlayEffect::Notify(format!("AI: {err}"))]
            }
        }
    }

    /// The request carries the flattened selection, annotations included.
    fn build_ai_job(&self) -> AppResult<AiEditJob> {
        let image = render_final_image(self)?;
        let (width, height) = image.dimensions();
        let editable = self.ai_rect_in_selection_pixels();
        Ok(AiEditJob {
            ticket: self.ticket(),
            endpoint: self.settings.endpoint_or_default().to_string(),
            api_key: self.settings.api_key.trim().to_string(),
            model: self.settings.model_or_default().to_string(),
            prompt: build_prompt(self.ai.prompt()),
            image_png: encode_png(&image)?,
            mask_png: build_mask_png(width, height, editable)?,
            target_width: width,
            target_height: height,
        })
    }

    fn ai_rect_in_selection_pixels(&self) -> Option<PixelRect> {
        let selection = self.selection_pixel_rect()?;
        let rect = self.view_rect_to_pixels(&self.ai.rect()?);
        let x = rect.x.saturating_sub(selection.x).min(selection.width);
        let y = rect.y.saturating_sub(selection.y).min(selection.height);
        Some(PixelRect::new(
            x,
            y,
            rect.width.min(selection.width - x),
            rect.height.min(selection.height - y),
        ))
    }

    /// Applies a finished request. Results for an older selection are dropped.
    pub fn apply_ai_result(&mut self, completion: AiEditCompletion) -> Vec<OverlayEffect> {
        if completion.ticket != self.ticket() {
            tracing::debug!(
                ticket = ?completion.ticket,
                current = ?self.ticket(),
                "dropping stale AI result"
            );
            return Vec::new();
        }
        self.ai.finish_sending(self.tools.tool() == ToolKind::Ai);
        match completion.result {
            Ok(image) => {
                tracing::info!(
                    display_id = self.display_id,
                    width = image.width(),
                    height = image.height(),
                    "AI edit applied"
                );
                self.ai.apply_result(image);
                vec![OverlayEffect::Redraw]
            }
            Err(err) => {
                tracing::warn!(%err, display_id = self.display_id, "AI edit failed");
                vec![
                    OverlayEffect::Notify(format!("AI: processing failed ({err})")),
                    OverlayEffect::Redraw,
                ]
            }
        }
    }

    fn sample_color(&self, point: Point) -> Option<Color> {
        let (x, y) = view_point_to_pixel(
            point,
            &self.view_bounds,
            self.source.width(),
            self.source.height(),
        )?;
        let [r, g, b, _] = self.source.get_pixel(x, y).0;
        Some(Color::new(r, g, b))
    }

    fn begin_text_edit_at(&mut self, point: Point) -> bool {
        self.commit_text_edit();
        let Some(index) = self.scene.topmost_text_at(point) else {
            return false;
        };
        let Some(element) = self.scene.remove_at(index) else {
            return false;
        };
        self.forget_index(index);
        self.active_text = ActiveTextEdit::editing(index, element);
        tracing::debug!(index, "editing existing text element");
        self.active_text.is_some()
    }

    fn commit_text_edit(&mut self) -> bool {
        let Some(edit) = self.active_text.take() else {
            return false;
        };
        self.apply_text_outcome(edit.commit());
        true
    }

    fn cancel_text_edit(&mut self) -> bool {
        let Some(edit) = self.active_text.take() else {
            return false;
        };
        self.apply_text_outcome(edit.cancel());
        true
    }

    fn apply_text_outcome(&mut self, outcome: TextEditOutcome) {
        match outcome {
            TextEditOutcome::Commit {
                element,
                index: Some(index),
            } => {
                let at = self.scene.insert_at(index, element);
                self.shift_index(at);
            }
            TextEditOutcome::Commit {
                element,
                index: None,
            } => {
                self.scene.push(element);
            }
            TextEditOutcome::Restore(replaced) => {
                let at = self.scene.insert_at(replaced.index, replaced.original);
                self.shift_index(at);
            }
            TextEditOutcome::Discard => {}
        }
    }

    fn undo(&mut self) {
        let last = self.scene.len().checked_sub(1);
        if self.scene.undo_last().is_some() {
            if let Some(index) = last {
                self.forget_index(index);
            }
        }
    }

    fn remove_element(&mut self, index: usize) {
        if self.scene.remove_at(index).is_some() {
            self.forget_index(index);
        }
    }

    fn forget_index(&mut self, removed: usize) {
        let adjust = |slot: Option<usize>| match slot {
            Some(index) if index == removed => None,
            Some(index) if index > removed => Some(index - 1),
            other => other,
        };
        self.selected_element = adjust(self.selected_element);
        self.hover_element = adjust(self.hover_element);
    }

    fn shift_index(&mut self, inserted: usize) {
        let adjust = |slot: Option<usize>| {
            slot.map(|index| if index >= inserted { index + 1 } else { index })
        };
        self.selected_element = adjust(self.selected_element);
        self.hover_element = adjust(self.hover_element);
    }

    fn reset_selection_state(&mut self) {
        self.scene.clear();
        self.ai.reset(self.tools.tool() == ToolKind::Ai);
        self.selected_element = None;
        self.hover_element = None;
        self.open_picker = None;
        self.generation += 1;
    }

    fn set_mode(&mut self, mode: InteractionMode) {
        tracing::debug!(
            display_id = self.display_id,
            from = self.mode.label(),
            to = mode.label(),
            "interaction mode"
        );
        self.mode = mode;
    }
}

fn apply_text_action(buffer: &mut TextBuffer, action: ShortcutAction) -> bool {
    match action {
        ShortcutAction::TextInsertChar(c) => {
            buffer.insert_char(c);
            true
        }
        ShortcutAction::TextInsertLineBreak => {
            buffer.insert_newline();
            true
        }
        ShortcutAction::TextDeleteBackward => buffer.delete_backward(),
        ShortcutAction::TextCursorLeft => buffer.move_cursor_left(),
        ShortcutAction::TextCursorRight => buffer.move_cursor_right(),
        ShortcutAction::TextCursorUp => buffer.move_cursor_up(),
        ShortcutAction::TextCursorDown => buffer.move_cursor_down(),
        _ => false,
    }
}

fn redraw_if(changed: bool) -> Vec<OverlayEffect> {
    if changed {
        vec![OverlayEffect::Redraw]
    } else {
        Vec::new()
    }
}

/// Click: default box hanging down from the click point. Drag: the dragged box, grown to the
/// minimum size. Either way kept inside `bounds`.
fn text_area_rect(anchor: Point, current: Point, bounds: &Rect) -> Rect {
    let rect = if anchor.distance(current) <= TEXT_DRAG_THRESHOLD {
        Rect::new(
            anchor.x,
            anchor.y - TEXT_AREA_DEFAULT_SIZE.height,
            TEXT_AREA_DEFAULT_SIZE.width,
            TEXT_AREA_DEFAULT_SIZE.height,
        )
    } else {
        normalize(anchor, current).with_min_size(TEXT_AREA_MIN_SIZE)
    };
    Rect::new(
        rect.x,
        rect.y,
        rect.width.min(bounds.width),
        rect.height.min(bounds.height),
    )
    .clamped_within(bounds)
}
