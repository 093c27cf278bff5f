//! Toolbar controller: positions tool buttons, option pickers and the AI prompt bar around the
//! selection, and maps clicks on them to [`OverlayCommand`]s.

use crate::ai::AiEditState;
use crate::editor::tools::{COLOR_PALETTE, FONT_NAME_CHOICES, FONT_SIZE_CHOICES, LINE_WIDTH_CHOICES};
use crate::editor::{ColorTarget, ToolKind, ToolState};
use crate::geometry::{Color, Offset, Point, Rect};
use crate::state::OverlayCommand;

const BUTTON_SIZE: f64 = 32.0;
const BUTTON_SPACING: f64 = 4.0;
const PANEL_PADDING: f64 = 6.0;
const PANEL_GAP: f64 = 8.0;
const PICKER_ITEM_SIZE: f64 = 26.0;
const PROMPT_BAR_WIDTH: f64 = 360.0;
const PROMPT_BAR_HEIGHT: f64 = 36.0;
const PROMPT_BUTTON_WIDTH: f64 = 56.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PickerKind {
    Color,
    LineWidth,
    Font,
}

impl PickerKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Color => "Color",
            Self::LineWidth => "Width",
            Self::Font => "Font",
        }
    }
}

/// Where the main bar ended up relative to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarPlacement {
    Below,
    Above,
    Inside,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ButtonFace {
    Label(String),
    Swatch(Option<Color>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolbarButton {
    pub rect: Rect,
    pub face: ButtonFace,
    pub command: OverlayCommand,
    pub active: bool,
    pub enabled: bool,
}

impl ToolbarButton {
    fn labeled(label: impl Into<String>, command: OverlayCommand) -> Self {
        Self {
            rect: Rect::default(),
            face: ButtonFace::Label(label.into()),
            command,
            active: false,
            enabled: true,
        }
    }

    fn swatch(color: Option<Color>, command: OverlayCommand) -> Self {
        Self {
            rect: Rect::default(),
            face: ButtonFace::Swatch(color),
            command,
            active: false,
            enabled: true,
        }
    }

    fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickerPanel {
    pub kind: PickerKind,
    pub rect: Rect,
    pub items: Vec<ToolbarButton>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptBar {
    pub rect: Rect,
    pub field: Rect,
    pub text: String,
    pub sending: bool,
    pub send: ToolbarButton,
    pub cancel: ToolbarButton,
}

/// What a toolbar hit test found under the pointer.
#[derive(Debug, Clone, PartialEq)]
pub enum ChromeHit {
    Command(OverlayCommand),
    /// Inside toolbar chrome but not on an enabled control.
    Absorbed,
    Miss,
}

/// Session state the layout depends on.
#[derive(Debug, Clone, Copy)]
pub struct ToolbarInput<'a> {
    pub selection: Option<Rect>,
    pub view_bounds: Rect,
    pub tools: &'a ToolState,
    pub open_picker: Option<PickerKind>,
    pub dragging: bool,
    pub ai: &'a AiEditState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolbarLayout {
    pub bar: Rect,
    pub placement: ToolbarPlacement,
    pub buttons: Vec<ToolbarButton>,
    pub picker: Option<PickerPanel>,
    pub prompt_bar: Option<PromptBar>,
}

impl ToolbarLayout {
    /// `None` while there is no selection or a drag is in progress.
    pub fn compute(input: ToolbarInput<'_>) -> Option<Self> {
        let selection = input.selection?;
        if input.dragging {
            return None;
        }

        let mut buttons = main_buttons(input.tools);
        let bar_width = row_width(buttons.len(), BUTTON_SIZE);
        let bar_height = BUTTON_SIZE + PANEL_PADDING * 2.0;
        let (bar, placement) = place_bar(&selection, &input.view_bounds, bar_width, bar_height);
        lay_out_row(&mut buttons, &bar, BUTTON_SIZE, BUTTON_SIZE);

        let options = input.tools.tool().option_visibility();
        let picker = input
            .open_picker
            .filter(|kind| match kind {
                PickerKind::Color => options.has_stroke_color || options.has_fill_color,
                PickerKind::LineWidth => options.has_line_width,
                PickerKind::Font => options.has_font,
            })
            .map(|kind| picker_panel(kind, input.tools, &bar, &input.view_bounds));

        let prompt_bar = (input.tools.tool() == ToolKind::Ai)
            .then(|| prompt_bar(input.ai, &bar, &input.view_bounds));

        Some(Self {
            bar,
            placement,
            buttons,
            picker,
            prompt_bar,
        })
    }

    /// Pickers are checked first since they float over everything else.
    pub fn hit_test(&self, point: Point) -> ChromeHit {
        if let Some(picker) = &self.picker {
            if picker.rect.contains(point) {
                return hit_buttons(&picker.items, point);
            }
        }
        if let Some(prompt) = &self.prompt_bar {
            if prompt.rect.contains(point) {
                return hit_buttons([&prompt.send, &prompt.cancel].into_iter(), point);
            }
        }
        if self.bar.contains(point) {
            return hit_buttons(&self.buttons, point);
        }
        ChromeHit::Miss
    }
}

fn hit_buttons<'a>(
    buttons: impl IntoIterator<Item = &'a ToolbarButton>,
    point: Point,
) -> ChromeHit {
    buttons
        .into_iter()
        .find(|button| button.enabled && button.rect.contains(point))
        .map_or(ChromeHit::Absorbed, |button| {
            ChromeHit::Command(button.command.clone())
        })
}

fn main_buttons(tools: &ToolState) -> Vec<ToolbarButton> {
    let current = tools.tool();
    let mut buttons: Vec<ToolbarButton> = ToolKind::ALL
        .into_iter()
        .map(|tool| {
            ToolbarButton::labeled(tool.label(), OverlayCommand::SelectTool(tool))
                .active(tool == current)
        })
        .collect();

    let options = current.option_visibility();
    if options.has_stroke_color || options.has_fill_color {
        buttons.push(ToolbarButton::swatch(
            Some(tools.stroke_color()),
            OverlayCommand::TogglePicker(PickerKind::Color),
        ));
    }
    if options.has_line_width {
        buttons.push(ToolbarButton::labeled(
            format!("{}", tools.line_width()),
            OverlayCommand::TogglePicker(PickerKind::LineWidth),
        ));
    }
    if options.has_font {
        buttons.push(ToolbarButton::labeled(
            PickerKind::Font.label(),
            OverlayCommand::TogglePicker(PickerKind::Font),
        ));
    }

    buttons.extend([
        ToolbarButton::labeled("Undo", OverlayCommand::Undo),
        ToolbarButton::labeled("Copy", OverlayCommand::Copy),
        ToolbarButton::labeled("Save", OverlayCommand::Save),
        ToolbarButton::labeled("Close", OverlayCommand::Close),
    ]);
    buttons
}

fn picker_items(kind: PickerKind, tools: &ToolState) -> Vec<ToolbarButton> {
    match kind {
        PickerKind::Color => {
            let visibility = tools.tool().option_visibility();
            let target = tools.color_target();
            let mut items = vec![ToolbarButton::swatch(
                Some(tools.stroke_color()),
                OverlayCommand::SetColorTarget(ColorTarget::Stroke),
            )
            .active(target == ColorTarget::Stroke)];
            if visibility.has_fill_color {
                items.push(
                    ToolbarButton::swatch(
                        tools.fill_color(),
                        OverlayCommand::SetColorTarget(ColorTarget::Fill),
                    )
                    .active(target == ColorTarget::Fill),
                );
                items.push(ToolbarButton::swatch(
                    None,
                    OverlayCommand::SetFillColor(None),
                ));
            }
            let selected = match target {
                ColorTarget::Stroke => Some(tools.stroke_color()),
                ColorTarget::Fill => tools.fill_color(),
            };
            items.extend(COLOR_PALETTE.into_iter().map(|color| {
                ToolbarButton::swatch(Some(color), OverlayCommand::ApplyColor(color))
                    .active(selected == Some(color))
            }));
            items
        }
        PickerKind::LineWidth => LINE_WIDTH_CHOICES
            .into_iter()
            .map(|width| {
                ToolbarButton::labeled(format!("{width}"), OverlayCommand::SetLineWidth(width))
                    .active((tools.line_width() - width).abs() < f64::EPSILON)
            })
            .collect(),
        PickerKind::Font => {
            let font = tools.font();
            FONT_NAME_CHOICES
                .into_iter()
                .map(|name| {
                    ToolbarButton::labeled(name, OverlayCommand::SetFontName(name.to_string()))
                        .active(font.name == name)
                })
                .chain(FONT_SIZE_CHOICES.into_iter().map(|size| {
                    ToolbarButton::labeled(format!("{size}"), OverlayCommand::SetFontSize(size))
                        .active((font.size - size).abs() < f64::EPSILON)
                }))
                .collect()
        }
    }
}

fn picker_panel(kind: PickerKind, tools: &ToolState, bar: &Rect, view: &Rect) -> PickerPanel {
    let mut items = picker_items(kind, tools);
    let width = row_width(items.len(), PICKER_ITEM_SIZE);
    let height = PICKER_ITEM_SIZE + PANEL_PADDING * 2.0;
    let rect = place_beside(bar, view, width, height);
    lay_out_row(&mut items, &rect, PICKER_ITEM_SIZE, PICKER_ITEM_SIZE);
    PickerPanel { kind, rect, items }
}

fn prompt_bar(ai: &AiEditState, bar: &Rect, view: &Rect) -> PromptBar {
    let rect = place_beside(bar, view, PROMPT_BAR_WIDTH, PROMPT_BAR_HEIGHT);
    let inner = rect.inset(PANEL_PADDING);
    let cancel_rect = Rect::new(
        inner.max_x() - PROMPT_BUTTON_WIDTH,
        inner.min_y(),
        PROMPT_BUTTON_WIDTH,
        inner.height,
    );
    let send_rect =
        cancel_rect.translated(Offset::new(-(PROMPT_BUTTON_WIDTH + BUTTON_SPACING), 0.0));
    let field = Rect::new(
        inner.min_x(),
        inner.min_y(),
        (send_rect.min_x() - BUTTON_SPACING - inner.min_x()).max(0.0),
        inner.height,
    );
    let sending = ai.is_sending();
    let mut send = ToolbarButton::labeled(
        if sending { "…" } else { "Send" },
        OverlayCommand::SendAi,
    );
    send.rect = send_rect;
    send.enabled = !sending;
    let mut cancel = ToolbarButton::labeled("Cancel", OverlayCommand::CancelAi);
    cancel.rect = cancel_rect;
    PromptBar {
        rect,
        field,
        text: ai.prompt().to_string(),
        sending,
        send,
        cancel,
    }
}

fn row_width(count: usize, item: f64) -> f64 {
    let count = count as f64;
    count * item + (count - 1.0).max(0.0) * BUTTON_SPACING + PANEL_PADDING * 2.0
}

fn lay_out_row(buttons: &mut [ToolbarButton], panel: &Rect, width: f64, height: f64) {
    let mut x = panel.min_x() + PANEL_PADDING;
    let y = panel.min_y() + PANEL_PADDING;
    for button in buttons {
        button.rect = Rect::new(x, y, width, height);
        x += width + BUTTON_SPACING;
    }
}

/// Below the selection, else above it, else inside its bottom edge.
fn place_bar(selection: &Rect, view: &Rect, width: f64, height: f64) -> (Rect, ToolbarPlacement) {
    let x = selection.mid_x() - width / 2.0;
    let below = selection.min_y() - PANEL_GAP - height;
    let above = selection.max_y() + PANEL_GAP;
    let (y, placement) = if below >= view.min_y() {
        (below, ToolbarPlacement::Below)
    } else if above + height <= view.max_y() {
        (above, ToolbarPlacement::Above)
    } else {
        (selection.min_y() + PANEL_GAP, ToolbarPlacement::Inside)
    };
    (
        Rect::new(x, y, width, height).clamped_within(view),
        placement,
    )
}

/// Under `anchor` when there is room, otherwise over it.
fn place_beside(anchor: &Rect, view: &Rect, width: f64, height: f64) -> Rect {
    let below = anchor.min_y() - PANEL_GAP - height;
    let y = if below >= view.min_y() {
        below
    } else {
        anchor.max_y() + PANEL_GAP
    };
    Rect::new(anchor.mid_x() - width / 2.0, y, width, height).clamped_within(view)
}
