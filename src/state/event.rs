use crate::ai::AiEditJob;
use crate::editor::{ColorTarget, ToolKind};
use crate::geometry::{Color, Point};
use crate::toolbar::PickerKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// View-space location.
    pub location: Point,
    /// 1 for a single click, 2 for a double click.
    pub click_count: u32,
}

impl PointerEvent {
    pub const fn new(location: Point) -> Self {
        Self {
            location,
            click_count: 1,
        }
    }

    pub const fn at(x: f64, y: f64) -> Self {
        Self::new(Point::new(x, y))
    }

    pub const fn double_click(location: Point) -> Self {
        Self {
            location,
            click_count: 2,
        }
    }

    pub const fn is_double_click(&self) -> bool {
        self.click_count >= 2
    }
}

/// Everything a toolbar button or picker can ask the session to do.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayCommand {
    SelectTool(ToolKind),
    SetStrokeColor(Color),
    SetFillColor(Option<Color>),
    /// Writes to whichever swatch the color target points at.
    ApplyColor(Color),
    SetColorTarget(ColorTarget),
    SetLineWidth(f64),
    SetFontName(String),
    SetFontSize(f64),
    TogglePicker(PickerKind),
    Undo,
    DeleteSelected,
    Copy,
    Save,
    Close,
    SetAiPrompt(String),
    SendAi,
    CancelAi,
}

/// Side effects the host performs on behalf of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEffect {
    Redraw,
    CloseOverlay,
    CopyImage,
    SaveImage,
    /// Other overlays should drop their selections.
    SelectionStarted,
    Notify(String),
    SendAiRequest(AiEditJob),
}
