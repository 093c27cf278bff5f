use crate::geometry::Color;

use super::{ElementStyle, FontSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolOptionVisibility {
    pub has_stroke_color: bool,
    pub has_fill_color: bool,
    pub has_line_width: bool,
    pub has_font: bool,
}

impl ToolOptionVisibility {
    pub const fn has_any(&self) -> bool {
        let Self {
            has_stroke_color,
            has_fill_color,
            has_line_width,
            has_font,
        } = *self;
        has_stroke_color || has_fill_color || has_line_width || has_font
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Move,
    Select,
    Pen,
    Line,
    Arrow,
    Rectangle,
    Ellipse,
    Text,
    Eraser,
    Eyedropper,
    Ai,
}

impl ToolKind {
    pub const ALL: [ToolKind; 11] = [
        Self::Move,
        Self::Select,
        Self::Pen,
        Self::Line,
        Self::Arrow,
        Self::Rectangle,
        Self::Ellipse,
        Self::Text,
        Self::Eraser,
        Self::Eyedropper,
        Self::Ai,
    ];

    pub const fn is_drawing(self) -> bool {
        matches!(
            self,
            Self::Pen | Self::Line | Self::Arrow | Self::Rectangle | Self::Ellipse
        )
    }

    pub const fn shortcut(self) -> char {
        match self {
            Self::Move => 'v',
            Self::Select => 'm',
            Self::Pen => 'p',
            Self::Line => 'l',
            Self::Arrow => 'w',
            Self::Rectangle => 'r',
            Self::Ellipse => 'c',
            Self::Text => 't',
            Self::Eraser => 'e',
            Self::Eyedropper => 'i',
            Self::Ai => 'a',
        }
    }

    pub fn from_shortcut(key: char) -> Option<Self> {
        let key = key.to_ascii_lowercase();
        Self::ALL.into_iter().find(|tool| tool.shortcut() == key)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Move => "Move",
            Self::Select => "Select",
            Self::Pen => "Pen",
            Self::Line => "Line",
            Self::Arrow => "Arrow",
            Self::Rectangle => "Rect",
            Self::Ellipse => "Ellipse",
            Self::Text => "Text",
            Self::Eraser => "Eraser",
            Self::Eyedropper => "Picker",
            Self::Ai => "AI",
        }
    }

    pub const fn option_visibility(self) -> ToolOptionVisibility {
        match self {
            Self::Pen | Self::Line | Self::Arrow => ToolOptionVisibility {
                has_stroke_color: true,
                has_fill_color: false,
                has_line_width: true,
                has_font: false,
            },
            Self::Rectangle | Self::Ellipse => ToolOptionVisibility {
                has_stroke_color: true,
                has_fill_color: true,
                has_line_width: true,
                has_font: false,
            },
            Self::Text => ToolOptionVisibility {
                has_stroke_color: true,
                has_fill_color: false,
                has_line_width: false,
                has_font: true,
            },
            Self::Move | Self::Select | Self::Eraser | Self::Eyedropper | Self::Ai => {
                ToolOptionVisibility {
                    has_stroke_color: false,
                    has_fill_color: false,
                    has_line_width: false,
                    has_font: false,
                }
            }
        }
    }
}

/// Which swatch a picked color updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorTarget {
    #[default]
    Stroke,
    Fill,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolState {
    tool: ToolKind,
    stroke_color: Color,
    fill_color: Option<Color>,
    line_width: f64,
    font: FontSpec,
    color_target: ColorTarget,
}

impl Default for ToolState {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolState {
    pub fn new() -> Self {
        let style = ElementStyle::default();
        Self {
            tool: ToolKind::Move,
            stroke_color: style.stroke,
            fill_color: style.fill,
            line_width: style.line_width,
            font: style.font,
            color_target: ColorTarget::Stroke,
        }
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub(crate) fn set_tool(&mut self, tool: ToolKind) {
        self.tool = tool;
    }

    pub fn stroke_color(&self) -> Color {
        self.stroke_color
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        self.stroke_color = color;
    }

    pub fn fill_color(&self) -> Option<Color> {
        self.fill_color
    }

    pub fn set_fill_color(&mut self, color: Option<Color>) {
        self.fill_color = color;
    }

    pub fn line_width(&self) -> f64 {
        self.line_width
    }

    pub fn set_line_width(&mut self, width: f64) {
        self.line_width = if width.is_finite() {
            width.clamp(MIN_LINE_WIDTH, MAX_LINE_WIDTH)
        } else {
            MIN_LINE_WIDTH
        };
    }

    pub fn font(&self) -> &FontSpec {
        &self.font
    }

    pub fn set_font_name(&mut self, name: impl Into<String>) {
        self.font.name = name.into();
    }

    pub fn set_font_size(&mut self, size: f64) {
        self.font.set_size(size);
    }

    pub fn color_target(&self) -> ColorTarget {
        self.color_target
    }

    pub fn set_color_target(&mut self, target: ColorTarget) {
        self.color_target = target;
    }

    /// Writes `color` to whichever swatch is the active target.
    pub fn apply_picked_color(&mut self, color: Color) {
        match self.color_target {
            ColorTarget::Stroke => self.stroke_color = color,
            ColorTarget::Fill => self.fill_color = Some(color),
        }
    }

    pub fn style(&self) -> ElementStyle {
        ElementStyle {
            stroke: self.stroke_color,
            fill: self.fill_color,
            line_width: self.line_width,
            font: self.font.clone(),
        }
    }
}

pub const LINE_WIDTH_CHOICES: [f64; 6] = [1.0, 2.0, 3.0, 5.0, 8.0, 12.0];
pub const FONT_SIZE_CHOICES: [f64; 6] = [12.0, 14.0, 18.0, 24.0, 32.0, 48.0];
pub const FONT_NAME_CHOICES: [&str; 4] = ["Helvetica", "Menlo", "Georgia", "Avenir Next"];
pub const COLOR_PALETTE: [Color; 10] = [
    Color::RED,
    Color::new(255, 149, 0),
    Color::new(255, 204, 0),
    Color::new(52, 199, 89),
    Color::new(0, 199, 190),
    Color::new(0, 122, 255),
    Color::new(88, 86, 214),
    Color::new(255, 45, 85),
    Color::BLACK,
    Color::WHITE,
];

const MIN_LINE_WIDTH: f64 = 1.0;
const MAX_LINE_WIDTH: f64 = 48.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortcuts_round_trip_for_every_tool() {
        for tool in ToolKind::ALL {
            assert_eq!(ToolKind::from_shortcut(tool.shortcut()), Some(tool));
        }
        assert_eq!(ToolKind::from_shortcut('R'), Some(ToolKind::Rectangle));
        assert_eq!(ToolKind::from_shortcut('z'), None);
    }

    #[test]
    fn shapes_with_interior_show_fill_option() {
        for tool in [ToolKind::Rectangle, ToolKind::Ellipse] {
            assert!(tool.option_visibility().has_fill_color, "{tool:?}");
        }
        for tool in [ToolKind::Pen, ToolKind::Line, ToolKind::Arrow] {
            let vis = tool.option_visibility();
            assert!(!vis.has_fill_color, "{tool:?}");
            assert!(vis.has_line_width, "{tool:?}");
        }
        assert!(ToolKind::Text.option_visibility().has_font);
        assert!(!ToolKind::Move.option_visibility().has_any());
        assert!(!ToolKind::Ai.option_visibility().has_any());
    }

    #[test]
    fn picked_color_goes_to_active_target() {
        let mut state = ToolState::new();
        state.apply_picked_color(Color::new(1, 2, 3));
        assert_eq!(state.stroke_color(), Color::new(1, 2, 3));
        assert_eq!(state.fill_color(), None);

        state.set_color_target(ColorTarget::Fill);
        state.apply_picked_color(Color::new(4, 5, 6));
        assert_eq!(state.fill_color(), Some(Color::new(4, 5, 6)));
        assert_eq!(state.stroke_color(), Color::new(1, 2, 3));
    }

    #[test]
    fn line_width_is_clamped() {
        let mut state = ToolState::new();
        state.set_line_width(0.0);
        assert_eq!(state.line_width(), MIN_LINE_WIDTH);
        state.set_line_width(99.0);
        assert_eq!(state.line_width(), MAX_LINE_WIDTH);
        state.set_line_width(f64::INFINITY);
        assert_eq!(state.line_width(), MIN_LINE_WIDTH);
    }
}
