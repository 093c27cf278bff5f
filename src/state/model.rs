use std::sync::Arc;

use image::RgbaImage;

use crate::editor::{DrawingElement, ElementShape, ElementStyle, ToolKind};
use crate::geometry::{normalize, Offset, Point, Rect};

use super::handles::Handle;

/// One captured display handed to a new overlay session.
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    pub display_id: u32,
    pub bitmap: Arc<RgbaImage>,
    pub view_bounds: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionMode {
    /// No selection yet, or a drag that defines a region, shape, text area or AI rectangle.
    Creating { drag: Option<CreateDrag> },
    Active,
    Moving(MoveTarget),
    Resizing(ResizeTarget),
}

impl Default for InteractionMode {
    fn default() -> Self {
        Self::Creating { drag: None }
    }
}

impl InteractionMode {
    pub fn is_dragging(&self) -> bool {
        match self {
            Self::Creating { drag } => drag.is_some(),
            Self::Active => false,
            Self::Moving(_) | Self::Resizing(_) => true,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Creating { .. } => "creating",
            Self::Active => "active",
            Self::Moving(_) => "moving",
            Self::Resizing(_) => "resizing",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreateDrag {
    Selection { anchor: Point, current: Point },
    Shape(ShapeDraft),
    TextArea { anchor: Point, current: Point },
    AiRect { anchor: Point, current: Point },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveTarget {
    /// `grab` is the pointer position relative to the selection origin.
    Selection { grab: Offset },
    Element { index: usize, last: Point },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeTarget {
    Selection { handle: Handle, origin: Rect },
    TextArea { handle: Handle, origin: Rect },
}

/// Shape being drawn. Pen keeps every sample; the other tools keep start and end.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDraft {
    tool: ToolKind,
    points: Vec<Point>,
}

const MIN_SEGMENT_LENGTH: f64 = 1.0;

impl ShapeDraft {
    pub fn new(tool: ToolKind, start: Point) -> Self {
        Self {
            tool,
            points: vec![start],
        }
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn update(&mut self, point: Point) {
        match self.tool {
            ToolKind::Pen => {
                if self.points.last() != Some(&point) {
                    self.points.push(point);
                }
            }
            _ => {
                self.points.truncate(1);
                self.points.push(point);
            }
        }
    }

    fn start_end(&self) -> Option<(Point, Point)> {
        let start = *self.points.first()?;
        let end = *self.points.last()?;
        Some((start, end))
    }

    /// Element for the current geometry, or `None` while it is still degenerate.
    pub fn to_element(&self, style: ElementStyle) -> Option<DrawingElement> {
        let shape = match self.tool {
            ToolKind::Pen => {
                if self.points.len() < 2 {
                    return None;
                }
                ElementShape::Pen {
                    points: self.points.clone(),
                }
            }
            ToolKind::Line | ToolKind::Arrow => {
                let (start, end) = self.start_end()?;
                if start.distance(end) < MIN_SEGMENT_LENGTH {
                    return None;
                }
                if self.tool == ToolKind::Line {
                    ElementShape::Line { start, end }
                } else {
                    ElementShape::Arrow { start, end }
                }
            }
            ToolKind::Rectangle | ToolKind::Ellipse => {
                let (start, end) = self.start_end()?;
                let rect = normalize(start, end);
                if rect.is_empty() {
                    return None;
                }
                if self.tool == ToolKind::Rectangle {
                    ElementShape::Rectangle { rect }
                } else {
                    ElementShape::Ellipse { rect }
                }
            }
            _ => return None,
        };
        Some(DrawingElement::new(shape, style))
    }
}

/// Pointer cursor the host should show for the current hover position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorHint {
    #[default]
    Arrow,
    Crosshair,
    Move,
    Pointer,
    Text,
    Eraser,
    Eyedropper,
    ResizeHorizontal,
    ResizeVertical,
    /// Top-left to bottom-right diagonal.
    ResizeDiagonalDown,
    /// Bottom-left to top-right diagonal.
    ResizeDiagonalUp,
}

impl CursorHint {
    pub const fn for_handle(handle: Handle) -> Self {
        match handle {
            Handle::Left | Handle::Right => Self::ResizeHorizontal,
            Handle::Top | Handle::Bottom => Self::ResizeVertical,
            Handle::TopLeft | Handle::BottomRight => Self::ResizeDiagonalDown,
            Handle::TopRight | Handle::BottomLeft => Self::ResizeDiagonalUp,
        }
    }

    pub const fn for_tool(tool: ToolKind) -> Self {
        match tool {
            ToolKind::Move => Self::Move,
            ToolKind::Select => Self::Pointer,
            ToolKind::Text => Self::Text,
            ToolKind::Eraser => Self::Eraser,
            ToolKind::Eyedropper => Self::Eyedropper,
            ToolKind::Pen
            | ToolKind::Line
            | ToolKind::Arrow
            | ToolKind::Rectangle
            | ToolKind::Ellipse
            | ToolKind::Ai => Self::Crosshair,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pen_draft_collects_distinct_points() {
        let mut draft = ShapeDraft::new(ToolKind::Pen, Point::new(0.0, 0.0));
        assert!(draft.to_element(ElementStyle::default()).is_none());
        draft.update(Point::new(1.0, 1.0));
        draft.update(Point::new(1.0, 1.0));
        draft.update(Point::new(2.0, 3.0));
        let element = draft
            .to_element(ElementStyle::default())
            .expect("pen should produce an element");
        let ElementShape::Pen { points } = element.shape else {
            panic!("expected pen");
        };
        assert_eq!(points.len(), 3);
    }

    #[test]
    fn rectangle_draft_normalizes_and_drops_degenerate() {
        let mut draft = ShapeDraft::new(ToolKind::Rectangle, Point::new(60.0, 40.0));
        draft.update(Point::new(60.0, 90.0));
        assert!(draft.to_element(ElementStyle::default()).is_none());
        draft.update(Point::new(10.0, 10.0));
        let element = draft
            .to_element(ElementStyle::default())
            .expect("rectangle should produce an element");
        assert_eq!(
            element.shape,
            ElementShape::Rectangle {
                rect: Rect::new(10.0, 10.0, 50.0, 30.0)
            }
        );
    }

    #[test]
    fn arrow_draft_keeps_only_start_and_latest_end() {
        let mut draft = ShapeDraft::new(ToolKind::Arrow, Point::new(0.0, 0.0));
        draft.update(Point::new(5.0, 5.0));
        draft.update(Point::new(9.0, 0.0));
        let element = draft
            .to_element(ElementStyle::default())
            .expect("arrow should produce an element");
        assert_eq!(
            element.shape,
            ElementShape::Arrow {
                start: Point::new(0.0, 0.0),
                end: Point::new(9.0, 0.0)
            }
        );
    }

    #[test]
    fn drag_modes_report_dragging() {
        assert!(!InteractionMode::default().is_dragging());
        assert!(!InteractionMode::Active.is_dragging());
        assert!(InteractionMode::Moving(MoveTarget::Selection {
            grab: Offset::default()
        })
        .is_dragging());
    }
}
