use crate::geometry::{
    distance_to_segment, ellipse_hit, normalize, rect_edge_hit, Color, Offset, Point, Rect,
};

#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub name: String,
    pub size: f64,
}

impl FontSpec {
    pub fn new(name: impl Into<String>, size: f64) -> Self {
        Self {
            name: name.into(),
            size: clamp_font_size(size),
        }
    }

    pub fn set_size(&mut self, size: f64) {
        self.size = clamp_font_size(size);
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self::new(DEFAULT_FONT_NAME, DEFAULT_FONT_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementStyle {
    pub stroke: Color,
    pub fill: Option<Color>,
    pub line_width: f64,
    pub font: FontSpec,
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            stroke: Color::RED,
            fill: None,
            line_width: 3.0,
            font: FontSpec::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementShape {
    Pen { points: Vec<Point> },
    Line { start: Point, end: Point },
    Arrow { start: Point, end: Point },
    Rectangle { rect: Rect },
    Ellipse { rect: Rect },
    Text { content: String, rect: Rect },
}

impl ElementShape {
    const fn supports_fill(&self) -> bool {
        matches!(self, Self::Rectangle { .. } | Self::Ellipse { .. })
    }

    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Pen { .. } => "pen",
            Self::Line { .. } => "line",
            Self::Arrow { .. } => "arrow",
            Self::Rectangle { .. } => "rectangle",
            Self::Ellipse { .. } => "ellipse",
            Self::Text { .. } => "text",
        }
    }
}

/// One committed annotation. Geometry is in view space, same as the selection.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingElement {
    pub shape: ElementShape,
    pub style: ElementStyle,
}

impl DrawingElement {
    /// Fill is only kept for rectangles and ellipses.
    pub fn new(shape: ElementShape, mut style: ElementStyle) -> Self {
        if !shape.supports_fill() {
            style.fill = None;
        }
        Self { shape, style }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.shape, ElementShape::Text { .. })
    }

    pub fn translated(&self, delta: Offset) -> Self {
        let shape = match &self.shape {
            ElementShape::Pen { points } => ElementShape::Pen {
                points: points.iter().map(|point| point.offset(delta)).collect(),
            },
            ElementShape::Line { start, end } => ElementShape::Line {
                start: start.offset(delta),
                end: end.offset(delta),
            },
            ElementShape::Arrow { start, end } => ElementShape::Arrow {
                start: start.offset(delta),
                end: end.offset(delta),
            },
            ElementShape::Rectangle { rect } => ElementShape::Rectangle {
                rect: rect.translated(delta),
            },
            ElementShape::Ellipse { rect } => ElementShape::Ellipse {
                rect: rect.translated(delta),
            },
            ElementShape::Text { content, rect } => ElementShape::Text {
                content: content.clone(),
                rect: rect.translated(delta),
            },
        };
        Self {
            shape,
            style: self.style.clone(),
        }
    }

    pub fn bounding_rect(&self) -> Rect {
        match &self.shape {
            ElementShape::Pen { points } => points_bounds(points),
            ElementShape::Line { start, end } | ElementShape::Arrow { start, end } => {
                normalize(*start, *end)
            }
            ElementShape::Rectangle { rect }
            | ElementShape::Ellipse { rect }
            | ElementShape::Text { rect, .. } => *rect,
        }
    }

    /// Stroke-aware hit test; `tolerance` is added on top of half the line width.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let reach = tolerance + self.style.line_width / 2.0;
        let filled = self.style.fill.is_some();
        match &self.shape {
            ElementShape::Pen { points } => match points.as_slice() {
                [] => false,
                [only] => point.distance(*only) <= reach,
                _ => points
                    .windows(2)
                    .any(|pair| distance_to_segment(point, pair[0], pair[1]) <= reach),
            },
            ElementShape::Line { start, end } | ElementShape::Arrow { start, end } => {
                distance_to_segment(point, *start, *end) <= reach
            }
            ElementShape::Rectangle { rect } => rect_edge_hit(point, rect, reach, filled),
            ElementShape::Ellipse { rect } => ellipse_hit(point, rect, reach, filled),
            ElementShape::Text { rect, .. } => rect.contains(point),
        }
    }
}

fn points_bounds(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::default();
    };
    let (min, max) = points[1..]
        .iter()
        .fold((*first, *first), |(min, max), point| {
            (
                Point::new(min.x.min(point.x), min.y.min(point.y)),
                Point::new(max.x.max(point.x), max.y.max(point.y)),
            )
        });
    normalize(min, max)
}

fn clamp_font_size(size: f64) -> f64 {
    if size.is_finite() {
        size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
    } else {
        DEFAULT_FONT_SIZE
    }
}

pub const DEFAULT_FONT_NAME: &str = "Helvetica";
pub const DEFAULT_FONT_SIZE: f64 = 18.0;
const MIN_FONT_SIZE: f64 = 6.0;
const MAX_FONT_SIZE: f64 = 200.0;

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> ElementStyle {
        ElementStyle {
            line_width: 2.0,
            ..ElementStyle::default()
        }
    }

    fn sample_elements() -> Vec<DrawingElement> {
        vec![
            DrawingElement::new(
                ElementShape::Pen {
                    points: vec![
                        Point::new(1.5, 2.0),
                        Point::new(4.0, 9.25),
                        Point::new(-3.0, 7.0),
                    ],
                },
                style(),
            ),
            DrawingElement::new(
                ElementShape::Arrow {
                    start: Point::new(0.1, 0.2),
                    end: Point::new(30.0, 40.0),
                },
                style(),
            ),
            DrawingElement::new(
                ElementShape::Ellipse {
                    rect: Rect::new(5.0, 5.0, 10.0, 20.0),
                },
                style(),
            ),
            DrawingElement::new(
                ElementShape::Text {
                    content: "hi".to_string(),
                    rect: Rect::new(1.0, 2.0, 40.0, 24.0),
                },
                style(),
            ),
        ]
    }

    #[test]
    fn fill_is_dropped_for_shapes_without_interior() {
        let filled = ElementStyle {
            fill: Some(Color::WHITE),
            ..style()
        };
        let line = DrawingElement::new(
            ElementShape::Line {
                start: Point::new(0.0, 0.0),
                end: Point::new(1.0, 1.0),
            },
            filled.clone(),
        );
        assert_eq!(line.style.fill, None);

        let rect = DrawingElement::new(
            ElementShape::Rectangle {
                rect: Rect::new(0.0, 0.0, 5.0, 5.0),
            },
            filled,
        );
        assert_eq!(rect.style.fill, Some(Color::WHITE));
    }

    #[test]
    fn translate_round_trip_restores_geometry() {
        let delta = Offset::new(13.7, -4.2);
        for element in sample_elements() {
            let moved = element.translated(delta);
            let moved_bounds = moved.bounding_rect();
            let bounds = element.bounding_rect();
            assert!((moved_bounds.x - bounds.x - delta.dx).abs() < 1e-9);
            assert!((moved_bounds.y - bounds.y - delta.dy).abs() < 1e-9);

            let restored = moved.translated(delta.inverted());
            let restored_bounds = restored.bounding_rect();
            assert!((restored_bounds.x - bounds.x).abs() < 1e-9);
            assert!((restored_bounds.y - bounds.y).abs() < 1e-9);
            assert_eq!(restored.style, element.style);
        }
    }

    #[test]
    fn bounding_rect_covers_pen_points_and_endpoints() {
        let elements = sample_elements();
        assert_eq!(elements[0].bounding_rect(), Rect::new(-3.0, 2.0, 7.0, 7.25));
        assert_eq!(
            elements[1].bounding_rect(),
            normalize(Point::new(0.1, 0.2), Point::new(30.0, 40.0))
        );
    }

    #[test]
    fn hit_test_accounts_for_line_width_and_fill() {
        let line = DrawingElement::new(
            ElementShape::Line {
                start: Point::new(0.0, 0.0),
                end: Point::new(100.0, 0.0),
            },
            ElementStyle {
                line_width: 10.0,
                ..ElementStyle::default()
            },
        );
        assert!(line.hit_test(Point::new(50.0, 8.0), 4.0));
        assert!(!line.hit_test(Point::new(50.0, 10.0), 4.0));

        let hollow = DrawingElement::new(
            ElementShape::Rectangle {
                rect: Rect::new(0.0, 0.0, 100.0, 100.0),
            },
            style(),
        );
        assert!(!hollow.hit_test(Point::new(50.0, 50.0), 4.0));
        let filled = DrawingElement::new(
            hollow.shape.clone(),
            ElementStyle {
                fill: Some(Color::BLACK),
                ..style()
            },
        );
        assert!(filled.hit_test(Point::new(50.0, 50.0), 4.0));
    }

    #[test]
    fn font_size_is_clamped() {
        let mut font = FontSpec::new("Menlo", 1.0);
        assert_eq!(font.size, MIN_FONT_SIZE);
        font.set_size(f64::NAN);
        assert_eq!(font.size, DEFAULT_FONT_SIZE);
        font.set_size(500.0);
        assert_eq!(font.size, MAX_FONT_SIZE);
    }
}
