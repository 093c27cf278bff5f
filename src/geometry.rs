//! Shared geometric and color primitives used across the overlay modules.
//!
//! View space has its origin at the bottom-left corner of the display and y grows upward.
//! Bitmaps have their origin at the top-left corner, so every view-to-pixel mapping flips the
//! vertical axis.

const PIXEL_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, delta: Offset) -> Self {
        Self::new(self.x + delta.dx, self.y + delta.dy)
    }

    pub fn offset_to(self, other: Point) -> Offset {
        Offset::new(other.x - self.x, other.y - self.y)
    }

    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Offset {
    pub dx: f64,
    pub dy: f64,
}

impl Offset {
    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    pub fn inverted(self) -> Self {
        Self::new(-self.dx, -self.dy)
    }

    pub fn is_zero(self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle; `(x, y)` is the minimum corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn mid_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn mid_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn center(&self) -> Point {
        Point::new(self.mid_x(), self.mid_y())
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Inclusive on all four edges.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x()
            && point.x <= self.max_x()
            && point.y >= self.min_y()
            && point.y <= self.max_y()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.min_x() >= self.min_x()
            && other.max_x() <= self.max_x()
            && other.min_y() >= self.min_y()
            && other.max_y() <= self.max_y()
    }

    /// Positive `amount` shrinks, negative grows.
    pub fn inset(&self, amount: f64) -> Rect {
        Rect::new(
            self.x + amount,
            self.y + amount,
            (self.width - 2.0 * amount).max(0.0),
            (self.height - 2.0 * amount).max(0.0),
        )
    }

    /// Grows each side up to `min`, keeping the minimum corner.
    pub fn with_min_size(&self, min: Size) -> Rect {
        Rect::new(
            self.x,
            self.y,
            self.width.max(min.width),
            self.height.max(min.height),
        )
    }

    pub fn translated(&self, delta: Offset) -> Rect {
        Rect::new(self.x + delta.dx, self.y + delta.dy, self.width, self.height)
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.min_x().max(other.min_x());
        let right = self.max_x().min(other.max_x());
        let bottom = self.min_y().max(other.min_y());
        let top = self.max_y().min(other.max_y());
        if right <= left || top <= bottom {
            return None;
        }
        Some(Rect::new(left, bottom, right - left, top - bottom))
    }

    /// Moves the rectangle (without resizing) so it lies inside `bounds` when it fits.
    pub fn clamped_within(&self, bounds: &Rect) -> Rect {
        let max_x = (bounds.max_x() - self.width).max(bounds.min_x());
        let max_y = (bounds.max_y() - self.height).max(bounds.min_y());
        Rect::new(
            self.x.clamp(bounds.min_x(), max_x),
            self.y.clamp(bounds.min_y(), max_y),
            self.width,
            self.height,
        )
    }
}

/// Integral rectangle in bitmap pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const RED: Color = Color::new(255, 59, 48);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub const fn rgb(self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }

    pub const fn rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Rectangle spanned by two drag points, independent of drag direction.
pub fn normalize(p1: Point, p2: Point) -> Rect {
    let left = p1.x.min(p2.x);
    let bottom = p1.y.min(p2.y);
    Rect::new(
        left,
        bottom,
        p1.x.max(p2.x) - left,
        p1.y.max(p2.y) - bottom,
    )
}

pub fn clamp_point(point: Point, bounds: &Rect) -> Point {
    Point::new(
        point.x.clamp(bounds.min_x(), bounds.max_x().max(bounds.min_x())),
        point.y.clamp(bounds.min_y(), bounds.max_y().max(bounds.min_y())),
    )
}

fn view_scale(view_bounds: &Rect, image_width: u32, image_height: u32) -> (f64, f64) {
    (
        f64::from(image_width) / view_bounds.width.max(f64::EPSILON),
        f64::from(image_height) / view_bounds.height.max(f64::EPSILON),
    )
}

/// Maps a view rectangle onto bitmap pixels: scale, flip, expand to whole pixels, clamp.
pub fn view_rect_to_image_rect(
    rect: &Rect,
    view_bounds: &Rect,
    image_width: u32,
    image_height: u32,
) -> PixelRect {
    let (scale_x, scale_y) = view_scale(view_bounds, image_width, image_height);
    let image_w = f64::from(image_width);
    let image_h = f64::from(image_height);

    let left = ((rect.min_x() - view_bounds.min_x()) * scale_x + PIXEL_EPSILON)
        .floor()
        .clamp(0.0, image_w);
    let top = ((view_bounds.max_y() - rect.max_y()) * scale_y + PIXEL_EPSILON)
        .floor()
        .clamp(0.0, image_h);
    let right = ((rect.max_x() - view_bounds.min_x()) * scale_x - PIXEL_EPSILON)
        .ceil()
        .clamp(left, image_w);
    let bottom = ((view_bounds.max_y() - rect.min_y()) * scale_y - PIXEL_EPSILON)
        .ceil()
        .clamp(top, image_h);

    PixelRect::new(
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    )
}

pub fn image_rect_to_view_rect(
    rect: &PixelRect,
    view_bounds: &Rect,
    image_width: u32,
    image_height: u32,
) -> Rect {
    let (scale_x, scale_y) = view_scale(view_bounds, image_width, image_height);
    let width = f64::from(rect.width) / scale_x;
    let height = f64::from(rect.height) / scale_y;
    let max_y = view_bounds.max_y() - f64::from(rect.y) / scale_y;
    Rect::new(
        view_bounds.min_x() + f64::from(rect.x) / scale_x,
        max_y - height,
        width,
        height,
    )
}

/// Pixel under a view point, clamped to the bitmap. `None` for an empty bitmap.
pub fn view_point_to_pixel(
    point: Point,
    view_bounds: &Rect,
    image_width: u32,
    image_height: u32,
) -> Option<(u32, u32)> {
    if image_width == 0 || image_height == 0 {
        return None;
    }
    let (scale_x, scale_y) = view_scale(view_bounds, image_width, image_height);
    let x = ((point.x - view_bounds.min_x()) * scale_x).floor();
    let y = ((view_bounds.max_y() - point.y) * scale_y).floor();
    Some((
        x.clamp(0.0, f64::from(image_width - 1)) as u32,
        y.clamp(0.0, f64::from(image_height - 1)) as u32,
    ))
}

pub fn distance_to_segment(point: Point, start: Point, end: Point) -> f64 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_sq = dx * dx + dy * dy;
    if length_sq <= f64::EPSILON {
        return point.distance(start);
    }
    let t = (((point.x - start.x) * dx + (point.y - start.y) * dy) / length_sq).clamp(0.0, 1.0);
    point.distance(Point::new(start.x + t * dx, start.y + t * dy))
}

/// Near one of the four edges, or anywhere inside when `filled`.
pub fn rect_edge_hit(point: Point, rect: &Rect, tolerance: f64, filled: bool) -> bool {
    if filled && rect.contains(point) {
        return true;
    }
    let bl = Point::new(rect.min_x(), rect.min_y());
    let br = Point::new(rect.max_x(), rect.min_y());
    let tr = Point::new(rect.max_x(), rect.max_y());
    let tl = Point::new(rect.min_x(), rect.max_y());
    [(bl, br), (br, tr), (tr, tl), (tl, bl)]
        .into_iter()
        .map(|(start, end)| distance_to_segment(point, start, end))
        .fold(f64::INFINITY, f64::min)
        <= tolerance
}

/// Ellipse inscribed in `rect`: near the outline, or anywhere inside when `filled`.
pub fn ellipse_hit(point: Point, rect: &Rect, tolerance: f64, filled: bool) -> bool {
    let rx = rect.width / 2.0;
    let ry = rect.height / 2.0;
    let center = rect.center();
    if rx <= f64::EPSILON || ry <= f64::EPSILON {
        let start = Point::new(rect.min_x(), rect.min_y());
        let end = Point::new(rect.max_x(), rect.max_y());
        return distance_to_segment(point, start, end) <= tolerance;
    }

    let dx = point.x - center.x;
    let dy = point.y - center.y;
    let normalized = |rx: f64, ry: f64| (dx / rx).powi(2) + (dy / ry).powi(2);

    if normalized(rx + tolerance, ry + tolerance) > 1.0 {
        return false;
    }
    if filled {
        return true;
    }
    let inner_rx = rx - tolerance;
    let inner_ry = ry - tolerance;
    if inner_rx <= 0.0 || inner_ry <= 0.0 {
        return true;
    }
    normalized(inner_rx, inner_ry) >= 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_uses_component_min_max_for_every_drag_direction() {
        let a = Point::new(60.0, 10.0);
        let b = Point::new(10.0, 40.0);
        let expected = Rect::new(10.0, 10.0, 50.0, 30.0);
        assert_eq!(normalize(a, b), expected);
        assert_eq!(normalize(b, a), expected);
        assert_eq!(
            normalize(Point::new(10.0, 10.0), Point::new(60.0, 40.0)),
            expected
        );
        assert_eq!(
            normalize(Point::new(60.0, 40.0), Point::new(10.0, 10.0)),
            expected
        );
    }

    #[test]
    fn clamp_point_keeps_points_inside_bounds() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert_eq!(
            clamp_point(Point::new(-5.0, 80.0), &bounds),
            Point::new(0.0, 50.0)
        );
        assert_eq!(
            clamp_point(Point::new(20.0, 20.0), &bounds),
            Point::new(20.0, 20.0)
        );
    }

    #[test]
    fn view_rect_to_image_rect_flips_vertical_axis() {
        let view = Rect::new(0.0, 0.0, 400.0, 300.0);
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        let pixels = view_rect_to_image_rect(&rect, &view, 400, 300);
        assert_eq!(pixels, PixelRect::new(10, 230, 100, 50));
    }

    #[test]
    fn view_rect_to_image_rect_scales_for_dense_bitmaps() {
        let view = Rect::new(0.0, 0.0, 400.0, 300.0);
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        let pixels = view_rect_to_image_rect(&rect, &view, 800, 600);
        assert_eq!(pixels, PixelRect::new(20, 460, 200, 100));
    }

    #[test]
    fn view_rect_to_image_rect_expands_fractional_edges_and_clamps() {
        let view = Rect::new(0.0, 0.0, 100.0, 100.0);
        let rect = Rect::new(10.5, 10.5, 20.0, 20.0);
        assert_eq!(
            view_rect_to_image_rect(&rect, &view, 100, 100),
            PixelRect::new(10, 69, 21, 21)
        );

        let overflowing = Rect::new(-10.0, 90.0, 50.0, 50.0);
        assert_eq!(
            view_rect_to_image_rect(&overflowing, &view, 100, 100),
            PixelRect::new(0, 0, 40, 10)
        );
    }

    #[test]
    fn view_rect_round_trips_within_one_pixel() {
        let view = Rect::new(100.0, 50.0, 1440.0, 900.0);
        for &(scale, rect) in &[
            (1_u32, Rect::new(110.0, 60.0, 200.0, 150.0)),
            (2, Rect::new(333.3, 421.7, 97.9, 55.1)),
            (2, Rect::new(100.0, 50.0, 1440.0, 900.0)),
            (3, Rect::new(1000.25, 700.75, 12.5, 33.0)),
        ] {
            let width = 1440 * scale;
            let height = 900 * scale;
            let pixels = view_rect_to_image_rect(&rect, &view, width, height);
            let back = image_rect_to_view_rect(&pixels, &view, width, height);
            assert!((back.x - rect.x).abs() <= 1.0, "{rect:?} -> {back:?}");
            assert!((back.y - rect.y).abs() <= 1.0, "{rect:?} -> {back:?}");
            assert!((back.width - rect.width).abs() <= 1.0, "{rect:?} -> {back:?}");
            assert!((back.height - rect.height).abs() <= 1.0, "{rect:?} -> {back:?}");
        }
    }

    #[test]
    fn view_point_to_pixel_flips_and_clamps() {
        let view = Rect::new(0.0, 0.0, 200.0, 100.0);
        assert_eq!(
            view_point_to_pixel(Point::new(10.0, 90.0), &view, 200, 100),
            Some((10, 10))
        );
        assert_eq!(
            view_point_to_pixel(Point::new(200.0, 0.0), &view, 200, 100),
            Some((199, 99))
        );
        assert_eq!(view_point_to_pixel(Point::new(1.0, 1.0), &view, 0, 0), None);
    }

    #[test]
    fn distance_to_segment_projects_and_clamps() {
        let start = Point::new(0.0, 0.0);
        let end = Point::new(10.0, 0.0);
        assert_eq!(distance_to_segment(Point::new(5.0, 3.0), start, end), 3.0);
        assert_eq!(distance_to_segment(Point::new(13.0, 4.0), start, end), 5.0);
        assert_eq!(distance_to_segment(Point::new(3.0, 4.0), start, start), 5.0);
    }

    #[test]
    fn rect_edge_hit_distinguishes_outline_from_interior() {
        let rect = Rect::new(10.0, 10.0, 100.0, 50.0);
        assert!(rect_edge_hit(Point::new(12.0, 30.0), &rect, 4.0, false));
        assert!(rect_edge_hit(Point::new(60.0, 63.0), &rect, 4.0, false));
        assert!(!rect_edge_hit(Point::new(60.0, 35.0), &rect, 4.0, false));
        assert!(rect_edge_hit(Point::new(60.0, 35.0), &rect, 4.0, true));
        assert!(!rect_edge_hit(Point::new(200.0, 35.0), &rect, 4.0, true));
    }

    #[test]
    fn ellipse_hit_uses_normalized_distance() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert!(ellipse_hit(Point::new(100.0, 25.0), &rect, 3.0, false));
        assert!(ellipse_hit(Point::new(50.0, 51.0), &rect, 3.0, false));
        assert!(!ellipse_hit(Point::new(50.0, 25.0), &rect, 3.0, false));
        assert!(ellipse_hit(Point::new(50.0, 25.0), &rect, 3.0, true));
        assert!(!ellipse_hit(Point::new(2.0, 2.0), &rect, 3.0, true));
    }

    #[test]
    fn rect_intersection_and_clamping() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 80.0, 100.0, 100.0);
        assert_eq!(a.intersection(&b), Some(Rect::new(50.0, 80.0, 50.0, 20.0)));
        assert_eq!(a.intersection(&Rect::new(200.0, 0.0, 5.0, 5.0)), None);

        let moved = Rect::new(90.0, -20.0, 30.0, 30.0).clamped_within(&a);
        assert_eq!(moved, Rect::new(70.0, 0.0, 30.0, 30.0));
    }

    #[test]
    fn with_min_size_grows_only_short_sides() {
        let grown = Rect::new(5.0, 5.0, 10.0, 80.0).with_min_size(Size::new(40.0, 24.0));
        assert_eq!(grown, Rect::new(5.0, 5.0, 40.0, 80.0));
    }
}
