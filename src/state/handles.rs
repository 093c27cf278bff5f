use crate::geometry::{Point, Rect, Size};

/// Hit radius around a handle center, in view units.
pub const HANDLE_HIT_RADIUS: f64 = 8.0;
/// Drawn handle edge length, in view units.
pub const HANDLE_SIZE: f64 = 8.0;

/// One of the 8 resize handles. "Top" is the max-y edge because view space grows upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl Handle {
    pub const ALL: [Handle; 8] = [
        Self::TopLeft,
        Self::Top,
        Self::TopRight,
        Self::Right,
        Self::BottomRight,
        Self::Bottom,
        Self::BottomLeft,
        Self::Left,
    ];

    pub fn position(self, rect: &Rect) -> Point {
        let x = match self {
            Self::TopLeft | Self::BottomLeft | Self::Left => rect.min_x(),
            Self::Top | Self::Bottom => rect.mid_x(),
            Self::TopRight | Self::BottomRight | Self::Right => rect.max_x(),
        };
        let y = match self {
            Self::TopLeft | Self::Top | Self::TopRight => rect.max_y(),
            Self::Left | Self::Right => rect.mid_y(),
            Self::BottomLeft | Self::Bottom | Self::BottomRight => rect.min_y(),
        };
        Point::new(x, y)
    }

    const fn moves_left(self) -> bool {
        matches!(self, Self::TopLeft | Self::BottomLeft | Self::Left)
    }

    const fn moves_right(self) -> bool {
        matches!(self, Self::TopRight | Self::BottomRight | Self::Right)
    }

    const fn moves_top(self) -> bool {
        matches!(self, Self::TopLeft | Self::Top | Self::TopRight)
    }

    const fn moves_bottom(self) -> bool {
        matches!(self, Self::BottomLeft | Self::Bottom | Self::BottomRight)
    }

    pub const fn is_corner(self) -> bool {
        matches!(
            self,
            Self::TopLeft | Self::TopRight | Self::BottomRight | Self::BottomLeft
        )
    }
}

pub fn handle_points(rect: &Rect) -> [(Handle, Point); 8] {
    Handle::ALL.map(|handle| (handle, handle.position(rect)))
}

/// Corners win over edge midpoints when both are in reach.
pub fn handle_at(rect: &Rect, point: Point, radius: f64) -> Option<Handle> {
    let in_reach = |handle: &Handle| {
        let center = handle.position(rect);
        (point.x - center.x).abs() <= radius && (point.y - center.y).abs() <= radius
    };
    Handle::ALL
        .iter()
        .filter(|handle| handle.is_corner())
        .chain(Handle::ALL.iter().filter(|handle| !handle.is_corner()))
        .copied()
        .find(|handle| in_reach(handle))
}

/// Recomputes `origin` with the edges owned by `handle` following `point`.
///
/// Returns `None` when the result (after clipping to `bounds`) would be smaller than `min_size`,
/// so callers keep the previous rectangle.
pub fn resize_from_handle(
    origin: &Rect,
    handle: Handle,
    point: Point,
    min_size: Size,
    bounds: &Rect,
) -> Option<Rect> {
    let left = if handle.moves_left() {
        point.x
    } else {
        origin.min_x()
    };
    let right = if handle.moves_right() {
        point.x
    } else {
        origin.max_x()
    };
    let bottom = if handle.moves_bottom() {
        point.y
    } else {
        origin.min_y()
    };
    let top = if handle.moves_top() {
        point.y
    } else {
        origin.max_y()
    };

    let resized = Rect::new(left, bottom, right - left, top - bottom);
    if resized.width < min_size.width || resized.height < min_size.height {
        return None;
    }
    let clipped = resized.intersection(bounds)?;
    if clipped.width < min_size.width || clipped.height < min_size.height {
        return None;
    }
    Some(clipped)
}
