use image::RgbaImage;
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, LineCap, LineJoin, Paint, PathBuilder, Pixmap, PixmapPaint,
    Stroke, StrokeDash, Transform,
};

use crate::editor::{DrawingElement, ElementShape};
use crate::geometry::{Color, PixelRect, Point, Rect};
use crate::state::handles::HANDLE_SIZE;

use super::frame::{Dash, DrawCommand, Frame, LabelAlign, ACCENT};
use super::text::FontBook;
use super::{ExportError, ExportResult};

/// Gap between a text box edge and its first glyph, in view units.
pub(super) const TEXT_PADDING: f64 = 4.0;
const CHROME_FONT: &str = "Helvetica";
const LABEL_PADDING: f32 = 0.5;
const LABEL_HEIGHT: f32 = 1.6;

/// View space to pixel space for a `pixel_width` x `pixel_height` bitmap covering `view`,
/// shifted so that pixel `crop_origin` lands at the canvas origin.
pub fn view_to_pixel_transform(
    view: &Rect,
    pixel_width: u32,
    pixel_height: u32,
    crop_origin: (u32, u32),
) -> Transform {
    let sx = f64::from(pixel_width) / view.width.max(f64::EPSILON);
    let sy = f64::from(pixel_height) / view.height.max(f64::EPSILON);
    Transform::from_row(
        sx as f32,
        0.0,
        0.0,
        -sy as f32,
        (-view.min_x() * sx - f64::from(crop_origin.0)) as f32,
        (view.max_y() * sy - f64::from(crop_origin.1)) as f32,
    )
}

/// Rasterizes a composed frame onto a canvas the size of the source bitmap.
pub fn rasterize(frame: &Frame, fonts: &FontBook) -> ExportResult<RgbaImage> {
    let mut pixmap = Pixmap::new(frame.pixel_width, frame.pixel_height).ok_or(
        ExportError::Canvas {
            width: frame.pixel_width,
            height: frame.pixel_height,
        },
    )?;
    let transform = view_to_pixel_transform(
        &frame.view_bounds,
        frame.pixel_width,
        frame.pixel_height,
        (0, 0),
    );
    let mut painter = Painter::new(&mut pixmap, transform, fonts);
    for command in &frame.commands {
        painter.draw(command);
    }
    pixmap_to_image(&pixmap)
}

pub(super) struct Painter<'a> {
    pixmap: &'a mut Pixmap,
    transform: Transform,
    fonts: &'a FontBook,
}

impl<'a> Painter<'a> {
    pub(super) fn new(pixmap: &'a mut Pixmap, transform: Transform, fonts: &'a FontBook) -> Self {
        Self {
            pixmap,
            transform,
            fonts,
        }
    }

    fn draw(&mut self, command: &DrawCommand) {
        match command {
            DrawCommand::Bitmap { image, src, dest } => self.bitmap(image, *src, dest),
            DrawCommand::FillRect { rect, color } => self.fill_rect(rect, *color),
            DrawCommand::StrokeRect {
                rect,
                color,
                width,
                dash,
            } => self.stroke_rect(rect, *color, *width, *dash),
            DrawCommand::Line {
                start,
                end,
                color,
                width,
                dash,
            } => self.line(*start, *end, *color, *width, *dash),
            DrawCommand::Element(element) => self.element(element),
            DrawCommand::Handle { center } => {
                let half = HANDLE_SIZE / 2.0;
                let rect = Rect::new(center.x - half, center.y - half, HANDLE_SIZE, HANDLE_SIZE);
                self.fill_rect(&rect, Color::WHITE);
                self.stroke_rect(&rect, ACCENT, 1.0, None);
            }
            DrawCommand::Label {
                text,
                anchor,
                align,
                size,
                color,
                background,
            } => self.label(text, *anchor, *align, *size, *color, *background),
            DrawCommand::Caret {
                text_box,
                font,
                line,
                before,
                color,
            } => {
                let px_size = self.font_px(font.size);
                let (x, y) = self.text_origin(text_box);
                let line_height = self.fonts.line_height(&font.name, px_size);
                let caret_x = x + self.fonts.measure_line(&font.name, px_size, before);
                let caret_top = y + *line as f32 * line_height;
                self.pixel_line(
                    (caret_x, caret_top),
                    (caret_x, caret_top + line_height),
                    *color,
                    1.5,
                );
            }
        }
    }

    pub(super) fn element(&mut self, element: &DrawingElement) {
        let style = &element.style;
        let width = style.line_width;
        match &element.shape {
            ElementShape::Pen { points } => {
                let mut builder = PathBuilder::new();
                let mut iter = points.iter();
                if let Some(first) = iter.next() {
                    builder.move_to(first.x as f32, first.y as f32);
                    for point in iter {
                        builder.line_to(point.x as f32, point.y as f32);
                    }
                }
                if let Some(path) = builder.finish() {
                    self.stroke_path(&path, style.stroke, width, None);
                }
            }
            ElementShape::Line { start, end } => self.line(*start, *end, style.stroke, width, None),
            ElementShape::Arrow { start, end } => self.arrow(*start, *end, style.stroke, width),
            ElementShape::Rectangle { rect } => {
                if let Some(fill) = style.fill {
                    self.fill_rect(rect, fill);
                }
                self.stroke_rect(rect, style.stroke, width, None);
            }
            ElementShape::Ellipse { rect } => {
                let Some(path) = to_skia_rect(rect).and_then(PathBuilder::from_oval) else {
                    return;
                };
                if let Some(fill) = style.fill {
                    self.pixmap.fill_path(
                        &path,
                        &paint(fill),
                        FillRule::Winding,
                        self.transform,
                        None,
                    );
                }
                self.stroke_path(&path, style.stroke, width, None);
            }
            ElementShape::Text { content, rect } => {
                let px_size = self.font_px(style.font.size);
                let origin = self.text_origin(rect);
                self.fonts.draw_text(
                    self.pixmap,
                    &style.font.name,
                    px_size,
                    content,
                    origin,
                    style.stroke,
                );
            }
        }
    }

    /// Shaft up to the head base, then a filled triangle; the head grows with the stroke.
    fn arrow(&mut self, start: Point, end: Point, color: Color, width: f64) {
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let length = dx.hypot(dy);
        if length <= f64::EPSILON {
            return;
        }
        let (ux, uy) = (dx / length, dy / length);
        let (px, py) = (-uy, ux);
        let stroke_width = width.max(1.0);
        let head_length = (stroke_width * 3.5)
            .max(stroke_width * 2.0)
            .min(length * 0.7);
        let head_half_width = (stroke_width * 1.8).max(stroke_width * 0.8);

        let base = Point::new(end.x - ux * head_length, end.y - uy * head_length);
        self.line(start, base, color, width, None);

        let mut builder = PathBuilder::new();
        builder.move_to(end.x as f32, end.y as f32);
        builder.line_to(
            (base.x + px * head_half_width) as f32,
            (base.y + py * head_half_width) as f32,
        );
        builder.line_to(
            (base.x - px * head_half_width) as f32,
            (base.y - py * head_half_width) as f32,
        );
        builder.close();
        if let Some(path) = builder.finish() {
            self.pixmap
                .fill_path(&path, &paint(color), FillRule::Winding, self.transform, None);
        }
    }

    fn bitmap(&mut self, image: &RgbaImage, src: PixelRect, dest: &Rect) {
        if src.is_empty() || dest.is_empty() {
            return;
        }
        let Some(source) = image_to_pixmap(image, src) else {
            return;
        };
        let (x0, y0) = self.map_point(Point::new(dest.min_x(), dest.max_y()));
        let (x1, y1) = self.map_point(Point::new(dest.max_x(), dest.min_y()));
        let scale_x = (x1 - x0) / source.width() as f32;
        let scale_y = (y1 - y0) / source.height() as f32;
        let unit_scale =
            (scale_x - 1.0).abs() < f32::EPSILON && (scale_y - 1.0).abs() < f32::EPSILON;
        let quality = if unit_scale {
            FilterQuality::Nearest
        } else {
            FilterQuality::Bilinear
        };
        let paint = PixmapPaint {
            quality,
            ..PixmapPaint::default()
        };
        self.pixmap.draw_pixmap(
            0,
            0,
            source.as_ref(),
            &paint,
            Transform::from_row(scale_x, 0.0, 0.0, scale_y, x0, y0),
            None,
        );
    }

    fn fill_rect(&mut self, rect: &Rect, color: Color) {
        if let Some(rect) = to_skia_rect(rect) {
            self.pixmap
                .fill_rect(rect, &paint(color), self.transform, None);
        }
    }

    fn stroke_rect(&mut self, rect: &Rect, color: Color, width: f64, dash: Option<Dash>) {
        if let Some(rect) = to_skia_rect(rect) {
            let path = PathBuilder::from_rect(rect);
            self.stroke_path(&path, color, width, dash);
        }
    }

    fn line(&mut self, start: Point, end: Point, color: Color, width: f64, dash: Option<Dash>) {
        let mut builder = PathBuilder::new();
        builder.move_to(start.x as f32, start.y as f32);
        builder.line_to(end.x as f32, end.y as f32);
        if let Some(path) = builder.finish() {
            self.stroke_path(&path, color, width, dash);
        }
    }

    fn stroke_path(
        &mut self,
        path: &tiny_skia::Path,
        color: Color,
        width: f64,
        dash: Option<Dash>,
    ) {
        let stroke = Stroke {
            width: width as f32,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            dash: dash.and_then(|dash| StrokeDash::new(vec![dash.on, dash.off], dash.phase)),
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(path, &paint(color), &stroke, self.transform, None);
    }

    /// Stroke in canvas pixels, bypassing the view transform.
    fn pixel_line(&mut self, from: (f32, f32), to: (f32, f32), color: Color, width: f32) {
        let mut builder = PathBuilder::new();
        builder.move_to(from.0, from.1);
        builder.line_to(to.0, to.1);
        if let Some(path) = builder.finish() {
            let stroke = Stroke {
                width,
                ..Stroke::default()
            };
            self.pixmap
                .stroke_path(&path, &paint(color), &stroke, Transform::identity(), None);
        }
    }

    fn label(
        &mut self,
        text: &str,
        anchor: Point,
        align: LabelAlign,
        size: f64,
        color: Color,
        background: Option<Color>,
    ) {
        let px_size = self.font_px(size);
        let padding = px_size * LABEL_PADDING;
        let text_width = self.fonts.measure_line(CHROME_FONT, px_size, text);
        let width = text_width + padding * 2.0;
        let height = px_size * LABEL_HEIGHT;
        let (ax, ay) = self.map_point(anchor);
        let (left, top) = match align {
            LabelAlign::BottomLeft => (ax, ay - height),
            LabelAlign::Center => (ax - width / 2.0, ay - height / 2.0),
            LabelAlign::MiddleLeft => (ax, ay - height / 2.0),
        };
        if let Some(background) = background {
            if let Some(rect) = tiny_skia::Rect::from_xywh(left, top, width, height) {
                self.pixmap
                    .fill_rect(rect, &paint(background), Transform::identity(), None);
            }
        }
        let line_height = self.fonts.line_height(CHROME_FONT, px_size);
        self.fonts.draw_text(
            self.pixmap,
            CHROME_FONT,
            px_size,
            text,
            (left + padding, top + (height - line_height) / 2.0),
            color,
        );
    }

    fn map_point(&self, point: Point) -> (f32, f32) {
        let t = self.transform;
        let (x, y) = (point.x as f32, point.y as f32);
        (t.sx * x + t.kx * y + t.tx, t.ky * x + t.sy * y + t.ty)
    }

    fn font_px(&self, size: f64) -> f32 {
        size as f32 * self.transform.sy.abs()
    }

    /// Top-left of the first text line inside `rect`, in canvas pixels.
    fn text_origin(&self, rect: &Rect) -> (f32, f32) {
        self.map_point(Point::new(
            rect.min_x() + TEXT_PADDING,
            rect.max_y() - TEXT_PADDING,
        ))
    }
}

fn paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

fn to_skia_rect(rect: &Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_xywh(
        rect.x as f32,
        rect.y as f32,
        rect.width as f32,
        rect.height as f32,
    )
}

/// Premultiplied copy of `src` (clamped to the image).
pub(super) fn image_to_pixmap(image: &RgbaImage, src: PixelRect) -> Option<Pixmap> {
    let crop = image::imageops::crop_imm(image, src.x, src.y, src.width, src.height).to_image();
    let mut pixmap = Pixmap::new(crop.width(), crop.height())?;
    for (pixel, dst) in crop.pixels().zip(pixmap.pixels_mut()) {
        let [r, g, b, a] = pixel.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

pub(super) fn pixmap_to_image(pixmap: &Pixmap) -> ExportResult<RgbaImage> {
    let data = pixmap
        .pixels()
        .iter()
        .flat_map(|pixel| {
            let color = pixel.demultiply();
            [color.red(), color.green(), color.blue(), color.alpha()]
        })
        .collect();
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data).ok_or(ExportError::Canvas {
        width: pixmap.width(),
        height: pixmap.height(),
    })
}
