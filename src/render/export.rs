use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use crate::geometry::PixelRect;
use crate::state::OverlaySession;

use super::raster::{image_to_pixmap, pixmap_to_image, view_to_pixel_transform, Painter};
use super::text::FontBook;
use super::{ExportError, ExportResult};

/// Selection content without annotations: the AI result when it still fits, else a source crop.
pub fn selection_base_image(session: &OverlaySession) -> ExportResult<RgbaImage> {
    let pixels = session
        .selection_pixel_rect()
        .filter(|rect| !rect.is_empty())
        .ok_or(ExportError::EmptySelection)?;
    if let Some(result) = session
        .ai()
        .result()
        .filter(|result| result.dimensions() == (pixels.width, pixels.height))
    {
        return Ok(result.as_ref().clone());
    }
    Ok(image::imageops::crop_imm(
        session.source().as_ref(),
        pixels.x,
        pixels.y,
        pixels.width,
        pixels.height,
    )
    .to_image())
}

pub fn render_final_image(session: &OverlaySession) -> ExportResult<RgbaImage> {
    render_final_image_with(session, FontBook::shared())
}

/// Flattens the selection at source-pixel density, elements drawn in list order.
pub fn render_final_image_with(
    session: &OverlaySession,
    fonts: &FontBook,
) -> ExportResult<RgbaImage> {
    let base = selection_base_image(session)?;
    let pixels = session
        .selection_pixel_rect()
        .ok_or(ExportError::EmptySelection)?;
    let mut pixmap = image_to_pixmap(&base, PixelRect::new(0, 0, base.width(), base.height()))
        .ok_or(ExportError::Canvas {
            width: base.width(),
            height: base.height(),
        })?;
    let source = session.source();
    let transform = view_to_pixel_transform(
        &session.view_bounds(),
        source.width(),
        source.height(),
        (pixels.x, pixels.y),
    );
    let mut painter = Painter::new(&mut pixmap, transform, fonts);
    for element in session.scene().elements() {
        painter.element(element);
    }
    tracing::debug!(
        width = pixels.width,
        height = pixels.height,
        elements = session.scene().len(),
        "rendered final image"
    );
    pixmap_to_image(&pixmap)
}

pub fn encode_png(image: &RgbaImage) -> ExportResult<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .map_err(ExportError::Encode)?;
    Ok(bytes.into_inner())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use image::Rgba;

    use super::*;
    use crate::ai::AiEditCompletion;
    use crate::config::OverlaySettings;
    use crate::editor::ToolKind;
    use crate::geometry::{Point, Rect};
    use crate::state::{CaptureFrame, PointerEvent};

    const GREY: Rgba<u8> = Rgba([90, 90, 90, 255]);

    /// 400x300 view over an 800x600 bitmap, like a 2x display.
    fn retina_session() -> OverlaySession {
        let frame = CaptureFrame {
            display_id: 1,
            bitmap: Arc::new(RgbaImage::from_pixel(800, 600, GREY)),
            view_bounds: Rect::new(0.0, 0.0, 400.0, 300.0),
        };
        OverlaySession::new(frame, Arc::new(OverlaySettings::default())).expect("session")
    }

    fn drag(session: &mut OverlaySession, from: Point, to: Point) {
        session.pointer_down(PointerEvent::new(from));
        session.pointer_drag(PointerEvent::new(to));
        session.pointer_up(PointerEvent::new(to));
    }

    #[test]
    fn export_without_selection_is_rejected() {
        let session = retina_session();
        assert!(matches!(
            render_final_image_with(&session, &FontBook::offline()),
            Err(ExportError::EmptySelection)
        ));
    }

    #[test]
    fn export_matches_selection_pixel_size_and_draws_elements() {
        let mut session = retina_session();
        drag(&mut session, Point::new(10.0, 10.0), Point::new(70.0, 60.0));
        assert_eq!(session.selection(), Some(Rect::new(10.0, 10.0, 60.0, 50.0)));

        session.switch_tool(ToolKind::Rectangle);
        drag(&mut session, Point::new(20.0, 20.0), Point::new(40.0, 40.0));
        assert_eq!(session.scene().len(), 1);

        let image = render_final_image_with(&session, &FontBook::offline()).expect("export");
        assert_eq!(image.dimensions(), (120, 100));
        // Untouched corner keeps the source color.
        assert_eq!(image.get_pixel(1, 1), &GREY);
        // Left edge at view x=20 is pixel column (20-10)*2; view y=30 is row (60-30)*2.
        let edge = image.get_pixel(20, 60);
        assert_ne!(edge, &GREY);
        assert!(edge.0[0] > 200);
        // Inside the unfilled rectangle stays grey.
        assert_eq!(image.get_pixel(40, 60), &GREY);
    }

    #[test]
    fn export_prefers_ai_result_of_matching_size() {
        let mut session = retina_session();
        drag(&mut session, Point::new(10.0, 10.0), Point::new(70.0, 60.0));
        let blue = Rgba([0, 0, 255, 255]);
        session.apply_ai_result(AiEditCompletion {
            ticket: session.ticket(),
            result: Ok(RgbaImage::from_pixel(120, 100, blue)),
        });

        let base = selection_base_image(&session).expect("base");
        assert_eq!(base.get_pixel(5, 5), &blue);
        let image = render_final_image_with(&session, &FontBook::offline()).expect("export");
        assert_eq!(image.get_pixel(60, 50), &blue);
    }

    #[test]
    fn encode_png_produces_png_signature() {
        let png = encode_png(&RgbaImage::from_pixel(2, 2, GREY)).expect("encode");
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
