use image::{Rgba, RgbaImage};

use crate::geometry::PixelRect;

use super::{AiEditError, AiEditResult};

const STYLE_CONSTRAINTS: &str = "Constraints: edit only the masked area. Keep the original \
resolution and framing. Preserve the surrounding content, lighting, colors and typography so \
the edit blends in seamlessly. Do not add borders, captions or watermarks.";

/// User instruction followed by the fixed style-preservation constraints.
pub fn build_prompt(instruction: &str) -> String {
    format!("{}\n\n{STYLE_CONSTRAINTS}", instruction.trim())
}

/// Mask for an image of `width`x`height`: transparent where edits are allowed, opaque elsewhere.
/// `editable` is relative to the image; `None` allows edits everywhere.
pub fn build_mask(width: u32, height: u32, editable: Option<PixelRect>) -> RgbaImage {
    let Some(area) = editable.filter(|area| !area.is_empty()) else {
        return RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    };
    let right = area.x.saturating_add(area.width);
    let bottom = area.y.saturating_add(area.height);
    RgbaImage::from_fn(width, height, |x, y| {
        let inside = x >= area.x && x < right && y >= area.y && y < bottom;
        if inside {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([0, 0, 0, 255])
        }
    })
}

pub fn build_mask_png(
    width: u32,
    height: u32,
    editable: Option<PixelRect>,
) -> AiEditResult<Vec<u8>> {
    let mask = build_mask(width, height, editable);
    let mut bytes = Vec::new();
    mask.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(AiEditError::Encode)?;
    Ok(bytes)
}
