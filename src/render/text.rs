use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};

use ab_glyph::{point, Font, FontArc, FontVec, GlyphId, PxScale, ScaleFont};
use font_kit::family_name::FamilyName;
use font_kit::handle::Handle;
use font_kit::properties::Properties;
use font_kit::source::SystemSource;
use tiny_skia::{Pixmap, PremultipliedColorU8};

use crate::geometry::Color;

/// Rough advance used when no font could be loaded, as a fraction of the pixel size.
const FALLBACK_ADVANCE: f32 = 0.55;
const LINE_SPACING: f32 = 1.2;

/// System fonts resolved by family name, loaded once per name.
#[derive(Default)]
pub struct FontBook {
    cache: Mutex<HashMap<String, Option<FontArc>>>,
    offline: bool,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let loaded = self
            .cache
            .lock()
            .map(|cache| cache.len())
            .unwrap_or_default();
        f.debug_struct("FontBook").field("loaded", &loaded).finish()
    }
}

impl FontBook {
    pub fn shared() -> &'static FontBook {
        static BOOK: OnceLock<FontBook> = OnceLock::new();
        BOOK.get_or_init(FontBook::default)
    }

    /// An empty book that never loads anything; text falls back to metrics only.
    #[cfg(test)]
    pub(crate) fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub fn font(&self, name: &str) -> Option<FontArc> {
        if self.offline {
            return None;
        }
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .entry(name.to_string())
            .or_insert_with(|| load_system_font(name))
            .clone()
    }

    pub fn line_height(&self, name: &str, px_size: f32) -> f32 {
        match self.font(name) {
            Some(font) => {
                let scaled = font.as_scaled(PxScale::from(px_size));
                scaled.height() + scaled.line_gap()
            }
            None => px_size * LINE_SPACING,
        }
    }

    pub fn measure_line(&self, name: &str, px_size: f32, text: &str) -> f32 {
        let Some(font) = self.font(name) else {
            return text.chars().count() as f32 * px_size * FALLBACK_ADVANCE;
        };
        let scaled = font.as_scaled(PxScale::from(px_size));
        let mut width = 0.0;
        let mut previous: Option<GlyphId> = None;
        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            previous = Some(id);
        }
        width
    }

    /// Draws `text` with its first line's top-left corner at `(x, y)` in pixmap pixels.
    pub fn draw_text(
        &self,
        pixmap: &mut Pixmap,
        name: &str,
        px_size: f32,
        text: &str,
        (x, y): (f32, f32),
        color: Color,
    ) {
        let Some(font) = self.font(name) else {
            tracing::debug!(font = name, "skipping text without a loadable font");
            return;
        };
        let scaled = font.as_scaled(PxScale::from(px_size));
        let line_height = scaled.height() + scaled.line_gap();
        for (line_index, line) in text.split('\n').enumerate() {
            let baseline = y + scaled.ascent() + line_index as f32 * line_height;
            let mut caret = point(x, baseline);
            let mut previous: Option<GlyphId> = None;
            for ch in line.chars() {
                let mut glyph = scaled.scaled_glyph(ch);
                if let Some(prev) = previous {
                    caret.x += scaled.kern(prev, glyph.id);
                }
                glyph.position = caret;
                caret.x += scaled.h_advance(glyph.id);
                previous = Some(glyph.id);
                if let Some(outlined) = scaled.outline_glyph(glyph) {
                    let bounds = outlined.px_bounds();
                    outlined.draw(|gx, gy, coverage| {
                        let px = bounds.min.x as i32 + gx as i32;
                        let py = bounds.min.y as i32 + gy as i32;
                        blend_pixel(pixmap, px, py, color, coverage);
                    });
                }
            }
        }
    }
}

fn load_system_font(name: &str) -> Option<FontArc> {
    let families = [FamilyName::Title(name.to_string()), FamilyName::SansSerif];
    let handle = match SystemSource::new().select_best_match(&families, &Properties::new()) {
        Ok(handle) => handle,
        Err(err) => {
            tracing::warn!(font = name, ?err, "no system font matched");
            return None;
        }
    };
    let (bytes, index) = match handle {
        Handle::Path { path, font_index } => match std::fs::read(&path) {
            Ok(bytes) => (bytes, font_index),
            Err(err) => {
                tracing::warn!(font = name, ?path, ?err, "failed to read font file");
                return None;
            }
        },
        Handle::Memory { bytes, font_index } => (bytes.to_vec(), font_index),
    };
    match FontVec::try_from_vec_and_index(bytes, index) {
        Ok(font) => {
            tracing::debug!(font = name, "loaded system font");
            Some(FontArc::from(font))
        }
        Err(err) => {
            tracing::warn!(font = name, ?err, "failed to parse font");
            None
        }
    }
}

/// Source-over blend of `color` at `coverage` into a premultiplied pixel.
pub(super) fn blend_pixel(pixmap: &mut Pixmap, x: i32, y: i32, color: Color, coverage: f32) {
    if x < 0 || y < 0 || x >= pixmap.width() as i32 || y >= pixmap.height() as i32 {
        return;
    }
    let alpha = (f32::from(color.a) / 255.0) * coverage.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let index = y as usize * pixmap.width() as usize + x as usize;
    let Some(dst) = pixmap.pixels_mut().get_mut(index) else {
        return;
    };
    let keep = 1.0 - alpha;
    let out_a = (alpha * 255.0 + f32::from(dst.alpha()) * keep).round().min(255.0);
    let channel = |src: u8, dst: u8| {
        (f32::from(src) * alpha + f32::from(dst) * keep)
            .round()
            .min(out_a) as u8
    };
    let blended = PremultipliedColorU8::from_rgba(
        channel(color.r, dst.red()),
        channel(color.g, dst.green()),
        channel(color.b, dst.blue()),
        out_a as u8,
    );
    if let Some(blended) = blended {
        *dst = blended;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_book_measures_with_fallback_advance() {
        let book = FontBook::offline();
        assert!(book.font("Helvetica").is_none());
        assert_eq!(book.measure_line("Helvetica", 10.0, "abcd"), 22.0);
        assert_eq!(book.line_height("Helvetica", 10.0), 12.0);
    }

    #[test]
    fn blend_pixel_composites_over_opaque_background() {
        let mut pixmap = Pixmap::new(2, 2).expect("pixmap");
        pixmap.fill(tiny_skia::Color::WHITE);
        blend_pixel(&mut pixmap, 1, 1, Color::new(255, 0, 0), 1.0);
        blend_pixel(&mut pixmap, 0, 0, Color::BLACK, 0.5);
        blend_pixel(&mut pixmap, 5, 5, Color::BLACK, 1.0);

        let full = pixmap.pixel(1, 1).expect("pixel");
        assert_eq!((full.red(), full.green(), full.alpha()), (255, 0, 255));
        let half = pixmap.pixel(0, 0).expect("pixel");
        assert_eq!(half.alpha(), 255);
        assert!((126..=129).contains(&half.red()));
    }
}
