//! Render pipeline: frames are composed into a display list, then rasterized with tiny-skia
//! in source-pixel space. Export flattens the selection and its annotations into one image.

mod export;
mod frame;
mod raster;
mod text;

use thiserror::Error;

pub use export::{encode_png, render_final_image, render_final_image_with, selection_base_image};
pub use frame::{compose_frame, Dash, DrawCommand, Frame, LabelAlign};
pub use raster::{rasterize, view_to_pixel_transform};
pub use text::FontBook;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing is selected")]
    EmptySelection,
    #[error("failed to allocate a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },
    #[error("failed to encode PNG: {0}")]
    Encode(#[source] image::ImageError),
}

pub type ExportResult<T> = std::result::Result<T, ExportError>;
