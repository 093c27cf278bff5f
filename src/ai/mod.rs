//! AI edit sub-flow: edit rectangle and prompt state, request payload, and result decoding.

mod client;
mod request;

use std::fmt;
use std::sync::Arc;

use image::imageops::FilterType;
use image::RgbaImage;
use thiserror::Error;

use crate::geometry::{Offset, Rect};

pub use client::{decode_edit_response, ImageEditClient, OpenAiImageEditClient};
pub use request::{build_mask, build_mask_png, build_prompt};

/// Sub-rectangles smaller than this on either side mean "edit the whole selection".
pub const MIN_AI_RECT_EXTENT: f64 = 10.0;

#[derive(Debug, Error)]
pub enum AiEditError {
    #[error("image edit request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("image edit API returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("malformed image edit response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
    #[error("image edit response contained no image")]
    MissingImage,
    #[error("invalid base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to decode edited image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode request image: {0}")]
    Encode(#[source] image::ImageError),
}

pub type AiEditResult<T> = std::result::Result<T, AiEditError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AiPhase {
    #[default]
    Idle,
    SelectingRect,
    Sending,
}

/// Per-selection AI edit state owned by an overlay session.
#[derive(Debug, Clone, Default)]
pub struct AiEditState {
    phase: AiPhase,
    rect: Option<Rect>,
    prompt: String,
    result: Option<Arc<RgbaImage>>,
}

impl AiEditState {
    pub fn phase(&self) -> AiPhase {
        self.phase
    }

    pub fn is_sending(&self) -> bool {
        self.phase == AiPhase::Sending
    }

    pub fn accepts_rect_drag(&self) -> bool {
        self.phase == AiPhase::SelectingRect
    }

    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    /// Stores the dragged sub-rectangle clipped to `selection`; small drags clear it.
    pub fn set_rect(&mut self, rect: Rect, selection: &Rect) {
        self.rect = if rect.width < MIN_AI_RECT_EXTENT || rect.height < MIN_AI_RECT_EXTENT {
            None
        } else {
            rect.intersection(selection)
        };
    }

    pub fn translate_rect(&mut self, delta: Offset) {
        if let Some(rect) = self.rect.as_mut() {
            *rect = rect.translated(delta);
        }
    }

    pub fn clip_rect_to(&mut self, selection: &Rect) {
        self.rect = self.rect.and_then(|rect| rect.intersection(selection));
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn push_prompt_char(&mut self, c: char) {
        self.prompt.push(c);
    }

    pub fn pop_prompt_char(&mut self) -> bool {
        self.prompt.pop().is_some()
    }

    pub fn result(&self) -> Option<&Arc<RgbaImage>> {
        self.result.as_ref()
    }

    pub fn enter_tool(&mut self) {
        if !self.is_sending() {
            self.phase = AiPhase::SelectingRect;
        }
    }

    /// Drops the pending rectangle; an in-flight request keeps running.
    pub fn leave_tool(&mut self) {
        self.rect = None;
        if !self.is_sending() {
            self.phase = AiPhase::Idle;
        }
    }

    pub fn begin_sending(&mut self) {
        self.phase = AiPhase::Sending;
    }

    pub fn finish_sending(&mut self, tool_active: bool) {
        self.phase = if tool_active {
            AiPhase::SelectingRect
        } else {
            AiPhase::Idle
        };
    }

    pub fn apply_result(&mut self, image: RgbaImage) {
        self.result = Some(Arc::new(image));
        self.rect = None;
    }

    /// Forgets everything tied to the previous selection.
    pub fn reset(&mut self, tool_active: bool) {
        *self = Self::default();
        if tool_active {
            self.phase = AiPhase::SelectingRect;
        }
    }
}

/// Identifies which selection a request was made for.
///
/// `session` is unique per opened overlay, so a reopened display never matches an older ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AiTicket {
    pub display_id: u32,
    pub session: u64,
    pub generation: u64,
}

/// Everything a worker needs to run one edit request.
#[derive(Clone)]
pub struct AiEditJob {
    pub ticket: AiTicket,
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub prompt: String,
    pub image_png: Vec<u8>,
    pub mask_png: Vec<u8>,
    pub target_width: u32,
    pub target_height: u32,
}

impl fmt::Debug for AiEditJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiEditJob")
            .field("ticket", &self.ticket)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("prompt", &self.prompt)
            .field("image_bytes", &self.image_png.len())
            .field("mask_bytes", &self.mask_png.len())
            .field("target", &(self.target_width, self.target_height))
            .finish_non_exhaustive()
    }
}

impl PartialEq for AiEditJob {
    fn eq(&self, other: &Self) -> bool {
        self.ticket == other.ticket
            && self.prompt == other.prompt
            && self.image_png == other.image_png
            && self.mask_png == other.mask_png
    }
}

#[derive(Debug)]
pub struct AiEditCompletion {
    pub ticket: AiTicket,
    pub result: AiEditResult<RgbaImage>,
}

/// Runs `job` to completion on the calling thread.
pub fn run_job<C: ImageEditClient + ?Sized>(client: &C, job: &AiEditJob) -> AiEditCompletion {
    let result = client
        .edit_image(job)
        .and_then(|bytes| decode_result_image(&bytes, job.target_width, job.target_height));
    AiEditCompletion {
        ticket: job.ticket,
        result,
    }
}

/// Decodes the returned image and scales it to the selection's pixel size when needed.
pub fn decode_result_image(bytes: &[u8], width: u32, height: u32) -> AiEditResult<RgbaImage> {
    let image = image::load_from_memory(bytes)
        .map_err(AiEditError::Decode)?
        .to_rgba8();
    if image.dimensions() == (width, height) || width == 0 || height == 0 {
        return Ok(image);
    }
    tracing::debug!(
        from = ?image.dimensions(),
        to = ?(width, height),
        "resizing AI result to selection size"
    );
    Ok(image::imageops::resize(&image, width, height, FilterType::Lanczos3))
}
