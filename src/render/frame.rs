use std::sync::Arc;

use image::RgbaImage;

use crate::editor::{ActiveTextEdit, DrawingElement, ElementShape, FontSpec, ToolKind};
use crate::geometry::{normalize, Color, PixelRect, Point, Rect};
use crate::state::handles::handle_points;
use crate::state::{CreateDrag, InteractionMode, OverlaySession};
use crate::toolbar::{ButtonFace, PromptBar, ToolbarButton, ToolbarLayout};

pub(super) const DIM_COLOR: Color = Color::BLACK.with_alpha(115);
pub(super) const ACCENT: Color = Color::new(10, 132, 255);
const OUTLINE_COLOR: Color = Color::WHITE;
const GUIDE_COLOR: Color = Color::WHITE.with_alpha(90);
const ERASER_HOVER: Color = Color::new(255, 69, 58);
const CHROME_FILL: Color = Color::new(30, 30, 32).with_alpha(235);
const FIELD_FILL: Color = Color::new(58, 58, 60);
const LABEL_COLOR: Color = Color::WHITE;
const DISABLED_LABEL: Color = Color::new(142, 142, 147);

const SELECTED_OUTSET: f64 = 4.0;
const HOVER_OUTSET: f64 = 3.0;
const LABEL_GAP: f64 = 6.0;
const LABEL_SIZE: f64 = 12.0;
const BUTTON_LABEL_SIZE: f64 = 13.0;
const PROMPT_PLACEHOLDER: &str = "Describe the edit";

/// On/off lengths in view units; `phase` shifts the pattern along the path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dash {
    pub on: f32,
    pub off: f32,
    pub phase: f32,
}

impl Dash {
    pub const fn still() -> Self {
        Self {
            on: 6.0,
            off: 4.0,
            phase: 0.0,
        }
    }

    pub const fn marching(phase: f32) -> Self {
        Self {
            on: 6.0,
            off: 4.0,
            phase,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelAlign {
    /// `anchor` is the bubble's bottom-left corner.
    BottomLeft,
    /// `anchor` is the bubble's center.
    Center,
    /// `anchor` is the left edge midpoint.
    MiddleLeft,
}

/// One drawing step. Every coordinate is in view space.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Bitmap {
        image: Arc<RgbaImage>,
        src: PixelRect,
        dest: Rect,
    },
    FillRect {
        rect: Rect,
        color: Color,
    },
    StrokeRect {
        rect: Rect,
        color: Color,
        width: f64,
        dash: Option<Dash>,
    },
    Line {
        start: Point,
        end: Point,
        color: Color,
        width: f64,
        dash: Option<Dash>,
    },
    Element(DrawingElement),
    Handle {
        center: Point,
    },
    Label {
        text: String,
        anchor: Point,
        align: LabelAlign,
        size: f64,
        color: Color,
        background: Option<Color>,
    },
    Caret {
        text_box: Rect,
        font: FontSpec,
        line: usize,
        before: String,
        color: Color,
    },
}

/// Display list for one overlay frame, plus the pixel canvas it is rasterized onto.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub view_bounds: Rect,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub commands: Vec<DrawCommand>,
}

/// Builds the display list for the current session state.
///
/// `dash_phase` animates the AI rectangle while a request is in flight.
pub fn compose_frame(session: &OverlaySession, dash_phase: f32) -> Frame {
    let view = session.view_bounds();
    let source = session.source();
    let mut commands = vec![
        DrawCommand::Bitmap {
            image: Arc::clone(source),
            src: PixelRect::new(0, 0, source.width(), source.height()),
            dest: view,
        },
        DrawCommand::FillRect {
            rect: view,
            color: DIM_COLOR,
        },
    ];

    match session.selection() {
        None => {
            if let InteractionMode::Creating {
                drag: Some(CreateDrag::Selection { anchor, current }),
            } = session.mode()
            {
                let live = normalize(*anchor, *current);
                if !live.is_empty() {
                    commands.push(DrawCommand::Bitmap {
                        image: Arc::clone(source),
                        src: session.view_rect_to_pixels(&live),
                        dest: live,
                    });
                    push_outline(&mut commands, &live);
                    push_center_guides(&mut commands, &live);
                    push_handles(&mut commands, &live);
                    push_size_label(&mut commands, session, &live);
                }
            }
        }
        Some(selection) => {
            compose_selection(&mut commands, session, &selection, dash_phase);
            if let Some(layout) = session.toolbar_layout() {
                push_toolbar(&mut commands, &layout);
            }
        }
    }

    Frame {
        view_bounds: view,
        pixel_width: source.width(),
        pixel_height: source.height(),
        commands,
    }
}

fn compose_selection(
    commands: &mut Vec<DrawCommand>,
    session: &OverlaySession,
    selection: &Rect,
    dash_phase: f32,
) {
    commands.push(selection_content(session, selection));
    push_outline(commands, selection);
    push_center_guides(commands, selection);

    let elements = session.scene().elements();
    commands.extend(elements.iter().cloned().map(DrawCommand::Element));

    if let Some(element) = session.selected_element().and_then(|index| elements.get(index)) {
        commands.push(DrawCommand::StrokeRect {
            rect: element.bounding_rect().inset(-SELECTED_OUTSET),
            color: ACCENT,
            width: 1.5,
            dash: Some(Dash::still()),
        });
    }
    if session.tools().tool() == ToolKind::Eraser {
        if let Some(element) = session.hover_element().and_then(|index| elements.get(index)) {
            commands.push(DrawCommand::StrokeRect {
                rect: element.bounding_rect().inset(-HOVER_OUTSET),
                color: ERASER_HOVER,
                width: 2.0,
                dash: None,
            });
        }
    }

    if let InteractionMode::Creating { drag: Some(drag) } = session.mode() {
        match drag {
            CreateDrag::Shape(draft) => {
                if let Some(element) = draft.to_element(session.tools().style()) {
                    commands.push(DrawCommand::Element(element));
                }
            }
            CreateDrag::TextArea { anchor, current } => {
                commands.push(DrawCommand::StrokeRect {
                    rect: normalize(*anchor, *current),
                    color: OUTLINE_COLOR,
                    width: 1.0,
                    dash: Some(Dash::still()),
                });
            }
            CreateDrag::AiRect { anchor, current } => {
                commands.push(DrawCommand::StrokeRect {
                    rect: normalize(*anchor, *current),
                    color: ACCENT,
                    width: 2.0,
                    dash: Some(Dash::still()),
                });
            }
            CreateDrag::Selection { .. } => {}
        }
    }

    let ai = session.ai();
    let ai_rect = ai.rect().or_else(|| ai.is_sending().then_some(*selection));
    if let Some(rect) = ai_rect {
        let dash = if ai.is_sending() {
            Dash::marching(dash_phase)
        } else {
            Dash::still()
        };
        commands.push(DrawCommand::StrokeRect {
            rect,
            color: ACCENT,
            width: 2.0,
            dash: Some(dash),
        });
    }

    push_handles(commands, selection);
    push_size_label(commands, session, selection);

    if let Some(edit) = session.active_text() {
        push_text_edit(commands, edit);
    }
}

fn selection_content(session: &OverlaySession, selection: &Rect) -> DrawCommand {
    let pixels = session.view_rect_to_pixels(selection);
    match session
        .ai()
        .result()
        .filter(|result| result.dimensions() == (pixels.width, pixels.height))
    {
        Some(result) => DrawCommand::Bitmap {
            image: Arc::clone(result),
            src: PixelRect::new(0, 0, result.width(), result.height()),
            dest: *selection,
        },
        None => DrawCommand::Bitmap {
            image: Arc::clone(session.source()),
            src: pixels,
            dest: *selection,
        },
    }
}

fn push_outline(commands: &mut Vec<DrawCommand>, rect: &Rect) {
    commands.push(DrawCommand::StrokeRect {
        rect: *rect,
        color: OUTLINE_COLOR,
        width: 1.0,
        dash: None,
    });
}

fn push_center_guides(commands: &mut Vec<DrawCommand>, rect: &Rect) {
    let guide = |start, end| DrawCommand::Line {
        start,
        end,
        color: GUIDE_COLOR,
        width: 1.0,
        dash: Some(Dash::still()),
    };
    commands.push(guide(
        Point::new(rect.mid_x(), rect.min_y()),
        Point::new(rect.mid_x(), rect.max_y()),
    ));
    commands.push(guide(
        Point::new(rect.min_x(), rect.mid_y()),
        Point::new(rect.max_x(), rect.mid_y()),
    ));
}

fn push_handles(commands: &mut Vec<DrawCommand>, rect: &Rect) {
    commands.extend(
        handle_points(rect)
            .into_iter()
            .map(|(_, center)| DrawCommand::Handle { center }),
    );
}

/// "W × H" in source pixels, above the top-left corner or just inside it near the view top.
fn push_size_label(commands: &mut Vec<DrawCommand>, session: &OverlaySession, rect: &Rect) {
    let pixels = session.view_rect_to_pixels(rect);
    let view = session.view_bounds();
    let above = rect.max_y() + LABEL_GAP;
    let bubble_height = LABEL_SIZE * 1.6;
    let y = if above + bubble_height <= view.max_y() {
        above
    } else {
        rect.max_y() - LABEL_GAP - bubble_height
    };
    commands.push(DrawCommand::Label {
        text: format!("{} × {}", pixels.width, pixels.height),
        anchor: Point::new(rect.min_x(), y),
        align: LabelAlign::BottomLeft,
        size: LABEL_SIZE,
        color: LABEL_COLOR,
        background: Some(CHROME_FILL),
    });
}

fn push_text_edit(commands: &mut Vec<DrawCommand>, edit: &ActiveTextEdit) {
    let rect = edit.rect();
    commands.push(DrawCommand::StrokeRect {
        rect,
        color: ACCENT,
        width: 1.0,
        dash: Some(Dash::still()),
    });
    let buffer = edit.buffer();
    if !buffer.content().is_empty() {
        commands.push(DrawCommand::Element(DrawingElement::new(
            ElementShape::Text {
                content: buffer.content().to_string(),
                rect,
            },
            edit.style().clone(),
        )));
    }
    let (line, before) = caret_position(buffer.content(), buffer.cursor_chars());
    commands.push(DrawCommand::Caret {
        text_box: rect,
        font: edit.style().font.clone(),
        line,
        before,
        color: edit.style().stroke,
    });
    push_handles(commands, &rect);
}

/// Line index of the cursor and the text between that line's start and the cursor.
fn caret_position(content: &str, cursor_chars: usize) -> (usize, String) {
    let head: String = content.chars().take(cursor_chars).collect();
    let line = head.matches('\n').count();
    let before = head.rsplit('\n').next().unwrap_or_default().to_string();
    (line, before)
}

fn push_toolbar(commands: &mut Vec<DrawCommand>, layout: &ToolbarLayout) {
    commands.push(DrawCommand::FillRect {
        rect: layout.bar,
        color: CHROME_FILL,
    });
    for button in &layout.buttons {
        push_button(commands, button);
    }
    if let Some(picker) = &layout.picker {
        commands.push(DrawCommand::FillRect {
            rect: picker.rect,
            color: CHROME_FILL,
        });
        for item in &picker.items {
            push_button(commands, item);
        }
    }
    if let Some(prompt) = &layout.prompt_bar {
        push_prompt_bar(commands, prompt);
    }
}

fn push_button(commands: &mut Vec<DrawCommand>, button: &ToolbarButton) {
    if button.active {
        commands.push(DrawCommand::FillRect {
            rect: button.rect,
            color: ACCENT,
        });
    }
    match &button.face {
        ButtonFace::Label(text) => commands.push(DrawCommand::Label {
            text: text.clone(),
            anchor: button.rect.center(),
            align: LabelAlign::Center,
            size: BUTTON_LABEL_SIZE,
            color: if button.enabled {
                LABEL_COLOR
            } else {
                DISABLED_LABEL
            },
            background: None,
        }),
        ButtonFace::Swatch(Some(color)) => commands.push(DrawCommand::FillRect {
            rect: button.rect.inset(4.0),
            color: *color,
        }),
        ButtonFace::Swatch(None) => {
            let swatch = button.rect.inset(4.0);
            commands.push(DrawCommand::StrokeRect {
                rect: swatch,
                color: LABEL_COLOR,
                width: 1.0,
                dash: None,
            });
            commands.push(DrawCommand::Line {
                start: Point::new(swatch.min_x(), swatch.min_y()),
                end: Point::new(swatch.max_x(), swatch.max_y()),
                color: ERASER_HOVER,
                width: 1.5,
                dash: None,
            });
        }
    }
}

fn push_prompt_bar(commands: &mut Vec<DrawCommand>, prompt: &PromptBar) {
    commands.push(DrawCommand::FillRect {
        rect: prompt.rect,
        color: CHROME_FILL,
    });
    commands.push(DrawCommand::FillRect {
        rect: prompt.field,
        color: FIELD_FILL,
    });
    let (text, color) = if prompt.text.is_empty() {
        (PROMPT_PLACEHOLDER.to_string(), DISABLED_LABEL)
    } else {
        (prompt.text.clone(), LABEL_COLOR)
    };
    commands.push(DrawCommand::Label {
        text,
        anchor: Point::new(prompt.field.min_x() + 6.0, prompt.field.mid_y()),
        align: LabelAlign::MiddleLeft,
        size: BUTTON_LABEL_SIZE,
        color,
        background: None,
    });
    push_button(commands, &prompt.send);
    push_button(commands, &prompt.cancel);
}
