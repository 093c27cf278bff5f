use crate::geometry::{Offset, Rect};

use super::{DrawingElement, ElementShape, ElementStyle};

/// Editable text with a cursor counted in chars.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextBuffer {
    content: String,
    cursor_chars: usize,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        let content = text.into();
        let cursor_chars = content.chars().count();
        Self {
            content,
            cursor_chars,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn cursor_chars(&self) -> usize {
        self.cursor_chars.min(self.content.chars().count())
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_index = self.byte_index_for_cursor(self.cursor_chars);
        self.content.insert(byte_index, c);
        self.cursor_chars = self.cursor_chars.saturating_add(1);
    }

    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars() {
            self.insert_char(c);
        }
    }

    pub fn insert_newline(&mut self) {
        self.insert_char('\n');
    }

    pub fn delete_backward(&mut self) -> bool {
        if self.cursor_chars() == 0 {
            return false;
        }
        let end = self.byte_index_for_cursor(self.cursor_chars());
        let start = self.byte_index_for_cursor(self.cursor_chars().saturating_sub(1));
        if start >= end || end > self.content.len() {
            return false;
        }
        self.content.drain(start..end);
        self.cursor_chars = self.cursor_chars().saturating_sub(1);
        true
    }

    pub fn move_cursor_left(&mut self) -> bool {
        if self.cursor_chars() == 0 {
            return false;
        }
        self.cursor_chars = self.cursor_chars().saturating_sub(1);
        true
    }

    pub fn move_cursor_right(&mut self) -> bool {
        if self.cursor_chars() >= self.content.chars().count() {
            return false;
        }
        self.cursor_chars = self.cursor_chars().saturating_add(1);
        true
    }

    pub fn move_cursor_up(&mut self) -> bool {
        self.move_cursor_vertically(-1)
    }

    pub fn move_cursor_down(&mut self) -> bool {
        self.move_cursor_vertically(1)
    }

    pub fn lines(&self) -> Vec<&str> {
        self.content.split('\n').collect()
    }

    fn byte_index_for_cursor(&self, cursor_chars: usize) -> usize {
        self.content
            .char_indices()
            .nth(cursor_chars)
            .map(|(index, _)| index)
            .unwrap_or(self.content.len())
    }

    fn cursor_line_column(&self) -> (usize, usize) {
        let mut line = 0_usize;
        let mut column = 0_usize;
        for ch in self.content.chars().take(self.cursor_chars()) {
            if ch == '\n' {
                line += 1;
                column = 0;
            } else {
                column += 1;
            }
        }
        (line, column)
    }

    fn move_cursor_vertically(&mut self, delta_lines: isize) -> bool {
        let lines = self.lines();
        if lines.len() <= 1 {
            return false;
        }
        let (line, column) = self.cursor_line_column();
        let target_line = line
            .saturating_add_signed(delta_lines)
            .min(lines.len() - 1);
        if target_line == line {
            return false;
        }
        let target_column = column.min(lines[target_line].chars().count());
        let line_start: usize = lines[..target_line]
            .iter()
            .map(|line| line.chars().count() + 1)
            .sum();
        self.cursor_chars = line_start + target_column;
        true
    }
}

/// Element being replaced by an active text edit, kept so cancel can restore it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplacedText {
    pub index: usize,
    pub original: DrawingElement,
}

/// Result of ending a text edit.
#[derive(Debug, Clone, PartialEq)]
pub enum TextEditOutcome {
    /// Insert at the given index (or append when `None`).
    Commit {
        element: DrawingElement,
        index: Option<usize>,
    },
    /// Put the original element back where it was.
    Restore(ReplacedText),
    Discard,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveTextEdit {
    rect: Rect,
    buffer: TextBuffer,
    style: ElementStyle,
    replacing: Option<ReplacedText>,
}

impl ActiveTextEdit {
    pub fn new(rect: Rect, style: ElementStyle) -> Self {
        Self {
            rect,
            buffer: TextBuffer::new(),
            style,
            replacing: None,
        }
    }

    /// Seeds an edit from an existing text element that was removed from `index`.
    pub fn editing(index: usize, original: DrawingElement) -> Option<Self> {
        let ElementShape::Text { content, rect } = &original.shape else {
            return None;
        };
        Some(Self {
            rect: *rect,
            buffer: TextBuffer::with_text(content.clone()),
            style: original.style.clone(),
            replacing: Some(ReplacedText {
                index,
                original: original.clone(),
            }),
        })
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    pub fn translate(&mut self, delta: Offset) {
        self.rect = self.rect.translated(delta);
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut TextBuffer {
        &mut self.buffer
    }

    pub fn style(&self) -> &ElementStyle {
        &self.style
    }

    pub fn replacing(&self) -> Option<&ReplacedText> {
        self.replacing.as_ref()
    }

    /// Blank text commits to nothing; an edited element stays deleted in that case.
    pub fn commit(self) -> TextEditOutcome {
        if self.buffer.content().trim().is_empty() {
            return TextEditOutcome::Discard;
        }
        let element = DrawingElement::new(
            ElementShape::Text {
                content: self.buffer.content().to_string(),
                rect: self.rect,
            },
            self.style,
        );
        TextEditOutcome::Commit {
            element,
            index: self.replacing.map(|replaced| replaced.index),
        }
    }

    pub fn cancel(self) -> TextEditOutcome {
        match self.replacing {
            Some(replaced) => TextEditOutcome::Restore(replaced),
            None => TextEditOutcome::Discard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_edits_at_cursor_with_multibyte_text() {
        let mut buffer = TextBuffer::with_text("가나");
        assert_eq!(buffer.cursor_chars(), 2);
        assert!(buffer.move_cursor_left());
        buffer.insert_char('x');
        assert_eq!(buffer.content(), "가x나");
        assert!(buffer.delete_backward());
        assert!(buffer.delete_backward());
        assert!(!buffer.delete_backward());
        assert_eq!(buffer.content(), "나");
    }

    #[test]
    fn buffer_moves_between_lines_keeping_column() {
        let mut buffer = TextBuffer::with_text("abcd\nxy");
        assert!(buffer.move_cursor_up());
        assert_eq!(buffer.cursor_chars(), 2);
        assert!(buffer.move_cursor_right());
        assert!(buffer.move_cursor_down());
        assert_eq!(buffer.cursor_chars(), 7);
        assert!(!buffer.move_cursor_down());
    }

    #[test]
    fn commit_of_blank_text_discards() {
        let edit = ActiveTextEdit::new(Rect::new(0.0, 0.0, 50.0, 30.0), ElementStyle::default());
        assert_eq!(edit.commit(), TextEditOutcome::Discard);
    }

    #[test]
    fn editing_existing_text_commits_back_to_its_index_and_cancel_restores() {
        let original = DrawingElement::new(
            ElementShape::Text {
                content: "old".to_string(),
                rect: Rect::new(5.0, 5.0, 80.0, 30.0),
            },
            ElementStyle::default(),
        );
        let mut edit =
            ActiveTextEdit::editing(2, original.clone()).expect("text element should seed edit");
        assert_eq!(edit.buffer().content(), "old");
        edit.buffer_mut().insert_str("er");

        match edit.clone().commit() {
            TextEditOutcome::Commit { element, index } => {
                assert_eq!(index, Some(2));
                assert!(matches!(
                    element.shape,
                    ElementShape::Text { ref content, .. } if content == "older"
                ));
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        assert_eq!(
            edit.cancel(),
            TextEditOutcome::Restore(ReplacedText { index: 2, original })
        );
    }
}
