//! Message composer widget.
//!
//! The cursor is tracked as a character index so multi-byte input edits
//! cleanly; byte offsets are derived only when the string is mutated.

use crate::text::width::visual_width;
use crate::ui::theme::Styles;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Paragraph, Widget},
};

const PROMPT: &str = "> ";
const CURSOR: &str = "_";

/// Rendering view over a [`TextInputState`].
#[derive(Debug, Clone)]
pub struct TextInput<'a> {
    content: &'a str,
    cursor: usize,
    block: Option<Block<'a>>,
    focused: bool,
    placeholder: Option<&'a str>,
}

impl<'a> TextInput<'a> {
    /// Set the block for the text input.
    #[must_use]
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    /// Set focus state.
    #[must_use]
    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Set placeholder text.
    #[must_use]
    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = Some(placeholder);
        self
    }
}

impl Widget for TextInput<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        if inner.height < 1 || inner.width < 1 {
            return;
        }

        if self.content.is_empty() {
            let mut spans = vec![Span::styled(PROMPT, Styles::active())];
            if self.focused {
                spans.push(Span::styled(CURSOR, Styles::active()));
            }
            if let Some(placeholder) = self.placeholder {
                spans.push(Span::styled(placeholder, Styles::dim()));
            }
            Paragraph::new(Line::from(spans)).render(inner, buf);
            return;
        }

        let rows = layout_rows(self.content, self.cursor, self.focused, inner.width as usize);
        // Keep the cursor row visible when the draft is taller than the box.
        let cursor_row = rows.iter().position(|r| r.has_cursor).unwrap_or(rows.len() - 1);
        let height = inner.height as usize;
        let skip = (cursor_row + 1).saturating_sub(height);

        let lines: Vec<Line> = rows
            .into_iter()
            .skip(skip)
            .take(height)
            .map(|row| Line::from(Span::styled(row.text, Styles::default())))
            .collect();
        Paragraph::new(lines).style(Styles::default()).render(inner, buf);
    }
}

struct Row {
    text: String,
    has_cursor: bool,
}

/// Break `content` into display rows of at most `width` columns, with the
/// prompt on the first row and the cursor marker spliced in.
fn layout_rows(content: &str, cursor: usize, focused: bool, width: usize) -> Vec<Row> {
    let indent = " ".repeat(PROMPT.len());
    let width = width.max(PROMPT.len() + 1);
    let mut rows = Vec::new();
    let mut current = Row {
        text: PROMPT.to_string(),
        has_cursor: false,
    };

    let place_cursor = |row: &mut Row, index: usize| {
        if focused && index == cursor {
            row.text.push_str(CURSOR);
            row.has_cursor = true;
        }
    };

    for (index, ch) in content.chars().enumerate() {
        place_cursor(&mut current, index);
        if ch == '\n' {
            rows.push(std::mem::replace(
                &mut current,
                Row {
                    text: indent.clone(),
                    has_cursor: false,
                },
            ));
            continue;
        }
        if visual_width(&current.text) + visual_width(ch.encode_utf8(&mut [0; 4])) > width {
            rows.push(std::mem::replace(
                &mut current,
                Row {
                    text: indent.clone(),
                    has_cursor: false,
                },
            ));
        }
        current.text.push(ch);
    }
    place_cursor(&mut current, content.chars().count());
    rows.push(current);
    rows
}

/// Editable draft with submit history.
#[derive(Debug, Clone, Default)]
pub struct TextInputState {
    content: String,
    /// Cursor position as a character index.
    cursor: usize,
    history: Vec<String>,
    /// Position in history while browsing, most recent first.
    history_index: Option<usize>,
    saved_input: String,
}

impl TextInputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Whether the draft contains only whitespace.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map_or(self.content.len(), |(i, _)| i)
    }

    /// Insert a character at the cursor position.
    pub fn insert(&mut self, ch: char) {
        let at = self.byte_index(self.cursor);
        self.content.insert(at, ch);
        self.cursor += 1;
    }

    /// Insert a string at the cursor position.
    pub fn insert_str(&mut self, s: &str) {
        let at = self.byte_index(self.cursor);
        self.content.insert_str(at, s);
        self.cursor += s.chars().count();
    }

    /// Delete the character before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.content.remove(at);
        }
    }

    /// Delete the character at the cursor.
    pub fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let at = self.byte_index(self.cursor);
            self.content.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.char_len() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_len();
    }

    /// Take the draft, recording it in history.
    pub fn submit(&mut self) -> String {
        let content = std::mem::take(&mut self.content);
        self.cursor = 0;
        if !content.trim().is_empty() {
            self.history.push(content.clone());
        }
        self.history_index = None;
        self.saved_input.clear();
        content
    }

    /// Step back to an older history entry.
    pub fn history_prev(&mut self) {
        let next = match self.history_index {
            None => 0,
            Some(i) => i + 1,
        };
        if next >= self.history.len() {
            return;
        }
        if self.history_index.is_none() {
            self.saved_input = self.content.clone();
        }
        self.history_index = Some(next);
        self.content = self.history[self.history.len() - 1 - next].clone();
        self.move_end();
    }

    /// Step forward to a newer entry, restoring the unsent draft at the end.
    pub fn history_next(&mut self) {
        match self.history_index {
            None => {}
            Some(0) => {
                self.history_index = None;
                self.content = std::mem::take(&mut self.saved_input);
                self.move_end();
            }
            Some(i) => {
                self.history_index = Some(i - 1);
                self.content = self.history[self.history.len() - i].clone();
                self.move_end();
            }
        }
    }

    /// Number of display rows the draft needs at `width` columns.
    pub fn line_count(&self, width: usize) -> usize {
        if self.content.is_empty() {
            return 1;
        }
        layout_rows(&self.content, self.cursor, true, width).len()
    }

    pub fn widget(&self) -> TextInput<'_> {
        TextInput {
            content: &self.content,
            cursor: self.cursor,
            block: None,
            focused: true,
            placeholder: None,
        }
    }
}
