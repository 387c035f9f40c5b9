//! Status bar widget.

use crate::text::{truncate_to_width, visual_width};
use crate::ui::theme::{Palette, Styles};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Widget,
};

/// A key hint for the status bar.
#[derive(Debug, Clone)]
pub struct KeyHint {
    pub key: &'static str,
    pub label: &'static str,
}

impl KeyHint {
    pub const fn new(key: &'static str, label: &'static str) -> Self {
        Self { key, label }
    }
}

/// Bottom bar: mode badge, key hints and a right-aligned message.
#[derive(Debug, Clone)]
pub struct StatusBar<'a> {
    mode: &'a str,
    hints: Vec<KeyHint>,
    right_text: Option<&'a str>,
    right_style: Style,
}

impl<'a> StatusBar<'a> {
    pub fn new(mode: &'a str) -> Self {
        Self {
            mode,
            hints: Vec::new(),
            right_text: None,
            right_style: Styles::status_bar(),
        }
    }

    #[must_use]
    pub fn hints(mut self, hints: Vec<KeyHint>) -> Self {
        self.hints = hints;
        self
    }

    #[must_use]
    pub fn right(mut self, text: &'a str) -> Self {
        self.right_text = Some(text);
        self
    }

    #[must_use]
    pub fn right_style(mut self, style: Style) -> Self {
        self.right_style = style;
        self
    }
}

impl Widget for StatusBar<'_> {
    #[allow(clippy::cast_possible_truncation)]
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 1 {
            return;
        }

        for x in area.x..area.x.saturating_add(area.width) {
            buf[(x, area.y)].set_char(' ').set_bg(Palette::STATUS_BG);
        }

        // The right-hand message wins over hints when space runs out.
        let right = self
            .right_text
            .map(|text| truncate_to_width(text, (area.width as usize).saturating_sub(2) / 2 + 8));
        let right_width = right.as_deref().map_or(0, |t| visual_width(t) + 1);

        let mut spans = vec![
            Span::styled(
                format!(" {} ", self.mode),
                Styles::default().bg(Palette::ACCENT).fg(Palette::BG),
            ),
            Span::styled(" ", Styles::status_bar()),
        ];
        let mut used: usize = spans.iter().map(|s| visual_width(&s.content)).sum();
        let budget = (area.width as usize).saturating_sub(right_width);

        for hint in &self.hints {
            let key = format!(" {} ", hint.key);
            let label = format!(" {} ", hint.label);
            let width = visual_width(&key) + visual_width(&label);
            if used + width > budget {
                break;
            }
            used += width;
            spans.push(Span::styled(key, Styles::key_hint()));
            spans.push(Span::styled(label, Styles::status_bar()));
        }

        buf.set_line(area.x, area.y, &Line::from(spans), area.width);

        if let Some(text) = right {
            let width = visual_width(&text) as u16;
            if width < area.width {
                let x = area.x + area.width - width - 1;
                buf.set_string(x, area.y, text, self.right_style.bg(Palette::STATUS_BG));
            }
        }
    }
}
