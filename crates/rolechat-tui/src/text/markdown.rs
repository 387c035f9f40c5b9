//! Markdown rendering for assistant replies.
//!
//! Replies are rendered to unwrapped [`Line`]s; the caller wraps them to the
//! transcript width. Blocks are separated by a single blank line.

use crate::ui::theme::Palette;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};

/// Styles for markdown elements.
#[derive(Debug, Clone)]
pub struct MarkdownStyles {
    pub heading: Style,
    pub subheading: Style,
    pub code: Style,
    pub code_block: Style,
    pub code_label: Style,
    pub emphasis: Style,
    pub strong: Style,
    pub strikethrough: Style,
    pub link: Style,
    pub list_marker: Style,
    pub blockquote: Style,
    pub rule: Style,
    pub text: Style,
}

impl Default for MarkdownStyles {
    fn default() -> Self {
        Self {
            heading: Style::default()
                .fg(Palette::ACCENT)
                .add_modifier(Modifier::BOLD),
            subheading: Style::default().fg(Palette::FG).add_modifier(Modifier::BOLD),
            code: Style::default().fg(Palette::ASSISTANT).bg(Palette::SURFACE),
            code_block: Style::default().fg(Palette::ASSISTANT).bg(Palette::SURFACE),
            code_label: Style::default().fg(Palette::DIM),
            emphasis: Style::default().add_modifier(Modifier::ITALIC),
            strong: Style::default().add_modifier(Modifier::BOLD),
            strikethrough: Style::default().add_modifier(Modifier::CROSSED_OUT),
            link: Style::default()
                .fg(Palette::ACCENT)
                .add_modifier(Modifier::UNDERLINED),
            list_marker: Style::default().fg(Palette::ACCENT_DIM),
            blockquote: Style::default()
                .fg(Palette::DIM)
                .add_modifier(Modifier::ITALIC),
            rule: Style::default().fg(Palette::BORDER),
            text: Style::default().fg(Palette::FG),
        }
    }
}

/// Render markdown to styled lines.
pub fn render_markdown(input: &str, styles: &MarkdownStyles) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut renderer = Renderer::new(styles);
    for event in Parser::new_ext(input, options) {
        renderer.handle(event);
    }
    renderer.flush();
    renderer.lines
}

/// List nesting entry: `Some(n)` for an ordered list at item `n`.
type ListKind = Option<u64>;

struct Renderer<'s> {
    styles: &'s MarkdownStyles,
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    style_stack: Vec<Style>,
    lists: Vec<ListKind>,
    quote_depth: usize,
    in_code_block: bool,
    pending_marker: Option<String>,
}

impl<'s> Renderer<'s> {
    fn new(styles: &'s MarkdownStyles) -> Self {
        Self {
            styles,
            lines: Vec::new(),
            spans: Vec::new(),
            style_stack: Vec::new(),
            lists: Vec::new(),
            quote_depth: 0,
            in_code_block: false,
            pending_marker: None,
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                self.prefix();
                self.spans
                    .push(Span::styled(format!("`{code}`"), self.styles.code));
            }
            Event::SoftBreak => self.text(" "),
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.block_gap();
                self.lines
                    .push(Line::from(Span::styled("─".repeat(24), self.styles.rule)));
            }
            Event::TaskListMarker(checked) => {
                let marker = self.pending_marker.take().unwrap_or_default();
                let checkbox = if checked { "[x] " } else { "[ ] " };
                self.pending_marker = Some(format!("{marker}{checkbox}"));
            }
            // Raw HTML and footnotes are dropped.
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if self.pending_marker.is_none() {
                    self.block_gap();
                }
            }
            Tag::Heading { level, .. } => {
                self.block_gap();
                let style = if level == HeadingLevel::H1 {
                    self.styles.heading
                } else {
                    self.styles.subheading
                };
                self.style_stack.push(style);
            }
            Tag::CodeBlock(kind) => {
                self.block_gap();
                self.in_code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.lines.push(Line::from(Span::styled(
                            lang.to_string(),
                            self.styles.code_label,
                        )));
                    }
                }
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.block_gap();
                } else {
                    self.flush();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let bullet = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let bullet = format!("{n}. ");
                        *n += 1;
                        bullet
                    }
                    _ => "• ".to_string(),
                };
                self.pending_marker = Some(format!("{}{bullet}", "  ".repeat(depth)));
            }
            Tag::BlockQuote => {
                self.block_gap();
                self.quote_depth += 1;
            }
            Tag::Emphasis => self.style_stack.push(self.styles.emphasis),
            Tag::Strong => self.style_stack.push(self.styles.strong),
            Tag::Strikethrough => self.style_stack.push(self.styles.strikethrough),
            Tag::Link { .. } => self.style_stack.push(self.styles.link),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Item => self.flush(),
            TagEnd::Heading(_) => {
                self.flush();
                self.style_stack.pop();
            }
            TagEnd::CodeBlock => {
                self.flush();
                self.in_code_block = false;
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
            }
            TagEnd::BlockQuote => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                self.style_stack.pop();
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_code_block {
            for line in text.lines() {
                self.lines.push(Line::from(Span::styled(
                    format!("  {line}"),
                    self.styles.code_block,
                )));
            }
            return;
        }
        self.prefix();
        let style = self
            .style_stack
            .iter()
            .fold(self.styles.text, |acc, s| acc.patch(*s));
        self.spans.push(Span::styled(text.to_string(), style));
    }

    /// Emit list markers and quote bars owed by the current line.
    fn prefix(&mut self) {
        if !self.spans.is_empty() {
            return;
        }
        if self.quote_depth > 0 {
            self.spans.push(Span::styled(
                "│ ".repeat(self.quote_depth),
                self.styles.blockquote,
            ));
        }
        if let Some(marker) = self.pending_marker.take() {
            self.spans.push(Span::styled(marker, self.styles.list_marker));
        }
    }

    /// Separate a new top-level block from what came before.
    fn block_gap(&mut self) {
        self.flush();
        if !self.lines.is_empty() && self.lists.is_empty() {
            self.lines.push(Line::default());
        }
    }

    fn flush(&mut self) {
        if !self.spans.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.spans)));
        }
    }
}
