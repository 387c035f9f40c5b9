//! Chat screen: role bar, transcript, composer and status bar.

use super::Screen;
use crate::app::{App, Screen as AppScreen};
use crate::text::{render_markdown, truncate_to_width, visual_width, wrap_lines, wrap_text, MarkdownStyles};
use crate::ui::theme::{spinner, Styles, Symbols};
use crate::ui::widgets::{KeyHint, StatusBar};
use crate::ui::{chat_layout, main_layout};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use rolechat_engine::{Message, Sender, ASSISTANT_NAME};

/// Placeholder shown in an empty composer.
pub const PLACEHOLDER: &str = "Type message here";

/// Most rows the composer grows to before scrolling.
const MAX_INPUT_ROWS: usize = 3;

/// Indent applied to message bodies under their speaker line.
const BODY_INDENT: &str = "  ";

/// Chat screen.
pub struct ChatScreen;

impl Screen for ChatScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let (body, status) = main_layout(area);
        let (role_bar, transcript, input) = chat_layout(body, input_height(app, body.width));

        render_role_bar(app, role_bar, buf);
        render_transcript(app, transcript, buf);
        render_input(app, input, buf);
        render_status_bar(app, status, buf);
    }
}

#[allow(clippy::cast_possible_truncation)]
fn input_height(app: &App, width: u16) -> u16 {
    let rows = app
        .input_state
        .line_count(width.saturating_sub(2) as usize)
        .min(MAX_INPUT_ROWS);
    rows as u16 + 2
}

fn render_role_bar(app: &App, area: Rect, buf: &mut Buffer) {
    let preset = app.conversation.preset();
    let mut spans = vec![
        Span::styled(" Role ", Styles::key_hint()),
        Span::styled(format!(" {} ", preset.label()), Styles::highlight()),
    ];
    let used: usize = spans.iter().map(|s| visual_width(&s.content)).sum();
    let room = (area.width as usize).saturating_sub(used + 1);
    if room > 3 {
        spans.push(Span::styled(
            format!(" {}", truncate_to_width(preset.content(), room)),
            Styles::dim(),
        ));
    }
    Paragraph::new(Line::from(spans))
        .style(Styles::default())
        .render(area, buf);
}

/// Rows of the transcript at `width` columns, oldest first.
pub fn transcript_lines(app: &App, width: usize) -> Vec<Line<'static>> {
    let styles = MarkdownStyles::default();
    let conversation = &app.conversation;
    let mut lines = Vec::new();

    for (i, message) in conversation.transcript().iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        lines.push(speaker_line(message));
        let body: Vec<Line<'static>> = match message.sender {
            Sender::User => message
                .text
                .lines()
                .map(|l| Line::from(Span::styled(l.to_string(), Styles::default())))
                .collect(),
            Sender::Assistant => render_markdown(&message.text, &styles),
        };
        lines.extend(wrap_lines(body, width, BODY_INDENT));
    }

    if conversation.is_typing() {
        lines.push(Line::default());
        lines.push(Line::from(vec![
            Span::styled(format!("{ASSISTANT_NAME} is typing "), Styles::dim().add_modifier(Modifier::ITALIC)),
            Span::styled(spinner(app.tick), Styles::active()),
        ]));
    }

    if let Some(error) = conversation.last_error() {
        lines.push(Line::default());
        let text = format!("{} {error}", Symbols::ERROR);
        for row in wrap_text(&text, width.max(1)) {
            lines.push(Line::from(Span::styled(row, Styles::error())));
        }
    }

    lines
}

fn speaker_line(message: &Message) -> Line<'static> {
    let name = match message.sender {
        Sender::User => "You",
        Sender::Assistant => ASSISTANT_NAME,
    };
    Line::from(vec![
        Span::styled(name, Styles::speaker(message.sender)),
        Span::styled(format!("  {}", message.sent_time), Styles::dim()),
    ])
}

/// Largest useful `scroll_from_bottom` for a frame of `area`.
pub fn max_scroll(app: &App, area: Rect) -> usize {
    let (body, _) = main_layout(area);
    let (_, transcript, _) = chat_layout(body, input_height(app, body.width));
    let inner = transcript_block(false).inner(transcript);
    transcript_lines(app, inner.width as usize)
        .len()
        .saturating_sub(inner.height as usize)
}

fn transcript_block(scrolled: bool) -> Block<'static> {
    let block = Block::default()
        .title(" Conversation ")
        .title_style(Styles::title())
        .borders(Borders::ALL)
        .border_style(Styles::border())
        .style(Styles::default());
    if scrolled {
        block.title_bottom(Line::from(" PgDn to follow ").style(Styles::dim()))
    } else {
        block
    }
}

fn render_transcript(app: &App, area: Rect, buf: &mut Buffer) {
    let scrolled = app.scroll_from_bottom > 0;
    let block = transcript_block(scrolled);
    let inner = block.inner(area);
    block.render(area, buf);

    let lines = transcript_lines(app, inner.width as usize);
    let height = inner.height as usize;
    let max_offset = lines.len().saturating_sub(height);
    let top = max_offset - app.scroll_from_bottom.min(max_offset);

    let visible: Vec<Line<'static>> = lines.into_iter().skip(top).take(height).collect();
    Paragraph::new(visible)
        .style(Styles::default())
        .render(inner, buf);
}

fn render_input(app: &App, area: Rect, buf: &mut Buffer) {
    let typing = app.conversation.is_typing();
    let title = if typing {
        " Message (waiting for reply) "
    } else {
        " Message "
    };
    let focused = app.screen == AppScreen::Chat && !app.show_help;
    let block = Block::default()
        .title(title)
        .title_style(if typing { Styles::dim() } else { Styles::title() })
        .borders(Borders::ALL)
        .border_style(if focused {
            Styles::border_active()
        } else {
            Styles::border()
        })
        .style(Styles::default());

    app.input_state
        .widget()
        .block(block)
        .focused(focused)
        .placeholder(PLACEHOLDER)
        .render(area, buf);
}

fn render_status_bar(app: &App, area: Rect, buf: &mut Buffer) {
    let typing = app.conversation.is_typing();
    let hints = vec![
        KeyHint::new("Enter", "Send"),
        KeyHint::new("Esc", if typing { "Cancel" } else { "Quit" }),
        KeyHint::new("Ctrl+P", "Role"),
        KeyHint::new("Tab", "Next role"),
        KeyHint::new("F1", "Help"),
    ];

    let (right, style) = match &app.notification {
        Some(note) if app.conversation.last_error() == Some(note.as_str()) => {
            (note.as_str(), Styles::error())
        }
        Some(note) => (note.as_str(), Styles::warning()),
        None => (app.conversation.model(), Styles::dim()),
    };

    StatusBar::new(if typing { "Waiting" } else { "Chat" })
        .hints(hints)
        .right(right)
        .right_style(style)
        .render(area, buf);
}
