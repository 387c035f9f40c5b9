//! Screen definitions for the rolechat TUI.

pub mod chat;
pub mod preset_picker;

use crate::app::{App, Screen as AppScreen};
use crate::ui::centered_fixed;
use crate::ui::theme::Styles;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

/// Trait for screens that can be rendered.
pub trait Screen {
    /// Render the screen to the buffer.
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer);
}

/// Render the whole frame: chat underneath, overlays on top.
pub fn render_app(app: &App, area: Rect, buf: &mut Buffer) {
    chat::ChatScreen.render(app, area, buf);

    match app.screen {
        AppScreen::Chat => {}
        AppScreen::PresetPicker => preset_picker::PresetPickerScreen.render(app, area, buf),
        AppScreen::QuitConfirm => render_quit_overlay(area, buf),
    }

    if app.show_help {
        render_help_overlay(area, buf);
    }
}

/// Render the help overlay.
pub fn render_help_overlay(area: Rect, buf: &mut Buffer) {
    let help_text = r"
  Chat
    Enter              Send message
    Ctrl/Alt+Enter     New line
    Up/Down            Message history
    PgUp/PgDn, wheel   Scroll transcript
    Esc                Cancel reply, or quit

  Roles
    Ctrl+P             Pick a role preset
    Tab / Shift+Tab    Next/prev role
    1-9 in picker      Pick by number

  F1 or ?              Show this help
  Ctrl+C               Quit

  [Press any key to close]
";

    let width = 52.min(area.width.saturating_sub(4));
    let height = 20.min(area.height.saturating_sub(2));
    let overlay_area = centered_fixed(width, height, area);

    Clear.render(overlay_area, buf);

    let block = Block::default()
        .title(" Help ")
        .title_style(Styles::title())
        .borders(Borders::ALL)
        .border_style(Styles::border_active())
        .style(Styles::default());

    Paragraph::new(help_text)
        .block(block)
        .style(Styles::default())
        .render(overlay_area, buf);
}

fn render_quit_overlay(area: Rect, buf: &mut Buffer) {
    let overlay_area = centered_fixed(36.min(area.width), 6.min(area.height), area);
    Clear.render(overlay_area, buf);

    let block = Block::default()
        .title(" Quit ")
        .title_style(Styles::title())
        .borders(Borders::ALL)
        .border_style(Styles::border_active())
        .style(Styles::default());

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled("  Leave this conversation?", Styles::default())),
        Line::from(vec![
            Span::styled("  [Enter] ", Styles::highlight()),
            Span::styled("Quit   ", Styles::default()),
            Span::styled("[Esc] ", Styles::highlight()),
            Span::styled("Stay", Styles::default()),
        ]),
    ];
    Paragraph::new(lines).block(block).render(overlay_area, buf);
}
