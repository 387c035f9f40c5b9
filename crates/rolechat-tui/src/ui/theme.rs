//! Colors, symbols and styles for the chat UI.

use ratatui::style::{Color, Modifier, Style};
use rolechat_engine::Sender;

/// Color palette.
pub struct Palette;

impl Palette {
    pub const BG: Color = Color::Rgb(30, 30, 40);
    pub const FG: Color = Color::Rgb(220, 220, 230);
    pub const DIM: Color = Color::Rgb(140, 140, 160);
    /// Background behind inline and fenced code.
    pub const SURFACE: Color = Color::Rgb(49, 50, 68);

    pub const ACCENT: Color = Color::Rgb(130, 170, 255);
    pub const ACCENT_DIM: Color = Color::Rgb(80, 100, 160);

    pub const USER: Color = Color::Rgb(245, 194, 231);
    pub const ASSISTANT: Color = Color::Rgb(148, 226, 213);

    pub const STATUS_BG: Color = Color::Rgb(45, 45, 60);
    pub const KEY_BG: Color = Color::Rgb(70, 90, 140);

    pub const WARNING: Color = Color::Rgb(240, 200, 100);
    pub const ERROR: Color = Color::Rgb(240, 100, 100);

    pub const BORDER: Color = Color::Rgb(80, 80, 100);
}

/// ASCII markers, safe on any terminal font.
pub struct Symbols;

impl Symbols {
    /// Prefix of the inline error under the transcript.
    pub const ERROR: &'static str = "[x]";
    /// Cursor row in the preset picker.
    pub const SELECTED: &'static str = ">";
    /// Marks the preset currently in use.
    pub const ACTIVE: &'static str = "*";
    pub const SPINNER: [&'static str; 4] = ["|", "/", "-", "\\"];
}

/// Named styles.
pub struct Styles;

impl Styles {
    pub fn default() -> Style {
        Style::default().fg(Palette::FG).bg(Palette::BG)
    }

    /// Timestamps, preset directives, hints.
    pub fn dim() -> Style {
        Self::default().fg(Palette::DIM)
    }

    pub fn highlight() -> Style {
        Self::active().add_modifier(Modifier::BOLD)
    }

    pub fn active() -> Style {
        Self::default().fg(Palette::ACCENT)
    }

    /// Speaker line above a message.
    pub fn speaker(sender: Sender) -> Style {
        let color = match sender {
            Sender::User => Palette::USER,
            Sender::Assistant => Palette::ASSISTANT,
        };
        Self::default().fg(color).add_modifier(Modifier::BOLD)
    }

    pub fn warning() -> Style {
        Self::default().fg(Palette::WARNING)
    }

    pub fn error() -> Style {
        Self::default().fg(Palette::ERROR)
    }

    /// Block titles. Leaves the background to the block.
    pub fn title() -> Style {
        Style::default()
            .fg(Palette::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    /// Key caps in the status bar and the role badge.
    pub fn key_hint() -> Style {
        Style::default()
            .fg(Palette::FG)
            .bg(Palette::KEY_BG)
            .add_modifier(Modifier::BOLD)
    }

    pub fn status_bar() -> Style {
        Style::default().fg(Palette::FG).bg(Palette::STATUS_BG)
    }

    pub fn border() -> Style {
        Style::default().fg(Palette::BORDER)
    }

    /// Border of the focused composer and of overlays.
    pub fn border_active() -> Style {
        Style::default().fg(Palette::ACCENT)
    }
}

/// Spinner frame for the given tick.
pub fn spinner(tick: usize) -> &'static str {
    Symbols::SPINNER[tick % Symbols::SPINNER.len()]
}
