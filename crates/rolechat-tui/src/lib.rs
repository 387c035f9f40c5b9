//! rolechat-tui: Terminal chat front end
//!
//! This crate provides the interactive layer for rolechat, including:
//! - The chat screen with transcript, typing indicator and composer
//! - The role preset picker
//! - Markdown rendering for assistant replies
//! - Headless mode for testing and automation

mod app;
mod dispatch;
mod event;
pub mod headless;
mod screens;
#[cfg(test)]
pub mod test_utils;
mod text;
mod ui;

pub use app::{App, Screen};
pub use event::{Action, Event, EventHandler};
pub use rolechat_engine;

use crossterm::{
    cursor::Show as ShowCursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dispatch::{drive_replies, ReplyTask};
use ratatui::{backend::Backend, backend::CrosstermBackend, layout::Rect, Terminal};
use rolechat_engine::{CompletionClient, Conversation};
use std::io::{self, stdout};
use std::sync::Arc;
use tracing::info;

/// Tick interval for the interactive loop (4 Hz drives the spinner).
const TICK_RATE_MS: u64 = 250;

/// RAII guard for terminal state restoration.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(stdout(), DisableMouseCapture, LeaveAlternateScreen, ShowCursor);
    }
}

/// Run the interactive chat until the user quits.
///
/// Sets up the terminal, runs the event loop, and restores the terminal on
/// exit. Replies are fetched through `client` on a background task.
pub async fn run_tui(
    conversation: Conversation,
    client: Arc<dyn CompletionClient>,
) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let _guard = TerminalGuard;

    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(conversation);
    let mut events = EventHandler::new(TICK_RATE_MS);
    info!(model = app.conversation.model(), "chat session started");

    let result = run_loop(&mut terminal, &mut app, &mut events, &client).await;

    terminal.show_cursor()?;
    info!(
        messages = app.conversation.transcript().len(),
        "chat session ended"
    );
    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &mut EventHandler,
    client: &Arc<dyn CompletionClient>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut reply: Option<ReplyTask> = None;

    loop {
        drive_replies(app, client, &mut reply).await;
        draw(terminal, app)?;

        if app.should_quit {
            if let Some(task) = reply.take() {
                task.abort();
            }
            break;
        }

        match events.next().await {
            Some(Event::Key(key)) => app.handle_key(key),
            Some(Event::Mouse(mouse)) => app.handle_action(event::mouse_to_action(mouse)),
            Some(Event::Tick) => app.tick(),
            // The next draw picks up the new size.
            Some(Event::Resize(_, _)) => {}
            None => break,
        }
    }

    Ok(())
}

/// Draw one frame, then clamp scrolling to what the frame could show.
pub(crate) fn draw<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let mut area = Rect::default();
    terminal.draw(|frame| {
        area = frame.area();
        screens::render_app(app, area, frame.buffer_mut());
    })?;
    app.clamp_scroll(screens::chat::max_scroll(app, area));
    Ok(())
}

/// Returns the TUI version.
pub fn tui_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
