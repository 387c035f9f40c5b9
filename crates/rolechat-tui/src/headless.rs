//! Headless mode for the rolechat TUI.
//!
//! Runs the same app and rendering code against a [`TestBackend`]. Input is
//! fed through a channel and the rendered screen is published after every
//! frame, which lets tests drive whole conversations end to end.

use crate::app::{App, Screen};
use crate::dispatch::{drive_replies, ReplyTask};
use crate::event::Action;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};
use rolechat_engine::{CompletionClient, Conversation};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Default terminal dimensions for headless mode.
pub const DEFAULT_WIDTH: u16 = 80;
pub const DEFAULT_HEIGHT: u16 = 24;

/// State captured from the headless TUI after each render.
#[derive(Debug, Clone, Default)]
pub struct HeadlessState {
    pub screen: Screen,
    /// Text contents of the terminal buffer.
    pub screen_contents: String,
    pub should_quit: bool,
    pub show_help: bool,
    /// Whether a reply is pending.
    pub typing: bool,
    pub transcript_len: usize,
}

/// Input accepted by a headless instance.
#[derive(Debug, Clone)]
pub enum HeadlessInput {
    Key(KeyEvent),
    Action(Action),
}

/// Handle to control a headless TUI instance.
pub struct HeadlessHandle {
    input_tx: mpsc::UnboundedSender<HeadlessInput>,
    state_rx: watch::Receiver<HeadlessState>,
}

impl HeadlessHandle {
    /// Send an action, bypassing key mapping.
    pub fn send_action(&self, action: Action) -> bool {
        self.input_tx.send(HeadlessInput::Action(action)).is_ok()
    }

    /// Send a key press as if typed.
    pub fn send_key(&self, key: KeyEvent) -> bool {
        self.input_tx.send(HeadlessInput::Key(key)).is_ok()
    }

    /// Send a key press with no modifiers.
    pub fn press(&self, code: KeyCode) -> bool {
        self.send_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    /// Type `text` into the composer one character at a time.
    pub fn type_text(&self, text: &str) -> bool {
        text.chars().all(|ch| self.press(KeyCode::Char(ch)))
    }

    /// Get the current state of the TUI.
    pub fn state(&self) -> HeadlessState {
        self.state_rx.borrow().clone()
    }

    /// Wait until a condition is met on the state.
    ///
    /// Returns the state when the condition is met, or `None` if timed out.
    pub async fn wait_for<F>(&mut self, condition: F, timeout: Duration) -> Option<HeadlessState>
    where
        F: Fn(&HeadlessState) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let state = self.state();
            if condition(&state) {
                return Some(state);
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }

            match tokio::time::timeout(remaining, self.state_rx.changed()).await {
                Ok(Ok(())) => {}
                // Timed out, or the loop exited.
                Ok(Err(_)) | Err(_) => return condition(&self.state()).then(|| self.state()),
            }
        }
    }

    /// Wait for specific text to appear on screen.
    pub async fn wait_for_text(&mut self, text: &str, timeout: Duration) -> Option<HeadlessState> {
        self.wait_for(|s| s.screen_contents.contains(text), timeout)
            .await
    }

    /// Wait for a specific screen to be displayed.
    pub async fn wait_for_screen(
        &mut self,
        screen: Screen,
        timeout: Duration,
    ) -> Option<HeadlessState> {
        self.wait_for(|s| s.screen == screen, timeout).await
    }

    /// Check if the TUI has quit.
    pub fn has_quit(&self) -> bool {
        self.state().should_quit
    }
}

/// Configuration for headless mode.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    pub width: u16,
    pub height: u16,
    pub tick_rate_ms: u64,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            tick_rate_ms: 20,
        }
    }
}

/// Run the TUI in headless mode.
///
/// Returns a handle to control the TUI and a join handle for the background task.
///
/// ```ignore
/// let (mut handle, task) = run_tui_headless(conversation, client, HeadlessConfig::default());
/// handle.type_text("hello");
/// handle.press(KeyCode::Enter);
/// handle.wait_for_text("hi there", Duration::from_secs(1)).await;
/// handle.send_action(Action::Quit);
/// task.await.unwrap();
/// ```
pub fn run_tui_headless(
    conversation: Conversation,
    client: Arc<dyn CompletionClient>,
    config: HeadlessConfig,
) -> (HeadlessHandle, JoinHandle<Result<(), String>>) {
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(HeadlessState::default());

    let task = tokio::spawn(async move {
        run_headless_loop(conversation, client, config, input_rx, state_tx)
            .await
            .map_err(|e| e.to_string())
    });

    (HeadlessHandle { input_tx, state_rx }, task)
}

async fn run_headless_loop(
    conversation: Conversation,
    client: Arc<dyn CompletionClient>,
    config: HeadlessConfig,
    mut input_rx: mpsc::UnboundedReceiver<HeadlessInput>,
    state_tx: watch::Sender<HeadlessState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let backend = TestBackend::new(config.width, config.height);
    let mut terminal = Terminal::new(backend)?;
    let mut app = App::new(conversation);
    let mut reply: Option<ReplyTask> = None;
    let tick_duration = Duration::from_millis(config.tick_rate_ms);

    loop {
        drive_replies(&mut app, &client, &mut reply).await;
        crate::draw(&mut terminal, &mut app)?;

        let _ = state_tx.send(HeadlessState {
            screen: app.screen,
            screen_contents: buffer_to_string(terminal.backend().buffer()),
            should_quit: app.should_quit,
            show_help: app.show_help,
            typing: app.conversation.is_typing(),
            transcript_len: app.conversation.transcript().len(),
        });

        if app.should_quit {
            break;
        }

        tokio::select! {
            Some(input) = input_rx.recv() => match input {
                HeadlessInput::Key(key) => app.handle_key(key),
                HeadlessInput::Action(action) => app.handle_action(action),
            },
            () = tokio::time::sleep(tick_duration) => app.tick(),
        }
    }

    if let Some(task) = reply {
        task.abort();
    }
    Ok(())
}

/// Convert a terminal buffer to text, one row per line, trailing spaces trimmed.
pub fn buffer_to_string(buffer: &Buffer) -> String {
    let area = buffer.area;
    let mut rows = Vec::with_capacity(area.height as usize);

    for y in area.y..area.y + area.height {
        let mut row = String::new();
        for x in area.x..area.x + area.width {
            if let Some(cell) = buffer.cell((x, y)) {
                row.push_str(cell.symbol());
            }
        }
        rows.push(row.trim_end().to_string());
    }

    rows.join("\n")
}
