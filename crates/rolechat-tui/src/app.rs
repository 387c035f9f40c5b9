//! Application state and update logic for the rolechat TUI.

use crate::event::{key_to_action, Action};
use crate::ui::widgets::TextInputState;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rolechat_engine::{
    Conversation, ConversationEvent, PendingRequest, RolePreset, SendError, DEFAULT_GREETING,
};
use tokio::sync::mpsc;
use tracing::debug;

/// Ticks a notification stays on screen.
const NOTIFICATION_TICKS: usize = 12;

/// Rows moved by PageUp/PageDown.
const PAGE_ROWS: usize = 10;

/// The current screen being displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Chat,
    PresetPicker,
    QuitConfirm,
}

/// Main application state.
#[derive(Debug)]
pub struct App {
    pub should_quit: bool,
    pub show_help: bool,
    pub screen: Screen,
    pub conversation: Conversation,
    events: mpsc::UnboundedReceiver<ConversationEvent>,
    pub input_state: TextInputState,
    /// Transcript rows scrolled up from the bottom; 0 follows new messages.
    pub scroll_from_bottom: usize,
    /// Highlighted row in the preset picker.
    pub picker_index: usize,
    /// Animation counter, advanced every tick.
    pub tick: usize,
    pub notification: Option<String>,
    notification_ttl: usize,
    /// Request waiting to be dispatched by the event loop.
    outbox: Option<PendingRequest>,
}

impl App {
    pub fn new(mut conversation: Conversation) -> Self {
        let events = conversation.subscribe();
        Self {
            should_quit: false,
            show_help: false,
            screen: Screen::Chat,
            conversation,
            events,
            input_state: TextInputState::new(),
            scroll_from_bottom: 0,
            picker_index: 0,
            tick: 0,
            notification: None,
            notification_ttl: 0,
            outbox: None,
        }
    }

    /// App over a fresh session with the default greeting and preset.
    pub fn new_for_test() -> Self {
        Self::new(Conversation::new(
            DEFAULT_GREETING,
            RolePreset::default(),
            "gpt-4-1106-preview",
        ))
    }

    /// Route a key press: the composer gets first refusal on the chat screen.
    pub fn handle_key(&mut self, key: KeyEvent) {
        let action = key_to_action(key);

        // Help closes on any key; only the quit chord gets through.
        if self.show_help {
            if action == Action::Quit && key.modifiers.contains(KeyModifiers::CONTROL) {
                self.should_quit = true;
            }
            self.show_help = false;
            return;
        }

        let screen = self.screen;
        match screen {
            Screen::Chat if self.handle_composer_key(key) => {}
            // Leaving the picker never quits the app.
            Screen::PresetPicker if key.code == KeyCode::Char('q') => {
                self.handle_action(Action::Back);
            }
            _ => self.handle_action(action),
        }
    }

    /// Returns `true` if the composer consumed the key.
    fn handle_composer_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);

        if key.code == KeyCode::Enter && (ctrl || alt || key.modifiers.contains(KeyModifiers::SHIFT)) {
            self.input_state.insert('\n');
            return true;
        }
        if ctrl {
            return false;
        }

        match key.code {
            KeyCode::Enter => {
                self.submit_input();
                true
            }
            // A lone '?' opens help; anywhere else it is text.
            KeyCode::Char('?') if self.input_state.is_empty() => false,
            KeyCode::Char(c) => {
                self.input_state.insert(c);
                true
            }
            KeyCode::Backspace => {
                self.input_state.backspace();
                true
            }
            KeyCode::Delete => {
                self.input_state.delete();
                true
            }
            KeyCode::Left => {
                self.input_state.move_left();
                true
            }
            KeyCode::Right => {
                self.input_state.move_right();
                true
            }
            KeyCode::Home => {
                self.input_state.move_home();
                true
            }
            KeyCode::End => {
                self.input_state.move_end();
                true
            }
            KeyCode::Up => {
                self.input_state.history_prev();
                true
            }
            KeyCode::Down => {
                self.input_state.history_next();
                true
            }
            _ => false,
        }
    }

    /// Handle an action.
    pub fn handle_action(&mut self, action: Action) {
        if action == Action::Quit {
            self.should_quit = true;
            return;
        }
        if self.show_help {
            if action != Action::None {
                self.show_help = false;
            }
            return;
        }
        if action == Action::Help {
            self.show_help = true;
            return;
        }

        match self.screen {
            Screen::Chat => self.handle_chat_action(action),
            Screen::PresetPicker => self.handle_picker_action(action),
            Screen::QuitConfirm => match action {
                Action::Select => self.should_quit = true,
                Action::Back => self.screen = Screen::Chat,
                _ => {}
            },
        }
    }

    fn handle_chat_action(&mut self, action: Action) {
        match action {
            Action::Back => {
                if self.conversation.cancel() {
                    debug!("pending request cancelled from keyboard");
                } else {
                    self.screen = Screen::QuitConfirm;
                }
            }
            Action::Select => self.submit_input(),
            Action::Presets => {
                self.picker_index = self.conversation.preset().index();
                self.screen = Screen::PresetPicker;
            }
            Action::NextPreset => {
                let next = RolePreset::nth_wrapping(self.conversation.preset().index() + 1);
                self.conversation.select_role_preset(next);
            }
            Action::PrevPreset => {
                let count = RolePreset::all().len();
                let prev =
                    RolePreset::nth_wrapping(self.conversation.preset().index() + count - 1);
                self.conversation.select_role_preset(prev);
            }
            Action::Preset(index) => {
                if let Some(preset) = RolePreset::all().get(index) {
                    self.conversation.select_role_preset(*preset);
                }
            }
            Action::Up => self.scroll_up(1),
            Action::Down => self.scroll_down(1),
            Action::PageUp => self.scroll_up(PAGE_ROWS),
            Action::PageDown => self.scroll_down(PAGE_ROWS),
            Action::Quit | Action::Help | Action::None => {}
        }
    }

    fn handle_picker_action(&mut self, action: Action) {
        let count = RolePreset::all().len();
        match action {
            Action::Up => self.picker_index = (self.picker_index + count - 1) % count,
            Action::Down | Action::NextPreset => self.picker_index = (self.picker_index + 1) % count,
            Action::PrevPreset => self.picker_index = (self.picker_index + count - 1) % count,
            Action::Select => {
                self.conversation
                    .select_role_preset(RolePreset::nth_wrapping(self.picker_index));
                self.screen = Screen::Chat;
            }
            Action::Preset(index) if index < count => {
                self.conversation
                    .select_role_preset(RolePreset::nth_wrapping(index));
                self.screen = Screen::Chat;
            }
            Action::Back | Action::Presets => self.screen = Screen::Chat,
            _ => {}
        }
    }

    /// Send the composer draft. The draft is kept when the send is refused.
    fn submit_input(&mut self) {
        if self.input_state.is_blank() {
            self.set_notification(SendError::EmptyMessage.to_string());
            return;
        }
        if self.conversation.is_typing() {
            self.set_notification("Waiting for the current reply...".to_string());
            return;
        }

        let text = self.input_state.content().to_string();
        match self.conversation.begin_send(text) {
            Ok(pending) => {
                self.input_state.submit();
                self.scroll_from_bottom = 0;
                self.outbox = Some(pending);
            }
            Err(err) => self.set_notification(err.to_string()),
        }
    }

    /// Take the request the event loop should dispatch next.
    pub fn take_pending_request(&mut self) -> Option<PendingRequest> {
        self.outbox.take()
    }

    /// Apply queued conversation notifications to view state.
    pub fn process_conversation_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                ConversationEvent::MessageAppended(_) => self.scroll_from_bottom = 0,
                ConversationEvent::PresetChanged(preset) => {
                    self.set_notification(format!("Role: {}", preset.label()));
                }
                ConversationEvent::Failed(message) => self.set_notification(message),
                ConversationEvent::TypingChanged(typing) => debug!(typing, "typing changed"),
            }
        }
    }

    fn scroll_up(&mut self, rows: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(rows);
    }

    fn scroll_down(&mut self, rows: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(rows);
    }

    /// Clamp the scroll position once the transcript height is known.
    pub fn clamp_scroll(&mut self, max_offset: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.min(max_offset);
    }

    /// Set a temporary notification message.
    pub fn set_notification(&mut self, msg: String) {
        self.notification = Some(msg);
        self.notification_ttl = NOTIFICATION_TICKS;
    }

    /// Advance animations and expire notifications.
    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        if self.notification_ttl > 0 {
            self.notification_ttl -= 1;
            if self.notification_ttl == 0 {
                self.notification = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolechat_engine::{CompletionError, ConversationStatus};

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    #[test]
    fn test_typing_and_submit_queues_request() {
        let mut app = App::new_for_test();
        type_text(&mut app, "hello");
        assert_eq!(app.input_state.content(), "hello");

        press(&mut app, KeyCode::Enter);
        assert!(app.input_state.is_empty());
        assert!(app.conversation.is_typing());

        let pending = app.take_pending_request().unwrap();
        assert_eq!(pending.envelope.messages.len(), 3);
        assert!(app.take_pending_request().is_none());
    }

    #[test]
    fn test_blank_submit_is_ignored() {
        let mut app = App::new_for_test();
        type_text(&mut app, "   ");
        press(&mut app, KeyCode::Enter);

        assert!(app.take_pending_request().is_none());
        assert_eq!(app.conversation.transcript().len(), 1);
        assert_eq!(app.notification.as_deref(), Some("Message is empty"));
    }

    #[test]
    fn test_submit_while_pending_keeps_draft() {
        let mut app = App::new_for_test();
        type_text(&mut app, "first");
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "second");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.input_state.content(), "second");
        assert_eq!(app.conversation.transcript().len(), 2);
        assert_eq!(
            app.notification.as_deref(),
            Some("Waiting for the current reply...")
        );
    }

    #[test]
    fn test_shift_enter_inserts_newline() {
        let mut app = App::new_for_test();
        type_text(&mut app, "a");
        app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT));
        type_text(&mut app, "b");
        assert_eq!(app.input_state.content(), "a\nb");
        assert!(!app.conversation.is_typing());
    }

    #[test]
    fn test_letters_are_typed_not_bound() {
        let mut app = App::new_for_test();
        type_text(&mut app, "quit?");
        assert!(!app.should_quit);
        assert!(!app.show_help);
        assert_eq!(app.input_state.content(), "quit?");
    }

    #[test]
    fn test_question_mark_on_empty_draft_opens_help() {
        let mut app = App::new_for_test();
        press(&mut app, KeyCode::Char('?'));
        assert!(app.show_help);
        press(&mut app, KeyCode::Char('x'));
        assert!(!app.show_help);
        assert!(app.input_state.is_empty());
    }

    #[test]
    fn test_any_key_closes_help_without_side_effects() {
        for code in [
            KeyCode::Char('a'),
            KeyCode::Backspace,
            KeyCode::Enter,
            KeyCode::Esc,
            KeyCode::Char('q'),
            KeyCode::F(1),
        ] {
            let mut app = App::new_for_test();
            type_text(&mut app, "draft");
            app.handle_action(Action::Help);

            press(&mut app, code);
            assert!(!app.show_help, "help still open after {code:?}");
            assert!(!app.should_quit);
            assert_eq!(app.screen, Screen::Chat);
            assert_eq!(app.input_state.content(), "draft");
            assert!(!app.conversation.is_typing());
        }
    }

    #[test]
    fn test_ctrl_c_quits_from_help() {
        let mut app = App::new_for_test();
        app.handle_action(Action::Help);
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn test_q_in_picker_closes_picker() {
        let mut app = App::new_for_test();
        app.handle_action(Action::Presets);
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.should_quit);
        assert_eq!(app.screen, Screen::Chat);
        assert_eq!(app.conversation.preset(), RolePreset::default());
    }

    #[test]
    fn test_escape_cancels_pending_request() {
        let mut app = App::new_for_test();
        type_text(&mut app, "hello");
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Esc);

        assert!(!app.conversation.is_typing());
        assert_eq!(app.screen, Screen::Chat);
        assert_eq!(app.conversation.last_error(), Some("Request cancelled"));
    }

    #[test]
    fn test_escape_when_idle_asks_to_quit() {
        let mut app = App::new_for_test();
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.screen, Screen::QuitConfirm);

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.screen, Screen::Chat);
        assert!(!app.should_quit);

        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Enter);
        assert!(app.should_quit);
    }

    #[test]
    fn test_ctrl_c_quits_immediately() {
        let mut app = App::new_for_test();
        type_text(&mut app, "draft");
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn test_preset_picker_selects_preset() {
        let mut app = App::new_for_test();
        app.handle_key(KeyEvent::new(KeyCode::Char('p'), KeyModifiers::CONTROL));
        assert_eq!(app.screen, Screen::PresetPicker);
        assert_eq!(app.picker_index, 0);

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.screen, Screen::Chat);
        assert_eq!(app.conversation.preset(), RolePreset::SeniorEngineers);
    }

    #[test]
    fn test_preset_picker_digit_and_escape() {
        let mut app = App::new_for_test();
        app.handle_action(Action::Presets);
        press(&mut app, KeyCode::Char('4'));
        assert_eq!(app.conversation.preset(), RolePreset::Cowboy);

        app.handle_action(Action::Presets);
        assert_eq!(app.picker_index, 3);
        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.screen, Screen::Chat);
        assert_eq!(app.conversation.preset(), RolePreset::Cowboy);
    }

    #[test]
    fn test_tab_cycles_presets() {
        let mut app = App::new_for_test();
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.conversation.preset(), RolePreset::Classroom);
        press(&mut app, KeyCode::BackTab);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.conversation.preset(), RolePreset::Cowboy);
    }

    #[test]
    fn test_preset_change_notifies() {
        let mut app = App::new_for_test();
        app.handle_action(Action::NextPreset);
        app.process_conversation_events();
        assert_eq!(app.notification.as_deref(), Some("Role: Classroom"));
    }

    #[test]
    fn test_failure_surfaces_notification_and_resets_scroll() {
        let mut app = App::new_for_test();
        type_text(&mut app, "hello");
        press(&mut app, KeyCode::Enter);
        let pending = app.take_pending_request().unwrap();
        app.process_conversation_events();
        app.scroll_from_bottom = 7;

        app.conversation
            .finish(pending.id, Err(CompletionError::Timeout(60)));
        app.process_conversation_events();

        assert_eq!(app.conversation.status(), ConversationStatus::Idle);
        assert_eq!(
            app.notification.as_deref(),
            Some("Request timed out after 60s")
        );
        // The failure appends nothing, so the scroll position is left alone.
        assert_eq!(app.scroll_from_bottom, 7);
    }

    #[test]
    fn test_new_reply_follows_bottom() {
        let mut app = App::new_for_test();
        type_text(&mut app, "hello");
        press(&mut app, KeyCode::Enter);
        let pending = app.take_pending_request().unwrap();
        app.process_conversation_events();

        app.handle_action(Action::PageUp);
        assert_eq!(app.scroll_from_bottom, PAGE_ROWS);

        app.conversation.finish(pending.id, Ok("hi".into()));
        app.process_conversation_events();
        assert_eq!(app.scroll_from_bottom, 0);
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut app = App::new_for_test();
        app.handle_action(Action::PageUp);
        app.handle_action(Action::PageUp);
        app.clamp_scroll(4);
        assert_eq!(app.scroll_from_bottom, 4);
        app.handle_action(Action::PageDown);
        assert_eq!(app.scroll_from_bottom, 0);
    }

    #[test]
    fn test_notification_expires() {
        let mut app = App::new_for_test();
        app.set_notification("hi".into());
        for _ in 0..NOTIFICATION_TICKS {
            assert!(app.notification.is_some());
            app.tick();
        }
        assert!(app.notification.is_none());
    }
}
