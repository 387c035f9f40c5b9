//! Conversation controller.
//!
//! [`Conversation`] is the single owner of the transcript, the active role
//! preset and the typing flag. It is mutated only through its methods, and
//! every change is broadcast as a [`ConversationEvent`] to subscribers.
//!
//! A round-trip is split in two so a UI can run the network call on its own
//! task: [`Conversation::begin_send`] records the user message and hands back
//! a [`PendingRequest`], and [`Conversation::finish`] applies the outcome.
//! [`ConversationController`] joins both halves for sequential callers.

use crate::chat::{build_request_envelope, Message, RequestEnvelope, Transcript};
use crate::client::{CompletionClient, CompletionError};
use crate::config::Config;
use crate::preset::RolePreset;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Change notifications emitted by a [`Conversation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    /// A message was appended to the transcript.
    MessageAppended(Message),
    /// The typing flag changed.
    TypingChanged(bool),
    /// A different preset became active.
    PresetChanged(RolePreset),
    /// A request failed; the string is shown to the user.
    Failed(String),
}

/// Request lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationStatus {
    /// No request in flight.
    #[default]
    Idle,
    /// Waiting for the reply to `request_id`.
    Sending { request_id: u64 },
}

/// A request that has been recorded but not yet completed.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    /// Identifier to pass back to [`Conversation::finish`].
    pub id: u64,
    /// Body to send to the completion service.
    pub envelope: RequestEnvelope,
}

/// Result of a full round-trip through [`ConversationController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The assistant replied with this text.
    Reply(String),
    /// The request failed with this user-visible message.
    Failed(String),
}

/// Conversation state for one session.
#[derive(Debug)]
pub struct Conversation {
    transcript: Transcript,
    preset: RolePreset,
    model: String,
    status: ConversationStatus,
    last_error: Option<String>,
    next_request_id: u64,
    subscribers: Vec<mpsc::UnboundedSender<ConversationEvent>>,
}

impl Conversation {
    /// Start a session seeded with `greeting`.
    pub fn new(greeting: impl Into<String>, preset: RolePreset, model: impl Into<String>) -> Self {
        Self {
            transcript: Transcript::with_greeting(greeting),
            preset,
            model: model.into(),
            status: ConversationStatus::Idle,
            last_error: None,
            next_request_id: 1,
            subscribers: Vec::new(),
        }
    }

    /// Start a session from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.greeting.clone(),
            config.default_preset,
            config.model.clone(),
        )
    }

    /// Register for change notifications.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ConversationEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn preset(&self) -> RolePreset {
        self.preset
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn status(&self) -> ConversationStatus {
        self.status
    }

    /// Whether a reply is being waited on.
    pub fn is_typing(&self) -> bool {
        matches!(self.status, ConversationStatus::Sending { .. })
    }

    /// Message from the most recent failure, cleared by the next send.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Envelope the next request would carry, without changing state.
    pub fn preview_envelope(&self) -> RequestEnvelope {
        build_request_envelope(&self.transcript, self.preset, &self.model)
    }

    /// Record a user message and prepare its request.
    ///
    /// Rejects blank text and sends made while another request is pending;
    /// in both cases the transcript is left untouched.
    pub fn begin_send(&mut self, text: impl Into<String>) -> Result<PendingRequest, SendError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(SendError::EmptyMessage);
        }
        if self.is_typing() {
            return Err(SendError::RequestInFlight);
        }

        let message = Message::outgoing(text);
        self.transcript.push(message.clone());
        self.last_error = None;

        let id = self.next_request_id;
        self.next_request_id += 1;
        self.status = ConversationStatus::Sending { request_id: id };

        self.emit(ConversationEvent::MessageAppended(message));
        self.emit(ConversationEvent::TypingChanged(true));

        let envelope = build_request_envelope(&self.transcript, self.preset, &self.model);
        debug!(request_id = id, messages = envelope.messages.len(), "request prepared");

        Ok(PendingRequest { id, envelope })
    }

    /// Apply the outcome of request `id`.
    ///
    /// Returns `false` if `id` is not the pending request (for example after
    /// [`Conversation::cancel`]); the outcome is then discarded.
    pub fn finish(&mut self, id: u64, result: Result<String, CompletionError>) -> bool {
        if self.status != (ConversationStatus::Sending { request_id: id }) {
            warn!(request_id = id, "discarding stale completion result");
            return false;
        }
        self.status = ConversationStatus::Idle;

        match result {
            Ok(reply) => {
                let message = Message::incoming(reply);
                self.transcript.push(message.clone());
                self.emit(ConversationEvent::MessageAppended(message));
            }
            Err(err) => {
                warn!(request_id = id, error = %err, "completion failed");
                self.fail(err.to_string());
            }
        }
        self.emit(ConversationEvent::TypingChanged(false));
        true
    }

    /// Abandon the pending request, if any.
    pub fn cancel(&mut self) -> bool {
        if !self.is_typing() {
            return false;
        }
        self.status = ConversationStatus::Idle;
        self.fail("Request cancelled".into());
        self.emit(ConversationEvent::TypingChanged(false));
        true
    }

    /// Make `preset` active for subsequent requests.
    pub fn select_role_preset(&mut self, preset: RolePreset) {
        if self.preset == preset {
            return;
        }
        self.preset = preset;
        self.emit(ConversationEvent::PresetChanged(preset));
    }

    /// Make the preset with directive `content` active.
    pub fn select_role_preset_content(&mut self, content: &str) -> Result<(), SendError> {
        let preset = RolePreset::from_content(content)
            .ok_or_else(|| SendError::UnknownPreset(content.to_string()))?;
        self.select_role_preset(preset);
        Ok(())
    }

    fn fail(&mut self, message: String) {
        self.last_error = Some(message.clone());
        self.emit(ConversationEvent::Failed(message));
    }

    fn emit(&mut self, event: ConversationEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Drives complete round-trips against a [`CompletionClient`].
pub struct ConversationController<C> {
    conversation: Conversation,
    client: C,
}

impl<C: CompletionClient> ConversationController<C> {
    pub fn new(conversation: Conversation, client: C) -> Self {
        Self {
            conversation,
            client,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Send `text`, wait for the reply and merge it into the transcript.
    ///
    /// The typing flag is cleared before this returns, whatever the outcome.
    pub async fn send_user_message(&mut self, text: impl Into<String>) -> Result<Outcome, SendError> {
        let pending = self.conversation.begin_send(text)?;
        let result = self.client.complete(&pending.envelope).await;

        let outcome = match &result {
            Ok(reply) => Outcome::Reply(reply.clone()),
            Err(err) => Outcome::Failed(err.to_string()),
        };
        self.conversation.finish(pending.id, result);
        Ok(outcome)
    }

    pub fn select_role_preset(&mut self, preset: RolePreset) {
        self.conversation.select_role_preset(preset);
    }

    pub fn into_parts(self) -> (Conversation, C) {
        (self.conversation, self.client)
    }
}

/// Errors returned when a send is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// Blank or whitespace-only text.
    #[error("Message is empty")]
    EmptyMessage,

    /// Another request is still pending.
    #[error("A reply is still pending")]
    RequestInFlight,

    /// Preset string not in the enumerated list.
    #[error("Unknown preset: {0}")]
    UnknownPreset(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ApiRole, Sender, DEFAULT_GREETING};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const MODEL: &str = "gpt-4-1106-preview";

    fn conversation() -> Conversation {
        Conversation::new(DEFAULT_GREETING, RolePreset::default(), MODEL)
    }

    /// Replies from a queue and records every envelope it receives.
    struct ScriptedClient {
        replies: Mutex<Vec<Result<String, CompletionError>>>,
        seen: Mutex<Vec<RequestEnvelope>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<String, CompletionError>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, envelope: &RequestEnvelope) -> Result<String, CompletionError> {
            self.seen.lock().unwrap().push(envelope.clone());
            self.replies.lock().unwrap().remove(0)
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ConversationEvent>) -> Vec<ConversationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_new_session_has_only_greeting() {
        let conv = conversation();
        assert_eq!(conv.transcript().len(), 1);
        let greeting = &conv.transcript().messages()[0];
        assert_eq!(greeting.sender, Sender::Assistant);
        assert_eq!(greeting.text, DEFAULT_GREETING);
        assert!(!conv.is_typing());
    }

    #[test]
    fn test_begin_send_sets_typing() {
        let mut conv = conversation();
        let pending = conv.begin_send("hello").unwrap();

        assert!(conv.is_typing());
        assert_eq!(conv.transcript().len(), 2);
        assert!(conv.transcript().last().unwrap().is_outgoing());
        assert_eq!(pending.envelope.messages.len(), 3);
        assert_eq!(pending.envelope.messages[2].role, ApiRole::User);
    }

    #[test]
    fn test_success_clears_typing_and_appends_reply() {
        let mut conv = conversation();
        let pending = conv.begin_send("hello").unwrap();
        assert!(conv.finish(pending.id, Ok("hi there".into())));

        assert!(!conv.is_typing());
        assert_eq!(conv.transcript().len(), 3);
        let texts: Vec<&str> = conv.transcript().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec![DEFAULT_GREETING, "hello", "hi there"]);
        assert!(conv.last_error().is_none());
    }

    #[test]
    fn test_failure_clears_typing_and_keeps_user_message() {
        let mut conv = conversation();
        let pending = conv.begin_send("hello").unwrap();
        conv.finish(pending.id, Err(CompletionError::Timeout(60)));

        assert!(!conv.is_typing());
        assert_eq!(conv.transcript().len(), 2);
        assert_eq!(conv.transcript().last().unwrap().text, "hello");
        assert_eq!(conv.last_error(), Some("Request timed out after 60s"));
    }

    #[test]
    fn test_next_send_clears_previous_error() {
        let mut conv = conversation();
        let pending = conv.begin_send("hello").unwrap();
        conv.finish(pending.id, Err(CompletionError::Aborted("boom".into())));
        assert!(conv.last_error().is_some());

        conv.begin_send("again").unwrap();
        assert!(conv.last_error().is_none());
    }

    #[test]
    fn test_blank_messages_are_rejected() {
        let mut conv = conversation();
        assert_eq!(conv.begin_send("").unwrap_err(), SendError::EmptyMessage);
        assert_eq!(conv.begin_send(" \n\t ").unwrap_err(), SendError::EmptyMessage);
        assert_eq!(conv.transcript().len(), 1);
        assert!(!conv.is_typing());
    }

    #[test]
    fn test_send_while_pending_is_rejected() {
        let mut conv = conversation();
        conv.begin_send("first").unwrap();
        assert_eq!(
            conv.begin_send("second").unwrap_err(),
            SendError::RequestInFlight
        );
        assert_eq!(conv.transcript().len(), 2);
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let mut conv = conversation();
        let first = conv.begin_send("first").unwrap();
        assert!(conv.cancel());
        assert_eq!(conv.last_error(), Some("Request cancelled"));

        let second = conv.begin_send("second").unwrap();
        assert!(!conv.finish(first.id, Ok("late reply".into())));
        assert!(conv.is_typing());

        assert!(conv.finish(second.id, Ok("on time".into())));
        let texts: Vec<&str> = conv.transcript().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec![DEFAULT_GREETING, "first", "second", "on time"]);
    }

    #[test]
    fn test_cancel_when_idle_is_noop() {
        let mut conv = conversation();
        assert!(!conv.cancel());
        assert!(conv.last_error().is_none());
    }

    #[test]
    fn test_preset_change_affects_only_next_envelope() {
        let mut conv = conversation();
        let first = conv.begin_send("hello").unwrap();
        conv.finish(first.id, Ok("hi".into()));

        conv.select_role_preset(RolePreset::Cowboy);
        let preview = conv.preview_envelope();

        assert_eq!(
            first.envelope.system_content(),
            Some(RolePreset::SeasonedProfessional.content())
        );
        assert_eq!(preview.system_content(), Some(RolePreset::Cowboy.content()));
        assert_eq!(preview.messages[1..3], first.envelope.messages[1..]);
        assert_eq!(conv.transcript().len(), 3);
    }

    #[test]
    fn test_select_role_preset_content() {
        let mut conv = conversation();
        conv.select_role_preset_content("Answer like you are a cowboy")
            .unwrap();
        assert_eq!(conv.preset(), RolePreset::Cowboy);
        assert!(matches!(
            conv.select_role_preset_content("Answer like a pirate"),
            Err(SendError::UnknownPreset(_))
        ));
        assert_eq!(conv.preset(), RolePreset::Cowboy);
    }

    #[test]
    fn test_events_are_emitted_in_order() {
        let mut conv = conversation();
        let mut rx = conv.subscribe();

        let pending = conv.begin_send("hello").unwrap();
        conv.finish(pending.id, Ok("hi there".into()));
        conv.select_role_preset(RolePreset::Classroom);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 5);
        assert!(matches!(&events[0], ConversationEvent::MessageAppended(m) if m.text == "hello"));
        assert_eq!(events[1], ConversationEvent::TypingChanged(true));
        assert!(matches!(&events[2], ConversationEvent::MessageAppended(m) if m.text == "hi there"));
        assert_eq!(events[3], ConversationEvent::TypingChanged(false));
        assert_eq!(events[4], ConversationEvent::PresetChanged(RolePreset::Classroom));
    }

    #[test]
    fn test_failure_event() {
        let mut conv = conversation();
        let mut rx = conv.subscribe();
        let pending = conv.begin_send("hello").unwrap();
        conv.finish(pending.id, Err(CompletionError::MalformedResponse("no choices".into())));

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, ConversationEvent::Failed(msg) if msg.contains("no choices"))));
        assert_eq!(events.last(), Some(&ConversationEvent::TypingChanged(false)));
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let mut conv = conversation();
        drop(conv.subscribe());
        conv.select_role_preset(RolePreset::Cowboy);
        assert!(conv.subscribers.is_empty());
    }

    #[tokio::test]
    async fn test_controller_round_trip() {
        let client = ScriptedClient::new(vec![Ok("hi there".into())]);
        let mut controller = ConversationController::new(conversation(), client);

        let outcome = controller.send_user_message("hello").await.unwrap();
        assert_eq!(outcome, Outcome::Reply("hi there".into()));
        assert!(!controller.conversation().is_typing());

        let (conv, client) = controller.into_parts();
        let senders: Vec<Sender> = conv.transcript().iter().map(|m| m.sender).collect();
        assert_eq!(senders, vec![Sender::Assistant, Sender::User, Sender::Assistant]);

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].messages.len(), 3);
    }

    #[tokio::test]
    async fn test_controller_failure_resets_typing() {
        let client = ScriptedClient::new(vec![Err(CompletionError::Aborted("offline".into()))]);
        let mut controller = ConversationController::new(conversation(), client);

        let outcome = controller.send_user_message("hello").await.unwrap();
        assert!(matches!(outcome, Outcome::Failed(msg) if msg.contains("offline")));
        let conv = controller.conversation();
        assert!(!conv.is_typing());
        assert_eq!(conv.transcript().len(), 2);
        assert!(conv.last_error().is_some());
    }

    #[tokio::test]
    async fn test_controller_preset_reaches_next_request() {
        let client = ScriptedClient::new(vec![Ok("one".into()), Ok("two".into())]);
        let mut controller = ConversationController::new(conversation(), client);

        controller.send_user_message("first").await.unwrap();
        controller.select_role_preset(RolePreset::Cowboy);
        controller.send_user_message("second").await.unwrap();

        let (_, client) = controller.into_parts();
        let seen = client.seen.lock().unwrap();
        assert_eq!(
            seen[0].system_content(),
            Some(RolePreset::SeasonedProfessional.content())
        );
        assert_eq!(seen[1].system_content(), Some(RolePreset::Cowboy.content()));
        assert_eq!(seen[1].messages.len(), 5);
    }
}
