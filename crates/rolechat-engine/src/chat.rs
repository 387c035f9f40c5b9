//! Chat transcript types and request formatting.
//!
//! This module holds the transcript shown in the chat pane and the pure
//! mapping from a transcript to the request body the completion service
//! expects.

use crate::preset::RolePreset;
use chrono::Local;
use serde::{Deserialize, Serialize};

/// Greeting inserted at the start of every session.
pub const DEFAULT_GREETING: &str = "Hello, I'm ChatGPT! Ask me anything!";

/// Display name of the assistant in the chat pane.
pub const ASSISTANT_NAME: &str = "ChatGPT";

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    /// Typed by the user.
    User,
    /// Produced by the completion service (or the synthetic greeting).
    Assistant,
}

/// Rendering hint for a message bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sent by the local user.
    Outgoing,
}

/// A single message in the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message text.
    pub text: String,
    /// Author of the message.
    pub sender: Sender,
    /// Human-readable time label.
    pub sent_time: String,
    /// Set for user-authored messages.
    pub direction: Option<Direction>,
}

impl Message {
    /// Create an outgoing user message stamped with the local time.
    pub fn outgoing(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
            sent_time: time_label(),
            direction: Some(Direction::Outgoing),
        }
    }

    /// Create an incoming assistant message stamped with the local time.
    pub fn incoming(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Assistant,
            sent_time: time_label(),
            direction: None,
        }
    }

    /// Create the synthetic session greeting.
    pub fn greeting(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Assistant,
            sent_time: "just now".into(),
            direction: None,
        }
    }

    /// Whether the local user wrote this message.
    pub fn is_outgoing(&self) -> bool {
        self.direction == Some(Direction::Outgoing)
    }
}

fn time_label() -> String {
    Local::now().format("%H:%M").to_string()
}

/// Ordered, append-only list of messages for the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transcript seeded with the assistant greeting.
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::greeting(greeting)],
        }
    }

    /// Append a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// All messages in conversation order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Iterate over the messages.
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// The most recent message.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

/// Role of an entry in the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiRole {
    /// Instructions to the model.
    System,
    /// User turn.
    User,
    /// Assistant turn.
    Assistant,
}

impl From<Sender> for ApiRole {
    fn from(sender: Sender) -> Self {
        match sender {
            Sender::Assistant => ApiRole::Assistant,
            Sender::User => ApiRole::User,
        }
    }
}

/// One `{role, content}` entry of the request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: ApiRole,
    pub content: String,
}

/// Request body for a chat completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Model identifier.
    pub model: String,
    /// System entry followed by the mapped transcript.
    pub messages: Vec<ApiMessage>,
}

impl RequestEnvelope {
    /// The system directive at the head of the envelope.
    pub fn system_content(&self) -> Option<&str> {
        self.messages
            .first()
            .filter(|m| m.role == ApiRole::System)
            .map(|m| m.content.as_str())
    }
}

/// Build the request body for the next completion.
///
/// The active preset becomes the leading `system` entry; every transcript
/// message follows in order, with assistant messages mapped to `assistant`
/// and everything else to `user`. The greeting is mapped like any other
/// message.
pub fn build_request_envelope(
    transcript: &Transcript,
    preset: RolePreset,
    model: &str,
) -> RequestEnvelope {
    let mut messages = Vec::with_capacity(transcript.len() + 1);
    messages.push(ApiMessage {
        role: ApiRole::System,
        content: preset.content().to_string(),
    });
    messages.extend(transcript.iter().map(|msg| ApiMessage {
        role: msg.sender.into(),
        content: msg.text.clone(),
    }));

    RequestEnvelope {
        model: model.to_string(),
        messages,
    }
}
