//! rolechat-engine: Conversation state and completion client
//!
//! This crate provides the UI-agnostic core of rolechat, including:
//! - Transcript types and request envelope formatting
//! - Role presets
//! - Configuration and API key loading
//! - The completion service client
//! - The conversation controller and its change notifications

pub mod chat;
pub mod client;
pub mod config;
pub mod controller;
pub mod preset;

// Re-export commonly used types
pub use chat::{
    build_request_envelope, ApiMessage, ApiRole, Direction, Message, RequestEnvelope, Sender,
    Transcript, ASSISTANT_NAME, DEFAULT_GREETING,
};
pub use client::{complete_conversation, CompletionClient, CompletionError, OpenAiClient};
pub use config::{ApiKey, Config, ConfigError};
pub use controller::{
    Conversation, ConversationController, ConversationEvent, ConversationStatus, Outcome,
    PendingRequest, SendError,
};
pub use preset::RolePreset;

/// Returns the engine version.
pub fn engine_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
