//! Test helpers: rendering to text and a scripted completion client.

use crate::app::App;
use crate::screens::render_app;
use async_trait::async_trait;
use ratatui::{buffer::Buffer, layout::Rect};
use rolechat_engine::{CompletionClient, CompletionError, RequestEnvelope};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

pub use crate::headless::buffer_to_string;

/// Render the full app into a `width` x `height` buffer and return its text.
pub fn render_app_to_string(app: &App, width: u16, height: u16) -> String {
    let area = Rect::new(0, 0, width, height);
    let mut buf = Buffer::empty(area);
    render_app(app, area, &mut buf);
    buffer_to_string(&buf)
}

/// Completion client that answers from a fixed queue.
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, CompletionError>>>,
    seen: Mutex<Vec<RequestEnvelope>>,
    delay: Option<Duration>,
}

impl ScriptedClient {
    pub fn new(replies: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Hold every reply back by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Envelopes received so far.
    pub fn seen(&self) -> Vec<RequestEnvelope> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, envelope: &RequestEnvelope) -> Result<String, CompletionError> {
        self.seen.lock().unwrap().push(envelope.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::Aborted("no scripted reply".into())))
    }
}
