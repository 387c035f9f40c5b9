//! Runs completion requests off the UI loop.
//!
//! At most one request is in flight. Each loop iteration calls
//! [`drive_replies`], which merges a finished reply, aborts a reply the
//! conversation no longer waits for, and starts whatever the app queued.

use crate::app::App;
use rolechat_engine::{
    CompletionClient, CompletionError, ConversationStatus, PendingRequest,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A spawned completion request.
pub(crate) struct ReplyTask {
    id: u64,
    handle: JoinHandle<Result<String, CompletionError>>,
}

impl ReplyTask {
    fn spawn(client: Arc<dyn CompletionClient>, pending: PendingRequest) -> Self {
        let PendingRequest { id, envelope } = pending;
        debug!(request_id = id, "dispatching completion request");
        let handle = tokio::spawn(async move { client.complete(&envelope).await });
        Self { id, handle }
    }

    /// Stop the request; its result is never merged.
    pub(crate) fn abort(self) {
        self.handle.abort();
    }
}

/// Advance request handling by one step without blocking on the network.
pub(crate) async fn drive_replies(
    app: &mut App,
    client: &Arc<dyn CompletionClient>,
    task: &mut Option<ReplyTask>,
) {
    if let Some(current) = task.as_ref() {
        let awaited = app.conversation.status()
            == ConversationStatus::Sending {
                request_id: current.id,
            };
        if !awaited {
            debug!(request_id = current.id, "aborting abandoned request");
            current.handle.abort();
            *task = None;
        }
    }

    if task.as_ref().is_some_and(|t| t.handle.is_finished()) {
        if let Some(ReplyTask { id, handle }) = task.take() {
            let result = handle.await.unwrap_or_else(|err| {
                warn!(request_id = id, error = %err, "completion task failed");
                Err(CompletionError::Aborted(err.to_string()))
            });
            app.conversation.finish(id, result);
        }
    }

    if let Some(pending) = app.take_pending_request() {
        *task = Some(ReplyTask::spawn(Arc::clone(client), pending));
    }

    app.process_conversation_events();
}
