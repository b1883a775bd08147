//! FIFO hand-off from the listener thread to the designated thread

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::INTERNAL_ERROR;
use crate::mcp::{McpHandler, McpRequest, McpResponse};

/// A decoded request waiting for the designated thread
#[derive(Debug)]
pub struct QueuedRequest {
    pub request: McpRequest,
    pub reply: oneshot::Sender<McpResponse>,
    pub enqueued_at: Instant,
}

/// Cloneable handle to the shared queue
#[derive(Debug, Clone, Default)]
pub struct RequestQueue {
    items: Arc<Mutex<VecDeque<QueuedRequest>>>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request; the receiver resolves once it has been processed
    pub fn enqueue(&self, request: McpRequest) -> oneshot::Receiver<McpResponse> {
        let (reply, rx) = oneshot::channel();
        self.items.lock().push_back(QueuedRequest {
            request,
            reply,
            enqueued_at: Instant::now(),
        });
        rx
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Process everything queued right now, in arrival order.
    ///
    /// Must only be called from the designated thread. Requests arriving
    /// while the batch runs wait for the next call.
    pub fn drain_and_process(&self, handler: &dyn McpHandler) -> usize {
        let batch = std::mem::take(&mut *self.items.lock());
        let processed = batch.len();

        for item in batch {
            let id = item.request.id.clone();
            let method = item.request.method.clone();
            tracing::debug!(
                method = %method,
                waited_ms = item.enqueued_at.elapsed().as_millis() as u64,
                "Dispatching request"
            );

            let response = catch_unwind(AssertUnwindSafe(|| handler.handle_request(item.request)))
                .unwrap_or_else(|_| {
                    tracing::error!("Handler panicked while processing {}", method);
                    McpResponse::error(
                        id,
                        INTERNAL_ERROR,
                        format!("Internal error: handler panicked while processing {}", method),
                        None,
                    )
                });

            if item.reply.send(response).is_err() {
                tracing::debug!("Client for {} disconnected before the reply", method);
            }
        }

        processed
    }

    /// Discard pending requests without processing them
    pub fn clear(&self) -> usize {
        let dropped = std::mem::take(&mut *self.items.lock());
        dropped.len()
    }
}
