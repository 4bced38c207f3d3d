//! Verify, persist, then fan out one chat message.

use std::sync::Arc;

use tokio::sync::Mutex;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::ChatError;
use crate::metrics::Metrics;
use crate::models::{ChatMessageView, ChatScope};
use crate::store::MessageStore;
use crate::utils::auth::{verify_blocking, TokenVerifier};
use crate::ws_registry::{ConnectionEntry, ConnectionRegistry};

use super::protocol::ServerFrame;

/// Envelope and token allowance on top of the body when sizing inbound frames.
const FRAME_OVERHEAD_BYTES: usize = 8 * 1024;
/// A grapheme cluster can span several code points; budget generously so the length check, not
/// the transport, is what rejects a long body.
const MAX_BYTES_PER_GRAPHEME: usize = 16;

pub struct BroadcastDispatcher {
    verifier: Arc<dyn TokenVerifier>,
    store: Arc<dyn MessageStore>,
    registry: Arc<ConnectionRegistry>,
    metrics: Arc<Metrics>,
    max_message_len: usize,
    /// Held across persist + broadcast so fan-out order equals insertion order.
    post_lock: Mutex<()>,
}

impl BroadcastDispatcher {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        store: Arc<dyn MessageStore>,
        registry: Arc<ConnectionRegistry>,
        metrics: Arc<Metrics>,
        max_message_len: usize,
    ) -> Self {
        Self {
            verifier,
            store,
            registry,
            metrics,
            max_message_len,
            post_lock: Mutex::new(()),
        }
    }

    /// Post `content` as the owner of `token`.
    ///
    /// The token is checked here on every call, whatever state `sender` is in. The sender gets
    /// the broadcast only if it has registered through `authenticate`. Nothing is broadcast
    /// unless the insert succeeded. Errors are for the caller to report to `sender` alone.
    pub async fn post_message(
        &self,
        sender: &ConnectionEntry,
        token: &str,
        content: &str,
    ) -> Result<ChatMessageView, ChatError> {
        let author = verify_blocking(self.verifier.clone(), token.to_string()).await?;
        self.check_body(content)?;

        let _guard = self.post_lock.lock().await;

        let store = self.store.clone();
        let (author_id, body) = (author.id, content.to_string());
        let stored = match tokio::task::spawn_blocking(move || store.insert_global_message(author_id, &body)).await {
            Ok(Ok(stored)) => stored,
            Ok(Err(e)) => {
                tracing::error!(conn_id = sender.conn_id, user_id = author.id, "persist chat message: {:?}", e);
                return Err(ChatError::PersistenceFailure);
            }
            Err(e) => {
                tracing::error!(conn_id = sender.conn_id, user_id = author.id, "persist task: {:?}", e);
                return Err(ChatError::PersistenceFailure);
            }
        };
        debug_assert_eq!(stored.scope(), ChatScope::Global);

        let view = ChatMessageView::new(stored, &author);
        if let Some(json) = ServerFrame::NewMessage(view.clone()).to_json() {
            let delivered = self.registry.broadcast(&json);
            self.metrics.messages_broadcast.inc();
            tracing::debug!(
                conn_id = sender.conn_id,
                user_id = author.id,
                message_id = view.id,
                delivered,
                "chat message broadcast"
            );
        }
        Ok(view)
    }

    /// Byte limit for one inbound WebSocket message, derived from `max_message_len`.
    pub fn max_frame_bytes(&self) -> usize {
        self.max_message_len
            .saturating_mul(MAX_BYTES_PER_GRAPHEME)
            .saturating_add(FRAME_OVERHEAD_BYTES)
    }

    fn check_body(&self, content: &str) -> Result<(), ChatError> {
        if content.trim().is_empty() {
            return Err(ChatError::MessageRejected {
                reason: "Message cannot be empty",
            });
        }
        if content.graphemes(true).count() > self.max_message_len {
            return Err(ChatError::MessageRejected {
                reason: "Message is too long",
            });
        }
        Ok(())
    }
}
