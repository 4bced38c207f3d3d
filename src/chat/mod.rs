//! Real-time chat core: per-connection sessions, the shared registry, and the dispatcher that
//! persists and fans out messages.

pub mod dispatcher;
pub mod protocol;
pub mod session;

use std::sync::Arc;

use crate::error::ChatError;
use crate::metrics::Metrics;
use crate::models::UserIdentity;
use crate::store::MessageStore;
use crate::utils::auth::{verify_blocking, TokenVerifier};
use crate::ws_registry::ConnectionRegistry;

pub use dispatcher::BroadcastDispatcher;
pub use session::ChatSession;

/// Everything a chat session needs, built once and shared by every connection.
pub struct ChatHub {
    verifier: Arc<dyn TokenVerifier>,
    registry: Arc<ConnectionRegistry>,
    dispatcher: BroadcastDispatcher,
    metrics: Arc<Metrics>,
}

impl ChatHub {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        store: Arc<dyn MessageStore>,
        metrics: Arc<Metrics>,
        max_message_len: usize,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::with_gauge(
            metrics.registered_connections.clone(),
        ));
        let dispatcher = BroadcastDispatcher::new(
            verifier.clone(),
            store,
            registry.clone(),
            metrics.clone(),
            max_message_len,
        );
        Self {
            verifier,
            registry,
            dispatcher,
            metrics,
        }
    }

    pub async fn verify(&self, token: &str) -> Result<UserIdentity, ChatError> {
        verify_blocking(self.verifier.clone(), token.to_string()).await
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &BroadcastDispatcher {
        &self.dispatcher
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Largest inbound WebSocket message worth reading: a maximal body plus envelope and token.
    pub fn max_frame_bytes(&self) -> usize {
        self.dispatcher.max_frame_bytes()
    }
}
