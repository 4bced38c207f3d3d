//! Per-connection chat lifecycle.
//!
//! ```text
//! New --authenticate(ok)--> Authenticated(user_id) --authenticate(ok)--> Authenticated(user_id')
//!  |                              |
//!  +-------- disconnect ----------+--> Closed
//! ```
//!
//! `chat_message` frames are not gated on the state: posting re-checks the token embedded in each
//! frame. Only `authenticate` puts the connection in the registry, so a connection that posts
//! without authenticating first does not see its own message come back.

use std::sync::Arc;

use crate::error::ChatError;
use crate::ws_registry::ConnectionEntry;

use super::protocol::{ClientFrame, ServerFrame};
use super::ChatHub;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    New,
    Authenticated { user_id: i32 },
    Closed,
}

pub struct ChatSession {
    conn: Arc<ConnectionEntry>,
    state: SessionState,
}

impl ChatSession {
    pub fn new(conn: Arc<ConnectionEntry>) -> Self {
        Self {
            conn,
            state: SessionState::New,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn conn_id(&self) -> u64 {
        self.conn.conn_id
    }

    /// Handle one text frame. Failures are answered with an `error` frame on this connection;
    /// the state is left as it was.
    pub async fn handle_text(&mut self, hub: &ChatHub, text: &str) {
        if self.state == SessionState::Closed {
            return;
        }
        let result = match ClientFrame::parse(text) {
            Ok(ClientFrame::Authenticate { token }) => self.authenticate(hub, &token).await,
            Ok(ClientFrame::ChatMessage { token, content }) => hub
                .dispatcher()
                .post_message(&self.conn, &token, &content)
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            self.reply_error(hub, &e);
        }
    }

    /// Verify `token` and register this connection under its user. A second successful call
    /// re-registers; a failed call changes nothing, including an earlier authentication.
    pub async fn authenticate(&mut self, hub: &ChatHub, token: &str) -> Result<(), ChatError> {
        let user = hub.verify(token).await?;

        if let SessionState::Authenticated { user_id } = self.state {
            if user_id != user.id {
                // Re-authenticated as someone else: drop the stale mapping to this socket.
                hub.registry().unregister(self.conn.conn_id);
            }
        }
        if let Some(previous) = hub.registry().register(user.id, self.conn.clone()) {
            if previous.conn_id != self.conn.conn_id {
                tracing::info!(
                    user_id = user.id,
                    conn_id = self.conn.conn_id,
                    superseded_conn_id = previous.conn_id,
                    "chat registration superseded an earlier connection"
                );
            }
        }
        self.state = SessionState::Authenticated { user_id: user.id };
        tracing::info!(user_id = user.id, conn_id = self.conn.conn_id, "chat connection authenticated");

        self.send(&ServerFrame::Authenticated { user_id: user.id });
        Ok(())
    }

    /// Report a failure on this connection only.
    pub fn reply_error(&self, hub: &ChatHub, err: &ChatError) {
        hub.metrics().frames_rejected.with_label_values(&[err.kind()]).inc();
        tracing::debug!(conn_id = self.conn.conn_id, kind = err.kind(), "ws error frame");
        self.send(&ServerFrame::error(err));
    }

    /// Leave the registry and stop handling frames. Safe to call more than once.
    pub fn disconnect(&mut self, hub: &ChatHub) {
        if self.state == SessionState::Closed {
            return;
        }
        let removed = hub.registry().unregister(self.conn.conn_id);
        tracing::info!(conn_id = self.conn.conn_id, ?removed, "chat connection closed");
        self.state = SessionState::Closed;
    }

    fn send(&self, frame: &ServerFrame) {
        if let Some(json) = frame.to_json() {
            self.conn.send(json);
        }
    }
}
