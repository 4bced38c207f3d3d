//! Shared fixtures for unit tests: an in-memory store seeded with two users and a hub wired to it.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::chat::protocol::ServerFrame;
use crate::chat::ChatHub;
use crate::metrics::Metrics;
use crate::store::memory::MemoryStore;
use crate::utils::auth::{issue_token, JwtVerifier, TokenVerifier};
use crate::AppState;

pub const SECRET: &[u8] = b"unit-test-secret";

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub metrics: Arc<Metrics>,
    pub hub: Arc<ChatHub>,
    pub state: AppState,
}

impl Fixture {
    pub fn new() -> Self {
        Self::build(2000, 50)
    }

    pub fn with_max_message_len(max_message_len: usize) -> Self {
        Self::build(max_message_len, 50)
    }

    pub fn with_history_limit(history_limit: i64) -> Self {
        Self::build(2000, history_limit)
    }

    fn build(max_message_len: usize, history_limit: i64) -> Self {
        let store = Arc::new(MemoryStore::with_users(&[(7, "Alice", "Martin"), (9, "Bob", "Keller")]));
        let metrics = Arc::new(Metrics::new().unwrap());
        let verifier: Arc<dyn TokenVerifier> = Arc::new(JwtVerifier::new(SECRET, store.clone()));
        let hub = Arc::new(ChatHub::new(
            verifier.clone(),
            store.clone(),
            metrics.clone(),
            max_message_len,
        ));
        let state = AppState {
            store: store.clone(),
            verifier,
            chat: hub.clone(),
            metrics: metrics.clone(),
            history_limit,
        };
        Fixture {
            store,
            metrics,
            hub,
            state,
        }
    }

    pub fn token(&self, user_id: i32) -> String {
        issue_token(SECRET, user_id).unwrap()
    }
}

pub fn auth_frame(token: &str) -> String {
    serde_json::json!({"type": "authenticate", "token": token}).to_string()
}

pub fn chat_frame(token: &str, content: &str) -> String {
    serde_json::json!({"type": "chat_message", "token": token, "content": content}).to_string()
}

/// Everything queued on a connection so far, decoded.
pub fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<ServerFrame> {
    let mut frames = Vec::new();
    while let Ok(text) = rx.try_recv() {
        frames.push(serde_json::from_str(&text).unwrap());
    }
    frames
}
