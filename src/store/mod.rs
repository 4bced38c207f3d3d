//! Persistence seams for the chat core: user lookup and the chat message log.

#[cfg(test)]
pub mod memory;
pub mod pg;

use crate::error::StoreError;
use crate::models::{ChatMessage, ChatMessageView, UserIdentity};

pub use pg::PgStore;

pub trait UserDirectory: Send + Sync {
    fn find_user(&self, id: i32) -> Result<Option<UserIdentity>, StoreError>;
}

/// Append-only chat log. Ids and timestamps are assigned by the store on insert.
pub trait MessageStore: Send + Sync {
    fn insert_global_message(&self, author_id: i32, body: &str) -> Result<ChatMessage, StoreError>;

    /// Newest first. Clients reverse the page before display.
    fn fetch_recent_global(&self, limit: i64) -> Result<Vec<ChatMessageView>, StoreError>;

    /// Direct messages exchanged between `a` and `b` in either direction, oldest first.
    fn fetch_direct_history(&self, a: i32, b: i32) -> Result<Vec<ChatMessageView>, StoreError>;
}
