use crate::schema;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// Minimal projection of a user row: what the chat core needs to label a message.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = schema::users)]
pub struct UserIdentity {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
}

/// Who can see a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatScope {
    Global,
    Direct { recipient_id: i32 },
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schema::chat_messages)]
pub struct ChatMessage {
    pub id: i32,
    pub user_id: i32,
    pub message: String,
    pub is_global: bool,
    pub recipient_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Rows violating the global/direct pairing are rejected by a CHECK constraint,
    /// so a direct row always has a recipient.
    pub fn scope(&self) -> ChatScope {
        match (self.is_global, self.recipient_id) {
            (false, Some(recipient_id)) => ChatScope::Direct { recipient_id },
            _ => ChatScope::Global,
        }
    }
}

/// For inserting a message. `id` and `created_at` are assigned by the database.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::chat_messages)]
pub struct NewChatMessage<'a> {
    pub user_id: i32,
    pub message: &'a str,
    pub is_global: bool,
    pub recipient_id: Option<i32>,
}

impl<'a> NewChatMessage<'a> {
    pub fn new(user_id: i32, message: &'a str, scope: ChatScope) -> Self {
        let (is_global, recipient_id) = match scope {
            ChatScope::Global => (true, None),
            ChatScope::Direct { recipient_id } => (false, Some(recipient_id)),
        };
        Self {
            user_id,
            message,
            is_global,
            recipient_id,
        }
    }
}

/// A message joined with its author's name. Shared by the `new_message` frame and the
/// REST history endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageView {
    pub id: i32,
    pub user_id: i32,
    pub user_first_name: String,
    pub user_last_name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessageView {
    pub fn new(message: ChatMessage, author: &UserIdentity) -> Self {
        ChatMessageView {
            id: message.id,
            user_id: message.user_id,
            user_first_name: author.first_name.clone(),
            user_last_name: author.last_name.clone(),
            message: message.message,
            created_at: message.created_at,
        }
    }
}
