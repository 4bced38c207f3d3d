//! In-memory store used by unit tests in place of Postgres.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{Duration, TimeZone, Utc};

use super::{MessageStore, UserDirectory};
use crate::error::StoreError;
use crate::models::{ChatMessage, ChatMessageView, ChatScope, UserIdentity};

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<i32, UserIdentity>>,
    messages: Mutex<Vec<ChatMessage>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn with_users(users: &[(i32, &str, &str)]) -> Self {
        let store = MemoryStore::default();
        for &(id, first, last) in users {
            store.add_user(id, first, last);
        }
        store
    }

    pub fn add_user(&self, id: i32, first_name: &str, last_name: &str) {
        self.users.lock().unwrap().insert(
            id,
            UserIdentity {
                id,
                first_name: first_name.into(),
                last_name: last_name.into(),
            },
        );
    }

    pub fn remove_user(&self, id: i32) {
        self.users.lock().unwrap().remove(&id);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().unwrap().clone()
    }

    fn append(&self, author_id: i32, body: &str, scope: ChatScope) -> ChatMessage {
        let mut messages = self.messages.lock().unwrap();
        let id = messages.len() as i32 + 1;
        // Deterministic, strictly increasing timestamps.
        let created_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(id as i64);
        let (is_global, recipient_id) = match scope {
            ChatScope::Global => (true, None),
            ChatScope::Direct { recipient_id } => (false, Some(recipient_id)),
        };
        let message = ChatMessage {
            id,
            user_id: author_id,
            message: body.to_string(),
            is_global,
            recipient_id,
            created_at,
        };
        messages.push(message.clone());
        message
    }

    /// Seed a direct message; the chat core itself never writes these.
    pub fn push_direct(&self, author_id: i32, recipient_id: i32, body: &str) -> ChatMessage {
        self.append(author_id, body, ChatScope::Direct { recipient_id })
    }

    fn view(&self, message: ChatMessage) -> Option<ChatMessageView> {
        let users = self.users.lock().unwrap();
        users
            .get(&message.user_id)
            .map(|author| ChatMessageView::new(message, author))
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Query(diesel::result::Error::BrokenTransactionManager));
        }
        Ok(())
    }
}

impl UserDirectory for MemoryStore {
    fn find_user(&self, id: i32) -> Result<Option<UserIdentity>, StoreError> {
        self.check_reads()?;
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }
}

impl MessageStore for MemoryStore {
    fn insert_global_message(&self, author_id: i32, body: &str) -> Result<ChatMessage, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Query(diesel::result::Error::BrokenTransactionManager));
        }
        Ok(self.append(author_id, body, ChatScope::Global))
    }

    fn fetch_recent_global(&self, limit: i64) -> Result<Vec<ChatMessageView>, StoreError> {
        self.check_reads()?;
        let globals: Vec<ChatMessage> = self
            .messages()
            .into_iter()
            .rev()
            .filter(|m| m.scope() == ChatScope::Global)
            .take(limit.max(0) as usize)
            .collect();
        Ok(globals.into_iter().filter_map(|m| self.view(m)).collect())
    }

    fn fetch_direct_history(&self, a: i32, b: i32) -> Result<Vec<ChatMessageView>, StoreError> {
        self.check_reads()?;
        let pair: Vec<ChatMessage> = self
            .messages()
            .into_iter()
            .filter(|m| match m.scope() {
                ChatScope::Direct { recipient_id } => {
                    (m.user_id == a && recipient_id == b) || (m.user_id == b && recipient_id == a)
                }
                ChatScope::Global => false,
            })
            .collect();
        Ok(pair.into_iter().filter_map(|m| self.view(m)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_global_is_newest_first_and_skips_direct() {
        let store = MemoryStore::with_users(&[(7, "Alice", "Martin"), (9, "Bob", "Keller")]);
        store.insert_global_message(7, "first").unwrap();
        store.push_direct(9, 7, "psst");
        store.insert_global_message(9, "second").unwrap();

        let recent = store.fetch_recent_global(10).unwrap();
        let bodies: Vec<&str> = recent.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(bodies, vec!["second", "first"]);
        assert_eq!(recent[0].user_first_name, "Bob");

        assert_eq!(store.fetch_recent_global(1).unwrap().len(), 1);
    }

    #[test]
    fn direct_history_covers_both_directions_only() {
        let store = MemoryStore::with_users(&[(7, "Alice", "Martin"), (9, "Bob", "Keller"), (11, "Cara", "Diaz")]);
        store.push_direct(7, 9, "hi bob");
        store.push_direct(11, 7, "hi alice");
        store.push_direct(9, 7, "hi alice");

        let history = store.fetch_direct_history(7, 9).unwrap();
        let bodies: Vec<&str> = history.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(bodies, vec!["hi bob", "hi alice"]);
        assert_eq!(history[1].user_id, 9);
    }
}
