//! JSON frames exchanged over `/ws`. Every frame carries a `type` tag.

use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::models::ChatMessageView;

/// Client → server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Authenticate {
        /// A missing token is an authentication failure, not a format error.
        #[serde(default)]
        token: String,
    },
    ChatMessage {
        #[serde(default)]
        token: String,
        content: String,
    },
}

impl ClientFrame {
    /// Unparseable JSON, anything but an object, an unknown `type`, or missing required fields
    /// are all `MalformedFrame`.
    pub fn parse(text: &str) -> Result<ClientFrame, ChatError> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(|e| {
            tracing::debug!(error = %e, "ws frame rejected");
            ChatError::MalformedFrame
        })?;
        // Internally tagged enums also accept sequences; the wire format is objects only.
        if !value.is_object() {
            tracing::debug!("ws frame rejected: not a JSON object");
            return Err(ChatError::MalformedFrame);
        }
        ClientFrame::deserialize(value).map_err(|e| {
            tracing::debug!(error = %e, "ws frame rejected");
            ChatError::MalformedFrame
        })
    }
}

/// Server → client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Authenticated {
        #[serde(rename = "userId")]
        user_id: i32,
    },
    NewMessage(ChatMessageView),
    Error {
        message: String,
    },
}

impl ServerFrame {
    pub fn error(err: &ChatError) -> Self {
        ServerFrame::Error {
            message: err.to_string(),
        }
    }

    pub fn to_json(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!("serialize ws frame: {:?}", e);
                None
            }
        }
    }
}
