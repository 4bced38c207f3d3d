use thiserror::Error;

/// Connection-local chat failures. Each one becomes an `error` frame sent to the
/// offending connection only; none of them closes the socket.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Authentication failed")]
    InvalidToken,

    #[error("Invalid message format")]
    MalformedFrame,

    #[error("{reason}")]
    MessageRejected { reason: &'static str },

    #[error("Failed to send message")]
    PersistenceFailure,
}

impl ChatError {
    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::InvalidToken => "invalid_token",
            ChatError::MalformedFrame => "malformed_frame",
            ChatError::MessageRejected { .. } => "message_rejected",
            ChatError::PersistenceFailure => "persistence_failure",
        }
    }
}

/// Storage errors. Sources are logged, never shown to clients.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database connection failed")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Query failed")]
    Query(#[from] diesel::result::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be set")]
    Missing { key: &'static str },

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}
