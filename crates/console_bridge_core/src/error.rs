use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("Malformed console id: {0}")]
    MalformedId(String),

    #[error("Console message #{0}# not found")]
    MessageNotFound(u64),

    #[error("Object #{0}# not found")]
    ObjectNotFound(u64),

    #[error("Debugger request '{command}' failed: {message}")]
    Backend { command: String, message: String },

    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("Debugger connection closed")]
    Disconnected,

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ConsoleError {
    pub fn backend(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Lookup misses are expected outcomes against a history that may have been
    /// cleared, as opposed to transport or protocol failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::MessageNotFound(_) | Self::ObjectNotFound(_))
    }
}
