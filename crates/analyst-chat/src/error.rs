//! Error types for the conversational core.

use analyst_warehouse::WarehouseError;

/// Failures of the call to the hosted analyst service.
///
/// `Transport` means no HTTP response was received and the request may be
/// retried. The other variants describe a response the service did send and
/// are never retried.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("analyst request did not complete: {0}")]
    Transport(String),
    #[error(
        "Failed request (id: {}) with status {status}: {body}",
        .request_id.as_deref().unwrap_or("unknown")
    )]
    RequestFailed {
        request_id: Option<String>,
        status: u16,
        body: String,
    },
    #[error(
        "could not decode analyst response (id: {}): {message}",
        .request_id.as_deref().unwrap_or("unknown")
    )]
    Decode {
        request_id: Option<String>,
        message: String,
    },
    #[error("invalid analyst client configuration: {0}")]
    Config(String),
}

impl AssistantError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AssistantError::Transport(_))
    }
}

/// Errors from the turn loop and session registry.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("session not found: {0}")]
    SessionNotFound(uuid::Uuid),
    #[error("a turn is already in progress for session {0}")]
    TurnInProgress(uuid::Uuid),
    #[error("no suggestion with key {0}")]
    UnknownSuggestion(String),
    #[error(transparent)]
    Assistant(#[from] AssistantError),
    #[error(transparent)]
    Query(#[from] WarehouseError),
}
