use thiserror::Error;

/// Error surface of the orchestration core.
///
/// Propagation policy: upload and classification failures are additionally
/// folded into the conversation log as user-visible entries (history doubles
/// as an error log); a chat-poll timeout is visible only through the typing
/// indicator clearing and is never surfaced as a conversation entry.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad input caught before any network call. Never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A 401 from any authenticated call. The session has already been torn
    /// down globally by the time this is returned.
    #[error("session expired, please log in again")]
    AuthExpired,

    /// Network or decode failure.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Non-2xx response with a structured server message, surfaced verbatim.
    #[error("{0}")]
    ServerRejected(String),

    /// Another upload is already awaiting domain selection.
    #[error("another image is already awaiting classification")]
    ClassificationPending,
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        CoreError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Transport(format!("failed to decode response: {err}"))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
