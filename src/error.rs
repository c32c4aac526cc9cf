//! Error types for the event planner.

/// Top-level error type shared by the store, the poller and the front ends.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// User input could not be turned into an event.
    #[error("Incorrect data: {0}")]
    InvalidInput(String),

    /// No event matches the given id, index or prefix.
    #[error("event not found: {0}")]
    EventNotFound(String),

    /// Events file could not be read or written.
    #[error("store error: {0}")]
    Store(String),

    /// Stored OAuth credential missing, malformed, expired or unrefreshable.
    #[error("credential error: {0}")]
    Credential(String),

    /// The mail provider rejected a request.
    #[error("provider error: {0}")]
    Provider(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Interactive sign-in failed.
    #[error("sign-in error: {0}")]
    Auth(String),

    /// Terminal prompt failed or was cancelled.
    #[error("prompt error: {0}")]
    Prompt(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PlannerError>;
