use thiserror::Error;

/// Replay diverged from the log. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("projection failed for '{stream}': {message}")]
pub struct ProjectionError {
    pub stream: String,
    pub message: String,
}

impl ProjectionError {
    pub fn new(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            message: message.into(),
        }
    }
}
