use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletErrorKind {
    NotFound,
    Conflict,
    Precondition,
    Unavailable,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct WalletError {
    pub kind: WalletErrorKind,
    pub message: String,
}

impl WalletError {
    pub fn new(kind: WalletErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub fn not_found(message: impl Into<String>) -> WalletError {
    WalletError::new(WalletErrorKind::NotFound, message)
}

/// A compare-and-set on a record lost against another operation.
pub fn conflict(message: impl Into<String>) -> WalletError {
    WalletError::new(WalletErrorKind::Conflict, message)
}

pub fn precondition_failed(message: impl Into<String>) -> WalletError {
    WalletError::new(WalletErrorKind::Precondition, message)
}

pub fn unavailable(message: impl Into<String>) -> WalletError {
    WalletError::new(WalletErrorKind::Unavailable, message)
}

pub fn internal_error(message: impl Into<String>) -> WalletError {
    WalletError::new(WalletErrorKind::Internal, message)
}
