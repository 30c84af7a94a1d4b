use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    crypto::CryptoError,
    projection::ProjectionError,
    registry::{RegistryError, RegistryErrorKind},
    wallet::{WalletError, WalletErrorKind},
};

/// Drives retry decisions. Every failure reaching the saga layer carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Precondition,
    Transient,
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?}: {message}")]
pub struct SagaError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SagaError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub fn precondition(message: impl Into<String>) -> SagaError {
    SagaError::new(ErrorKind::Precondition, message)
}

pub fn transient(message: impl Into<String>) -> SagaError {
    SagaError::new(ErrorKind::Transient, message)
}

pub fn fatal(message: impl Into<String>) -> SagaError {
    SagaError::new(ErrorKind::Fatal, message)
}

impl From<WalletError> for SagaError {
    fn from(err: WalletError) -> Self {
        let kind = match err.kind {
            WalletErrorKind::Conflict | WalletErrorKind::Precondition => ErrorKind::Precondition,
            WalletErrorKind::Unavailable => ErrorKind::Transient,
            WalletErrorKind::NotFound | WalletErrorKind::Internal => ErrorKind::Fatal,
        };
        SagaError::new(kind, err.message)
    }
}

impl From<RegistryError> for SagaError {
    fn from(err: RegistryError) -> Self {
        let kind = match err.kind {
            RegistryErrorKind::Unavailable => ErrorKind::Transient,
            RegistryErrorKind::Rejected
            | RegistryErrorKind::UnknownRegistry
            | RegistryErrorKind::Decode
            | RegistryErrorKind::Internal => ErrorKind::Fatal,
        };
        SagaError::new(kind, err.message)
    }
}

impl From<CryptoError> for SagaError {
    fn from(err: CryptoError) -> Self {
        fatal(err.message)
    }
}

impl From<ProjectionError> for SagaError {
    fn from(err: ProjectionError) -> Self {
        fatal(err.to_string())
    }
}
