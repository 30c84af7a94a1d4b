use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoErrorKind {
    InvalidInput,
    Verification,
    Derivation,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CryptoError {
    pub kind: CryptoErrorKind,
    pub message: String,
}

impl CryptoError {
    pub fn new(kind: CryptoErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub fn invalid_input(message: impl Into<String>) -> CryptoError {
    CryptoError::new(CryptoErrorKind::InvalidInput, message)
}

pub fn verification_failed(message: impl Into<String>) -> CryptoError {
    CryptoError::new(CryptoErrorKind::Verification, message)
}

pub fn derivation_failed(message: impl Into<String>) -> CryptoError {
    CryptoError::new(CryptoErrorKind::Derivation, message)
}
