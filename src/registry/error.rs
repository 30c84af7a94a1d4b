use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryErrorKind {
    Unavailable,
    Rejected,
    UnknownRegistry,
    Decode,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RegistryError {
    pub kind: RegistryErrorKind,
    pub message: String,
}

impl RegistryError {
    pub fn new(kind: RegistryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self.kind, RegistryErrorKind::Unavailable)
    }
}

pub fn unavailable(message: impl Into<String>) -> RegistryError {
    RegistryError::new(RegistryErrorKind::Unavailable, message)
}

pub fn rejected(message: impl Into<String>) -> RegistryError {
    RegistryError::new(RegistryErrorKind::Rejected, message)
}

pub fn unknown_registry(registry: &str) -> RegistryError {
    RegistryError::new(
        RegistryErrorKind::UnknownRegistry,
        format!("registry '{registry}' is not known"),
    )
}

pub fn decode_error(message: impl Into<String>) -> RegistryError {
    RegistryError::new(RegistryErrorKind::Decode, message)
}

pub fn internal_error(message: impl Into<String>) -> RegistryError {
    RegistryError::new(RegistryErrorKind::Internal, message)
}
